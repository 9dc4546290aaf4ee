//! External report rendering.
//!
//! Runs `<program> render report.qmd --embed-resources` in the report
//! directory with `RESULTS_DIR` set. The child is polled until it exits,
//! the timeout elapses or the run is cancelled; in the last two cases it
//! is killed. Its output goes to `render.log` next to the document.

use crate::config::{DEFAULT_RENDER_TIMEOUT, DEFAULT_RENDERER, PipelineConfig};
use crate::error::RenderError;
use crate::pipeline::CancellationToken;
use crate::reporting::exporter::REPORT_DOCUMENT;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const RENDER_LOG: &str = "render.log";
pub const RENDERED_DOCUMENT: &str = "report.html";

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Invokes the external document renderer.
#[derive(Debug, Clone)]
pub struct ReportRenderer {
    program: String,
    timeout: Option<Duration>,
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self {
            program: DEFAULT_RENDERER.to_string(),
            timeout: Some(DEFAULT_RENDER_TIMEOUT),
        }
    }
}

impl ReportRenderer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            program: config.renderer_program.clone(),
            timeout: config.render_timeout,
        }
    }

    /// Set the timeout; `None` waits for the renderer indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Command a user can run to render the report by hand.
    pub fn manual_command(&self) -> String {
        format!("{} render {}", self.program, REPORT_DOCUMENT)
    }

    /// Render `report.qmd` inside `report_dir`, returning the rendered document path.
    pub fn render(
        &self,
        report_dir: &Path,
        results_dir: &Path,
        cancellation: &CancellationToken,
    ) -> Result<PathBuf, RenderError> {
        let log_path = report_dir.join(RENDER_LOG);
        let log = File::create(&log_path)?;

        info!("Rendering report with '{}' in {}", self.program, report_dir.display());
        let mut child = Command::new(&self.program)
            .args(["render", REPORT_DOCUMENT, "--embed-resources"])
            .current_dir(report_dir)
            .env("RESULTS_DIR", results_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log.try_clone()?))
            .stderr(Stdio::from(log))
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => RenderError::ProgramNotFound(self.program.clone()),
                _ => RenderError::Io(e),
            })?;

        let status = self.wait(&mut child, cancellation)?;
        if !status.success() {
            warn!("Renderer failed, output in {}", log_path.display());
            return Err(RenderError::ExitStatus(format!(
                "{status} (see {})",
                log_path.display()
            )));
        }

        let document = report_dir.join(RENDERED_DOCUMENT);
        info!("Report rendered: {}", document.display());
        Ok(document)
    }

    fn wait(&self, child: &mut Child, cancellation: &CancellationToken) -> Result<ExitStatus, RenderError> {
        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                debug!("Renderer exited after {:?}", started.elapsed());
                return Ok(status);
            }

            if cancellation.is_cancelled() {
                kill(child);
                return Err(RenderError::Cancelled);
            }

            if let Some(timeout) = self.timeout
                && started.elapsed() >= timeout
            {
                warn!("Renderer exceeded {:?}, killing it", timeout);
                kill(child);
                return Err(RenderError::TimedOut(timeout));
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!("Failed to kill renderer: {}", e);
    }
    // Reap the child so it does not linger as a zombie.
    let _ = child.wait();
}
