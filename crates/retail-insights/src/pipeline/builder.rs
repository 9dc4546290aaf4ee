//! Main analysis pipeline.
//!
//! This module provides the [`Pipeline`] struct and its builder, which
//! run load, clean, metrics, export and render in that order.

use crate::cleaner::{RetailCleaner, add_advanced_features, validate_cleaned_data};
use crate::config::PipelineConfig;
use crate::error::{AnalysisError, RenderError, Result};
use crate::loader::load_retail_data;
use crate::metrics::MetricsEngine;
use crate::pipeline::progress::{
    CancellationToken, ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::reporting::{ReportExporter, ReportRenderer};
use crate::types::{CleaningStep, RenderStatus, RunSummary};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// The retail analysis pipeline.
///
/// Use [`Pipeline::builder()`] to create a pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use retail_insights::{Pipeline, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .output_dir("data/processed")
///     .render_report(false)
///     .build()?;
///
/// let summary = Pipeline::builder()
///     .config(config)
///     .on_progress(|update| println!("{}", update.message))
///     .build()?
///     .run("data/raw/online_retail.csv")?;
///
/// println!("Results in {}", summary.report_dir.display());
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: CancellationToken,
    cleaner: RetailCleaner,
    metrics: MetricsEngine,
    renderer: ReportRenderer,
}

static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the whole analysis on `input`.
    ///
    /// Load, clean and metrics failures abort the run. Rendering problems
    /// are returned as warnings in the summary; the exported result files
    /// are left in place either way.
    ///
    /// # Errors
    ///
    /// Returns `Err(AnalysisError::Cancelled)` if the run was cancelled
    /// through the cancellation token.
    pub fn run(&self, input: impl AsRef<Path>) -> Result<RunSummary> {
        match self.run_internal(input.as_ref()) {
            Ok(summary) => {
                self.report_progress(ProgressUpdate::complete("Analysis completed successfully"));
                Ok(summary)
            }
            Err(e) => {
                if e.is_cancelled() {
                    self.report_progress(ProgressUpdate::cancelled());
                } else {
                    self.report_progress(ProgressUpdate::failed(e.to_string()));
                }
                error!("Analysis failed: {}", e);
                Err(e)
            }
        }
    }

    /// Check if cancellation has been requested.
    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        Ok(())
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn report_dir_exporter(&self) -> ReportExporter {
        let template_dir = self.config.template_dir.clone();
        if self.config.timestamped_output {
            ReportExporter::timestamped(&self.config.output_dir, template_dir)
        } else {
            ReportExporter::new(self.config.output_dir.clone(), template_dir)
        }
    }

    fn run_internal(&self, input: &Path) -> Result<RunSummary> {
        let start_time = Instant::now();
        let mut warnings: Vec<String> = Vec::new();

        info!("Starting analysis of {}", input.display());
        self.check_cancelled()?;

        // Stage 1: load
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Loading,
            0.0,
            format!("Loading {}...", input.display()),
        ));
        let raw = load_retail_data(input).inspect_err(|e| error!("Loading failed: {}", e))?;
        let rows_loaded = raw.height();
        self.report_progress(
            ProgressUpdate::new(PipelineStage::Loading, 1.0, format!("Loaded {rows_loaded} rows"))
                .rows(rows_loaded, rows_loaded),
        );

        self.check_cancelled()?;

        // Stage 2: clean
        let total_steps = CleaningStep::ALL.len();
        let cleaned = self
            .cleaner
            .clean_with(raw, |report| {
                let position = report.step.position();
                self.report_progress(
                    ProgressUpdate::with_sub_stage(
                        PipelineStage::Cleaning,
                        format!("Step {position}/{total_steps}"),
                        position as f32 / total_steps as f32,
                        report.step.display_name(),
                    )
                    .rows(report.rows_before, report.rows_after),
                );
            })
            .inspect_err(|e| error!("Cleaning failed: {}", e))?;

        let validation_passed = validate_cleaned_data(&cleaned.frame);
        if !validation_passed {
            warnings.push("Post-clean validation reported inconsistencies".to_string());
        }

        let frame = if self.config.advanced_features {
            add_advanced_features(&cleaned.frame)?
        } else {
            cleaned.frame
        };
        let rows_cleaned = frame.height();

        self.check_cancelled()?;

        // Stage 3: metrics
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Metrics,
            0.0,
            "Computing KPIs...",
        ));
        let report = self
            .metrics
            .generate_report(&frame)
            .inspect_err(|e| error!("Metrics failed: {}", e))?;
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Metrics,
            1.0,
            "KPIs computed",
        ));

        self.check_cancelled()?;

        // Stage 4: export
        let exporter = self.report_dir_exporter();
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Exporting,
            0.0,
            format!("Exporting results to {}", exporter.results_dir().display()),
        ));
        let exported_files = exporter
            .export_results(&report)
            .inspect_err(|e| error!("Export failed: {}", e))?;
        let document = exporter.write_report_document();
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Exporting,
            1.0,
            format!("Exported {} files", exported_files.len()),
        ));

        self.check_cancelled()?;

        // Stage 5: render
        let render = match document {
            Err(e) => self.render_failed(e, &mut warnings),
            Ok(_) if !self.config.render_report => {
                info!("Rendering disabled, skipping");
                RenderStatus::Skipped
            }
            Ok(_) => {
                self.report_progress(ProgressUpdate::new(
                    PipelineStage::Rendering,
                    0.0,
                    "Rendering report...",
                ));
                let results_dir = absolute(exporter.results_dir());
                match self.renderer.render(
                    exporter.report_dir(),
                    &results_dir,
                    &self.cancellation_token,
                ) {
                    Ok(document) => RenderStatus::Rendered { document },
                    Err(RenderError::Cancelled) => return Err(AnalysisError::Cancelled),
                    Err(e) => self.render_failed(e, &mut warnings),
                }
            }
        };

        let summary = RunSummary {
            input_file: input.to_path_buf(),
            report_dir: exporter.report_dir().to_path_buf(),
            rows_loaded,
            rows_cleaned,
            cleaning_steps: cleaned.steps,
            price_thresholds: cleaned.thresholds,
            validation_passed,
            global_kpis: report.global,
            exported_files,
            render,
            warnings,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            "Analysis finished in {} ms: {} -> {} rows, report in {}",
            summary.duration_ms,
            summary.rows_loaded,
            summary.rows_cleaned,
            summary.report_dir.display()
        );
        Ok(summary)
    }

    fn render_failed(&self, e: RenderError, warnings: &mut Vec<String>) -> RenderStatus {
        warn!("Report rendering failed: {}", e);
        warnings.push(format!(
            "Report rendering failed: {e}. Render it manually with: {}",
            self.renderer.manual_command()
        ));
        RenderStatus::Failed {
            reason: e.to_string(),
        }
    }
}

fn absolute(path: PathBuf) -> PathBuf {
    std::fs::canonicalize(&path).unwrap_or(path)
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: Option<CancellationToken>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during a run.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// This is a convenience method for simple progress handling.
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Set a cancellation token for stopping the pipeline.
    ///
    /// Clone the token and call [`CancellationToken::cancel()`] from any
    /// thread; the run stops at the next stage boundary, or kills the
    /// renderer if it is running, and returns [`AnalysisError::Cancelled`].
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, crate::config::ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            cleaner: RetailCleaner::from_config(&config),
            metrics: MetricsEngine::from_config(&config),
            renderer: ReportRenderer::from_config(&config),
            config,
            progress_reporter: self.progress_reporter,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}
