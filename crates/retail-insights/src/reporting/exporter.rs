//! Export of the KPI tables and the report document.

use crate::error::{AnalysisError, RenderError, Result, ResultExt};
use crate::reporting::template::{load_template, substitute_results_dir};
use crate::types::KpiReport;
use chrono::Local;
use polars::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const RESULTS_DIR: &str = "results";
pub const REPORT_DOCUMENT: &str = "report.qmd";
pub const GLOBAL_KPIS_FILE: &str = "global_kpis.json";

/// Result file names in export order.
pub const RESULT_FILES: [&str; 8] = [
    GLOBAL_KPIS_FILE,
    "top_products.csv",
    "price_analysis.csv",
    "customer_metrics.csv",
    "segment_summary.csv",
    "temporal_daily.csv",
    "temporal_weekday.csv",
    "temporal_hourly.csv",
];

/// Writes one run's result files under a report directory.
///
/// Layout:
///
/// ```text
/// <report_dir>/
///   report.qmd
///   results/
///     global_kpis.json
///     top_products.csv
///     ...
/// ```
#[derive(Debug, Clone)]
pub struct ReportExporter {
    report_dir: PathBuf,
    template_dir: Option<PathBuf>,
}

impl ReportExporter {
    pub fn new(report_dir: impl Into<PathBuf>, template_dir: Option<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
            template_dir,
        }
    }

    /// Exporter writing into `<output_dir>/report_<YYYYMMDD_HHMMSS>`.
    pub fn timestamped(output_dir: impl AsRef<Path>, template_dir: Option<PathBuf>) -> Self {
        let name = format!("report_{}", Local::now().format("%Y%m%d_%H%M%S"));
        Self::new(output_dir.as_ref().join(name), template_dir)
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    pub fn results_dir(&self) -> PathBuf {
        self.report_dir.join(RESULTS_DIR)
    }

    /// Create the report and results directories.
    pub fn setup_directories(&self) -> Result<()> {
        fs::create_dir_all(self.results_dir())
            .map_err(AnalysisError::from)
            .context(format!("Failed to create {}", self.results_dir().display()))?;
        Ok(())
    }

    /// Write every result file, returning their paths in [`RESULT_FILES`] order.
    pub fn export_results(&self, report: &KpiReport) -> Result<Vec<PathBuf>> {
        self.setup_directories()?;
        let results_dir = self.results_dir();
        info!("Exporting results to {}", results_dir.display());

        let json_path = results_dir.join(GLOBAL_KPIS_FILE);
        let mut file = File::create(&json_path)?;
        file.write_all(serde_json::to_string_pretty(&report.global)?.as_bytes())?;
        debug!("Wrote {}", json_path.display());

        let tables = [
            &report.top_products,
            &report.price_analysis,
            &report.customer_metrics,
            &report.segment_summary,
            &report.temporal.daily,
            &report.temporal.weekday,
            &report.temporal.hourly,
        ];

        let mut written = vec![json_path];
        for (name, table) in RESULT_FILES[1..].iter().zip(tables) {
            let path = results_dir.join(name);
            write_csv(&path, table)?;
            written.push(path);
        }

        info!("Exported {} result files", written.len());
        Ok(written)
    }

    /// Write `report.qmd` pointing at the absolute results directory.
    pub fn write_report_document(&self) -> std::result::Result<PathBuf, RenderError> {
        let template = load_template(self.template_dir.as_deref())?;
        let results_dir = self.results_dir();
        let absolute = fs::canonicalize(&results_dir).unwrap_or(results_dir);

        let path = self.report_dir.join(REPORT_DOCUMENT);
        fs::write(&path, substitute_results_dir(&template, &absolute))?;
        info!("Report document written: {}", path.display());
        Ok(path)
    }
}

fn write_csv(path: &Path, table: &DataFrame) -> Result<()> {
    let mut df = table.clone();
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut df)
        .context(format!("Failed to write {}", path.display()))?;
    debug!("Wrote {} ({} rows)", path.display(), df.height());
    Ok(())
}
