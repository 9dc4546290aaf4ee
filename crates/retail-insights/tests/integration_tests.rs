//! Integration tests for the retail analysis pipeline.
//!
//! These tests run the library end to end on the CSV fixtures and check
//! the exported files, the KPI values and the failure taxonomy.

use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use retail_insights::error::ErrorCategory;
use retail_insights::reporting::{GLOBAL_KPIS_FILE, RESULT_FILES};
use retail_insights::{
    AnalysisError, CancellationToken, MetricsEngine, Pipeline, PipelineConfig, PipelineStage,
    ProgressUpdate, RenderStatus, RetailCleaner, load_retail_data,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture(name: &str) -> PathBuf {
    fixtures_path().join(name)
}

fn flat_config(output: &Path) -> PipelineConfig {
    PipelineConfig::builder()
        .output_dir(output)
        .timestamped_output(false)
        .render_report(false)
        .build()
        .unwrap()
}

/// Read an exported CSV with every column kept as a string.
fn read_strings(path: &Path) -> DataFrame {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .expect("Failed to create CSV reader")
        .finish()
        .expect("Failed to read CSV file")
}

fn strings(df: &DataFrame, name: &str) -> Vec<String> {
    df.column(name)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

// ============================================================================
// End-to-end runs
// ============================================================================

#[test]
fn test_full_run_exports_every_result_file() {
    let dir = tempfile::tempdir().unwrap();
    let summary = Pipeline::builder()
        .config(flat_config(dir.path()))
        .build()
        .unwrap()
        .run(fixture("sample_retail.csv"))
        .unwrap();

    assert_eq!(summary.rows_loaded, 12);
    assert_eq!(summary.rows_cleaned, 8);
    assert_eq!(summary.render, RenderStatus::Skipped);
    assert!(summary.warnings.is_empty());
    assert!(summary.validation_passed);

    let results = dir.path().join("results");
    for name in RESULT_FILES {
        assert!(results.join(name).is_file(), "{name} was not exported");
    }
    assert!(dir.path().join("report.qmd").is_file());
}

#[test]
fn test_cleaning_step_row_counts() {
    let dir = tempfile::tempdir().unwrap();
    let summary = Pipeline::builder()
        .config(flat_config(dir.path()))
        .build()
        .unwrap()
        .run(fixture("sample_retail.csv"))
        .unwrap();

    let transitions: Vec<(usize, usize)> = summary
        .cleaning_steps
        .iter()
        .map(|s| (s.rows_before, s.rows_after))
        .collect();
    assert_eq!(
        transitions,
        vec![(12, 12), (12, 9), (9, 9), (9, 9), (9, 9), (9, 9), (9, 8)]
    );

    let thresholds = summary.price_thresholds.unwrap();
    assert!(thresholds.low < thresholds.high);
}

#[test]
fn test_global_kpis() {
    let dir = tempfile::tempdir().unwrap();
    let summary = Pipeline::builder()
        .config(flat_config(dir.path()))
        .build()
        .unwrap()
        .run(fixture("sample_retail.csv"))
        .unwrap();

    let kpis = &summary.global_kpis;
    assert_close(kpis.total_revenue, 329.42);
    assert_eq!(kpis.total_orders, 7);
    assert_eq!(kpis.total_customers, 4);
    assert_eq!(kpis.total_products, 8);
    assert_close(kpis.average_order_value, 329.42 / 7.0);

    let json: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("results").join(GLOBAL_KPIS_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(json["total_orders"], 7);
    assert_eq!(json["total_customers"], 4);
}

#[test]
fn test_customer_metrics_file() {
    let dir = tempfile::tempdir().unwrap();
    Pipeline::builder()
        .config(flat_config(dir.path()))
        .build()
        .unwrap()
        .run(fixture("sample_retail.csv"))
        .unwrap();

    let customers = read_strings(&dir.path().join("results/customer_metrics.csv"));
    assert_eq!(customers.height(), 4);
    assert_eq!(
        strings(&customers, "CustomerID"),
        vec!["12583", "13047", "15100", "17850"]
    );
    assert_eq!(strings(&customers, "Recency"), vec!["3", "4", "0", "1"]);
    assert_eq!(strings(&customers, "Frequency"), vec!["1", "2", "1", "3"]);
    // Quartiles are observed values: recency [1, 3, 3], frequency [1, 2, 2],
    // monetary [79.58, 90, 90].
    assert_eq!(
        strings(&customers, "RFM_Score"),
        vec!["112", "121", "414", "341"]
    );
    assert_eq!(strings(&customers, "RFM_Segment"), vec!["At-Risk Customers"; 4]);

    let segments = read_strings(&dir.path().join("results/segment_summary.csv"));
    assert_eq!(strings(&segments, "RFM_Segment"), vec!["At-Risk Customers"]);
    assert_eq!(strings(&segments, "NumberCustomers"), vec!["4"]);
}

#[test]
fn test_top_products_and_temporal_files() {
    let dir = tempfile::tempdir().unwrap();
    Pipeline::builder()
        .config(flat_config(dir.path()))
        .build()
        .unwrap()
        .run(fixture("sample_retail.csv"))
        .unwrap();

    let results = dir.path().join("results");
    let products = read_strings(&results.join("top_products.csv"));
    assert_eq!(products.height(), 8);
    assert_eq!(&strings(&products, "StockCode")[..2], ["21258", "22728"]);

    let price = read_strings(&results.join("price_analysis.csv"));
    assert!(price.height() <= 3);

    let daily = read_strings(&results.join("temporal_daily.csv"));
    assert_eq!(daily.height(), 5);

    let weekday = read_strings(&results.join("temporal_weekday.csv"));
    assert_eq!(strings(&weekday, "WeekDay"), vec!["1", "3", "4", "5", "7"]);

    let hourly = read_strings(&results.join("temporal_hourly.csv"));
    assert_eq!(strings(&hourly, "Hour"), vec!["8", "10", "13", "18"]);
}

#[test]
fn test_top_products_limit() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::builder()
        .output_dir(dir.path())
        .timestamped_output(false)
        .render_report(false)
        .top_products_limit(3)
        .build()
        .unwrap();
    Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run(fixture("sample_retail.csv"))
        .unwrap();

    let products = read_strings(&dir.path().join("results/top_products.csv"));
    assert_eq!(products.height(), 3);
}

#[test]
fn test_timestamped_report_folder() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::builder()
        .output_dir(dir.path())
        .render_report(false)
        .build()
        .unwrap();
    let summary = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run(fixture("sample_retail.csv"))
        .unwrap();

    assert_eq!(summary.report_dir.parent().unwrap(), dir.path());
    let name = summary.report_dir.file_name().unwrap().to_string_lossy();
    assert!(name.starts_with("report_"));
}

#[test]
fn test_advanced_features_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::builder()
        .output_dir(dir.path())
        .timestamped_output(false)
        .render_report(false)
        .advanced_features(true)
        .build()
        .unwrap();
    let summary = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run(fixture("sample_retail.csv"))
        .unwrap();
    assert_eq!(summary.rows_cleaned, 8);
    assert_eq!(summary.global_kpis.total_orders, 7);
}

// ============================================================================
// Component-level runs
// ============================================================================

#[test]
fn test_cleaning_is_idempotent_on_metrics() {
    let cleaner = RetailCleaner::default();
    let metrics = MetricsEngine::new();

    let first = cleaner
        .clean(load_retail_data(fixture("sample_retail.csv")).unwrap())
        .unwrap();
    let second = cleaner
        .clean(load_retail_data(fixture("sample_retail.csv")).unwrap())
        .unwrap();

    assert!(first.frame.equals_missing(&second.frame));
    let a = metrics.generate_report(&first.frame).unwrap();
    let b = metrics.generate_report(&second.frame).unwrap();
    assert_eq!(a.global, b.global);
    assert!(a.customer_metrics.equals_missing(&b.customer_metrics));
}

// ============================================================================
// Failure taxonomy
// ============================================================================

#[test]
fn test_date_parse_failure_carries_samples() {
    let dir = tempfile::tempdir().unwrap();
    let err = Pipeline::builder()
        .config(flat_config(dir.path()))
        .build()
        .unwrap()
        .run(fixture("bad_dates.csv"))
        .unwrap_err();

    assert_eq!(err.error_code(), "DATE_PARSE_FAILED");
    assert_eq!(err.category(), ErrorCategory::Parse);
    let AnalysisError::DateParse(failure) = err else {
        panic!("expected a date parse failure, got {err:?}");
    };
    assert_eq!(failure.total_failures, 2);
    let raws: Vec<&str> = failure.samples.iter().map(|s| s.raw.as_str()).collect();
    assert_eq!(raws, vec!["2010-12-01 08:28", "12/31/2010 08:34"]);
    assert!(failure.samples.iter().all(|s| s.attempts.len() == 2));

    assert!(!dir.path().join("results").exists());
}

#[test]
fn test_invalid_price_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Pipeline::builder()
        .config(flat_config(dir.path()))
        .build()
        .unwrap()
        .run(fixture("invalid_price.csv"))
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_NUMBER");
    assert!(err.to_string().contains("n/a"));
}

#[test]
fn test_schema_mismatch_is_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Pipeline::builder()
        .config(flat_config(dir.path()))
        .build()
        .unwrap()
        .run(fixture("wrong_header.csv"))
        .unwrap_err();
    assert_eq!(err.error_code(), "SCHEMA_MISMATCH");
    assert_eq!(err.category(), ErrorCategory::Input);
}

#[test]
fn test_missing_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Pipeline::builder()
        .config(flat_config(dir.path()))
        .build()
        .unwrap()
        .run(fixture("does_not_exist.csv"))
        .unwrap_err();
    assert!(matches!(err, AnalysisError::FileNotFound(_)));
}

#[test]
fn test_only_invalid_rows_is_empty_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let err = Pipeline::builder()
        .config(flat_config(dir.path()))
        .build()
        .unwrap()
        .run(fixture("only_returns.csv"))
        .unwrap_err();
    assert_eq!(err.error_code(), "EMPTY_DATASET");
}

#[test]
fn test_render_failure_keeps_results() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::builder()
        .output_dir(dir.path())
        .timestamped_output(false)
        .renderer_program("retail-insights-missing-renderer")
        .build()
        .unwrap();
    let summary = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run(fixture("sample_retail.csv"))
        .unwrap();

    let RenderStatus::Failed { reason } = &summary.render else {
        panic!("expected a failed render, got {:?}", summary.render);
    };
    assert!(reason.contains("retail-insights-missing-renderer"));
    assert!(summary.warnings[0].contains("retail-insights-missing-renderer render report.qmd"));

    let results = dir.path().join("results");
    for name in RESULT_FILES {
        let path = results.join(name);
        if name == GLOBAL_KPIS_FILE {
            let json: serde_json::Value =
                serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
            assert_eq!(json["total_customers"], 4);
        } else {
            let table = read_strings(&path);
            assert!(table.height() > 0, "{name} has no rows");
        }
    }
    let customers = read_strings(&results.join("customer_metrics.csv"));
    assert_eq!(customers.height(), 4);
}

#[test]
fn test_missing_template_dir_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::builder()
        .output_dir(dir.path().join("out"))
        .timestamped_output(false)
        .template_dir(dir.path().join("no-templates"))
        .build()
        .unwrap();
    let summary = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run(fixture("sample_retail.csv"))
        .unwrap();

    assert!(matches!(summary.render, RenderStatus::Failed { .. }));
    assert_eq!(summary.exported_files.len(), RESULT_FILES.len());
    assert!(!dir.path().join("out/report.qmd").exists());
}

#[test]
fn test_custom_template_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let templates = dir.path().join("templates");
    std::fs::create_dir_all(&templates).unwrap();
    std::fs::write(
        templates.join("template.qmd"),
        "---\ntitle: Custom\n---\n\n```{python}\nresults_dir = os.getenv('RESULTS_DIR', 'results')\n```\n",
    )
    .unwrap();

    let config = PipelineConfig::builder()
        .output_dir(dir.path().join("out"))
        .timestamped_output(false)
        .render_report(false)
        .template_dir(&templates)
        .build()
        .unwrap();
    Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run(fixture("sample_retail.csv"))
        .unwrap();

    let document = std::fs::read_to_string(dir.path().join("out/report.qmd")).unwrap();
    assert!(document.contains("title: Custom"));
    assert!(!document.contains("os.getenv"));
}

// ============================================================================
// Progress and cancellation
// ============================================================================

#[test]
fn test_progress_stages_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = updates.clone();

    Pipeline::builder()
        .config(flat_config(dir.path()))
        .on_progress(move |update| sink.lock().unwrap().push(update))
        .build()
        .unwrap()
        .run(fixture("sample_retail.csv"))
        .unwrap();

    let updates = updates.lock().unwrap();
    let mut stages: Vec<PipelineStage> = updates.iter().map(|u| u.stage).collect();
    stages.dedup();
    assert_eq!(
        stages,
        vec![
            PipelineStage::Loading,
            PipelineStage::Cleaning,
            PipelineStage::Metrics,
            PipelineStage::Exporting,
            PipelineStage::Complete,
        ]
    );

    let progress: Vec<f32> = updates.iter().map(|u| u.progress).collect();
    assert!(progress.windows(2).all(|w| w[0] <= w[1] + f32::EPSILON));
}

#[test]
fn test_cancelled_run_reports_cancellation() {
    let dir = tempfile::tempdir().unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let last_stage = Arc::new(Mutex::new(None));
    let sink = last_stage.clone();

    let err = Pipeline::builder()
        .config(flat_config(dir.path()))
        .cancellation_token(token)
        .on_progress(move |update| *sink.lock().unwrap() = Some(update.stage))
        .build()
        .unwrap()
        .run(fixture("sample_retail.csv"))
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(*last_stage.lock().unwrap(), Some(PipelineStage::Cancelled));
}
