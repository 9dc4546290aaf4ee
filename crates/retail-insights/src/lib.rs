//! Retail Transaction Analysis Library
//!
//! Cleaning, KPI computation and RFM customer segmentation for transactional
//! retail datasets, built on Polars.
//!
//! # Overview
//!
//! A run flows strictly forward through four components:
//!
//! - **Loader**: reads the raw CSV with a fixed eight-column schema
//! - **Cleaner**: decimal normalisation, date parsing with format fallback,
//!   filtering of invalid rows, derived columns and price tiers
//! - **Metrics Engine**: global KPIs, product rankings, price-tier analysis,
//!   RFM scores and segments, temporal breakdowns
//! - **Exporter / Renderer**: result files plus an optional rendered report
//!
//! Load, clean and metrics failures abort the run. Render failures are
//! reported as warnings; the exported files are usable either way.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use retail_insights::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .output_dir("output")
//!     .render_report(false)
//!     .build()?;
//!
//! let summary = Pipeline::builder()
//!     .config(config)
//!     .build()?
//!     .run("data/online_retail.csv")?;
//!
//! println!("Orders: {}", summary.global_kpis.total_orders);
//! println!("Results in {}", summary.report_dir.display());
//! ```
//!
//! The components can also be used on their own:
//!
//! ```rust,ignore
//! use retail_insights::{MetricsEngine, RetailCleaner, load_retail_data};
//!
//! let raw = load_retail_data("data/online_retail.csv")?;
//! let cleaned = RetailCleaner::default().clean(raw)?;
//! let report = MetricsEngine::new().generate_report(&cleaned.frame)?;
//! ```
//!
//! # Configuration
//!
//! ```rust,ignore
//! use retail_insights::PipelineConfig;
//! use std::time::Duration;
//!
//! let config = PipelineConfig::builder()
//!     .output_dir("reports")
//!     .template_dir("templates/quarto")
//!     .price_tier_quantiles(0.25, 0.75)
//!     .render_timeout(Some(Duration::from_secs(120)))
//!     .top_products_limit(20)
//!     .build()?;
//! ```
//!
//! # Progress Reporting
//!
//! ```rust,ignore
//! use retail_insights::{AnalysisError, CancellationToken, Pipeline};
//!
//! let token = CancellationToken::new();
//! let result = Pipeline::builder()
//!     .cancellation_token(token.clone())
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run("data/online_retail.csv");
//!
//! match result {
//!     Ok(summary) => println!("Done in {} ms", summary.duration_ms),
//!     Err(AnalysisError::Cancelled) => println!("Cancelled by user"),
//!     Err(e) => println!("Error: {}", e),
//! }
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod pipeline;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{DateParser, RetailCleaner, validate_cleaned_data};
pub use config::{ConfigValidationError, PipelineConfig, PipelineConfigBuilder};
pub use error::{
    AnalysisError, DateParseFailure, ErrorCategory, FailedValue, RenderError,
    Result as AnalysisResult, ResultExt,
};
pub use loader::{load_retail_data, retail_schema};
pub use metrics::MetricsEngine;
pub use pipeline::{
    CancellationToken, ClosureProgressReporter, Pipeline, PipelineBuilder, PipelineStage,
    ProgressReporter, ProgressUpdate,
};
pub use reporting::{ReportExporter, ReportRenderer};
pub use types::{
    CleanedData, CleaningStep, GlobalKpis, KpiReport, PriceThresholds, PriceTier, RenderStatus,
    RfmScore, RunSummary, Segment, StepReport, TemporalTables,
};
