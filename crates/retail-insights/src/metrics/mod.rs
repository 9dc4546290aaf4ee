//! Metrics engine: global KPIs, product aggregates, customer RFM
//! segmentation and temporal aggregates over a cleaned table.
//!
//! Each table is computed independently from the cleaned input; none of
//! them depends on another's output except the segment summary, which
//! summarises the customer table.

pub mod customers;
pub mod global;
pub mod products;
pub mod temporal;

pub use customers::{customer_metrics, rfm_scores, segment_summary};
pub use global::compute_global_kpis;
pub use products::{price_analysis, top_products};
pub use temporal::temporal_tables;

use crate::config::PipelineConfig;
use crate::error::{AnalysisError, Result, ResultExt};
use crate::types::{KpiReport, columns};
use polars::prelude::*;
use tracing::info;

/// Columns every metric reads.
const REQUIRED_COLUMNS: [&str; 11] = [
    columns::INVOICE_NO,
    columns::STOCK_CODE,
    columns::DESCRIPTION,
    columns::QUANTITY,
    columns::UNIT_PRICE,
    columns::CUSTOMER_ID,
    columns::ORDER_DATE,
    columns::REVENUE,
    columns::WEEKDAY,
    columns::HOUR,
    columns::PRICE_CATEGORY,
];

/// Computes the full [`KpiReport`] from a cleaned table.
#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    top_products_limit: Option<usize>,
}

impl MetricsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            top_products_limit: config.top_products_limit,
        }
    }

    /// Keep only the first `limit` rows of the top-products table.
    pub fn with_top_products_limit(mut self, limit: usize) -> Self {
        self.top_products_limit = Some(limit);
        self
    }

    /// Compute every KPI table.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::EmptyDataset`] if the table has no rows.
    /// - [`AnalysisError::ColumnNotFound`] if a cleaned column is missing.
    pub fn generate_report(&self, df: &DataFrame) -> Result<KpiReport> {
        if df.height() == 0 {
            return Err(AnalysisError::EmptyDataset);
        }
        for name in REQUIRED_COLUMNS {
            if df.column(name).is_err() {
                return Err(AnalysisError::ColumnNotFound(name.to_string()));
            }
        }

        info!("Computing global KPIs...");
        let global = compute_global_kpis(df).context("Failed to compute global KPIs")?;

        info!("Analysing products...");
        let top_products =
            top_products(df, self.top_products_limit).context("Failed to analyse products")?;
        let price_analysis = price_analysis(df).context("Failed to analyse price tiers")?;

        info!("Scoring customers...");
        let customer_metrics = customer_metrics(df).context("Failed to compute RFM metrics")?;
        let segment_summary =
            segment_summary(&customer_metrics).context("Failed to summarise segments")?;

        info!("Computing temporal aggregates...");
        let temporal = temporal_tables(df).context("Failed to compute temporal aggregates")?;

        info!(
            "KPIs ready: {} orders, {} customers, {} products",
            global.total_orders, global.total_customers, global.total_products
        );

        Ok(KpiReport {
            global,
            top_products,
            price_analysis,
            customer_metrics,
            segment_summary,
            temporal,
        })
    }
}
