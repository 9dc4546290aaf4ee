//! Cleaning of the raw transactions table.
//!
//! The cleaner runs seven order-dependent steps:
//! 1. Normalise comma-decimal unit prices to `Float64`
//! 2. Drop rows with non-positive quantity or unit price
//! 3. Parse invoice dates with format fallback into `OrderDate`
//! 4. Compute `Revenue`
//! 5. Extract `Month`, `WeekDay` and `Hour`
//! 6. Assign price tiers from the quantiles of the remaining rows
//! 7. Drop rows without a customer id
//!
//! Any failing step aborts the clean; no partial table is returned.

mod dates;
mod features;
mod numeric;

pub use dates::{DateParser, FORMAT_WITH_SECONDS, FORMAT_WITHOUT_SECONDS};
pub use features::{
    add_advanced_features, add_revenue, add_temporal_features, assign_price_tiers, tier_for,
    time_segment,
};

use crate::config::{DEFAULT_PRICE_TIER_QUANTILES, PipelineConfig};
use crate::error::Result;
use crate::types::{CleanedData, CleaningStep, PriceThresholds, StepReport, columns};
use crate::utils::{f64_values, filter_rows, i64_values, require_column};
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Cleaner for the retail transactions table.
#[derive(Debug, Clone)]
pub struct RetailCleaner {
    price_tier_quantiles: (f64, f64),
    date_parser: DateParser,
}

impl Default for RetailCleaner {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE_TIER_QUANTILES)
    }
}

impl RetailCleaner {
    pub fn new(price_tier_quantiles: (f64, f64)) -> Self {
        Self {
            price_tier_quantiles,
            date_parser: DateParser::default(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.price_tier_quantiles)
    }

    /// Run every cleaning step.
    pub fn clean(&self, df: DataFrame) -> Result<CleanedData> {
        self.clean_with(df, |_| {})
    }

    /// Run every cleaning step, calling `on_step` after each one with its
    /// row-count transition.
    pub fn clean_with<F>(&self, df: DataFrame, mut on_step: F) -> Result<CleanedData>
    where
        F: FnMut(&StepReport),
    {
        info!("Cleaning {} rows...", df.height());

        let mut df = df;
        let mut steps = Vec::with_capacity(CleaningStep::ALL.len());
        let mut thresholds: Option<PriceThresholds> = None;

        for step in CleaningStep::ALL {
            let rows_before = df.height();
            df = match step {
                CleaningStep::NormalizeNumbers => {
                    numeric::normalize_decimal_column(&df, columns::UNIT_PRICE)?
                }
                CleaningStep::FilterInvalid => filter_invalid(&df)?,
                CleaningStep::ParseDates => {
                    self.date_parser
                        .parse_column(&df, columns::INVOICE_DATE, columns::ORDER_DATE)?
                }
                CleaningStep::ComputeRevenue => add_revenue(&df)?,
                CleaningStep::TemporalFeatures => add_temporal_features(&df)?,
                CleaningStep::PriceTiers => {
                    let (tiered, computed) = assign_price_tiers(&df, self.price_tier_quantiles)?;
                    thresholds = computed;
                    tiered
                }
                CleaningStep::DropMissingCustomers => drop_missing_customers(&df)?,
            };

            let report = StepReport {
                step,
                rows_before,
                rows_after: df.height(),
            };
            info!(
                "Step {}/{}: {} ({} -> {} rows)",
                step.position(),
                CleaningStep::ALL.len(),
                step.display_name(),
                report.rows_before,
                report.rows_after
            );
            on_step(&report);
            steps.push(report);
        }

        info!("Cleaning complete: {} rows remain", df.height());

        Ok(CleanedData {
            frame: df,
            steps,
            thresholds,
        })
    }
}

/// Keep rows with `Quantity > 0` and `UnitPrice > 0`; missing values are dropped.
fn filter_invalid(df: &DataFrame) -> Result<DataFrame> {
    let quantities = i64_values(df, columns::QUANTITY)?;
    let prices = f64_values(df, columns::UNIT_PRICE)?;

    let keep = quantities
        .iter()
        .zip(&prices)
        .map(|(q, p)| matches!((q, p), (Some(q), Some(p)) if *q > 0 && *p > 0.0));
    filter_rows(df, keep)
}

fn drop_missing_customers(df: &DataFrame) -> Result<DataFrame> {
    let mask = require_column(df, columns::CUSTOMER_ID)?.is_not_null();
    Ok(df.filter(&mask)?)
}

/// Post-condition check over a cleaned table.
///
/// Returns false (and logs the reason) when a derived column is missing,
/// a non-positive quantity or price remains, or an order date is null.
pub fn validate_cleaned_data(df: &DataFrame) -> bool {
    let derived = [
        columns::REVENUE,
        columns::ORDER_DATE,
        columns::MONTH,
        columns::WEEKDAY,
    ];
    if let Some(missing) = derived.iter().find(|name| df.column(name).is_err()) {
        warn!("Validation failed: column '{}' is missing", missing);
        return false;
    }

    let quantities_ok = i64_values(df, columns::QUANTITY)
        .map(|values| values.iter().all(|q| q.is_some_and(|q| q > 0)))
        .unwrap_or(false);
    if !quantities_ok {
        warn!("Validation failed: non-positive or missing quantities remain");
        return false;
    }

    let prices_ok = f64_values(df, columns::UNIT_PRICE)
        .map(|values| values.iter().all(|p| p.is_some_and(|p| p > 0.0)))
        .unwrap_or(false);
    if !prices_ok {
        warn!("Validation failed: non-positive or missing unit prices remain");
        return false;
    }

    let null_dates = df
        .column(columns::ORDER_DATE)
        .map(|c| c.null_count())
        .unwrap_or(0);
    if null_dates > 0 {
        warn!("Validation failed: {} order dates are null", null_dates);
        return false;
    }

    debug!("Validation passed for {} rows", df.height());
    true
}
