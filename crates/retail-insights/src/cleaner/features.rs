//! Derived columns: revenue, calendar features, price tiers and the
//! optional advanced features.

use crate::error::Result;
use crate::types::{PriceThresholds, PriceTier, columns};
use crate::utils::{
    bucket_upper_inclusive, datetime_millis, f64_values, from_epoch_millis, i64_values, quantiles,
};
use chrono::{Datelike, Timelike};
use polars::prelude::*;
use tracing::debug;

/// Add `Revenue = Quantity * UnitPrice`.
pub fn add_revenue(df: &DataFrame) -> Result<DataFrame> {
    let out = df
        .clone()
        .lazy()
        .with_column(
            (col(columns::QUANTITY).cast(DataType::Float64) * col(columns::UNIT_PRICE))
                .alias(columns::REVENUE),
        )
        .collect()?;
    Ok(out)
}

/// Add `Month` (1-12), `WeekDay` (ISO, Monday = 1) and `Hour` (0-23) from `OrderDate`.
pub fn add_temporal_features(df: &DataFrame) -> Result<DataFrame> {
    let stamps: Vec<_> = datetime_millis(df, columns::ORDER_DATE)?
        .into_iter()
        .map(|ms| ms.and_then(from_epoch_millis))
        .collect();

    let month: Vec<Option<i32>> = stamps.iter().map(|ts| ts.map(|t| t.month() as i32)).collect();
    let weekday: Vec<Option<i32>> = stamps
        .iter()
        .map(|ts| ts.map(|t| t.weekday().number_from_monday() as i32))
        .collect();
    let hour: Vec<Option<i32>> = stamps.iter().map(|ts| ts.map(|t| t.hour() as i32)).collect();

    let mut out = df.clone();
    out.with_column(Series::new(columns::MONTH.into(), month))?;
    out.with_column(Series::new(columns::WEEKDAY.into(), weekday))?;
    out.with_column(Series::new(columns::HOUR.into(), hour))?;
    Ok(out)
}

/// Classify each row's unit price against the batch quantiles.
///
/// Returns the table with a `PriceCategory` column and the thresholds
/// used, or `None` thresholds when the table has no prices.
pub fn assign_price_tiers(
    df: &DataFrame,
    (low_q, high_q): (f64, f64),
) -> Result<(DataFrame, Option<PriceThresholds>)> {
    let prices = f64_values(df, columns::UNIT_PRICE)?;
    let present: Vec<f64> = prices.iter().flatten().copied().collect();

    let thresholds = quantiles(&present, &[low_q, high_q])?.map(|qs| PriceThresholds {
        low: qs[0],
        high: qs[1],
    });

    let labels: Vec<Option<&str>> = match thresholds {
        Some(t) => {
            debug!("Price tier breakpoints: low <= {:.4}, medium <= {:.4}", t.low, t.high);
            let breakpoints = [t.low, t.high];
            prices
                .iter()
                .map(|price| price.map(|p| tier_for(p, &breakpoints).label()))
                .collect()
        }
        None => vec![None; prices.len()],
    };

    let mut out = df.clone();
    out.with_column(Series::new(columns::PRICE_CATEGORY.into(), labels))?;
    Ok((out, thresholds))
}

/// Tier of `price` given ascending `[low, high]` breakpoints.
pub fn tier_for(price: f64, breakpoints: &[f64; 2]) -> PriceTier {
    PriceTier::ALL[bucket_upper_inclusive(price, breakpoints)]
}

/// Part of day for an hour: `morning` 6-11, `afternoon` 12-17, else `evening`.
pub fn time_segment(hour: i64) -> &'static str {
    match hour {
        6..=11 => "morning",
        12..=17 => "afternoon",
        _ => "evening",
    }
}

/// Add `IsLargeOrder` (quantity above the batch mean) and `TimeSegment`.
pub fn add_advanced_features(df: &DataFrame) -> Result<DataFrame> {
    let quantities = i64_values(df, columns::QUANTITY)?;
    let present: Vec<i64> = quantities.iter().flatten().copied().collect();
    let mean = if present.is_empty() {
        0.0
    } else {
        present.iter().sum::<i64>() as f64 / present.len() as f64
    };

    let large: Vec<Option<bool>> = quantities
        .iter()
        .map(|q| q.map(|q| q as f64 > mean))
        .collect();
    let segments: Vec<Option<&str>> = i64_values(df, columns::HOUR)?
        .into_iter()
        .map(|h| h.map(time_segment))
        .collect();

    let mut out = df.clone();
    out.with_column(Series::new(columns::IS_LARGE_ORDER.into(), large))?;
    out.with_column(Series::new(columns::TIME_SEGMENT.into(), segments))?;
    Ok(out)
}
