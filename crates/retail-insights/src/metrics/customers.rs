//! Customer RFM scoring and segmentation.
//!
//! Recency, frequency and monetary value are each scored 1-4 against
//! their own quartile breakpoints over all customers. Scoring depends on
//! the value only, so customers with equal values always share a score
//! and the quartile buckets hold equal counts up to ties.

use crate::error::Result;
use crate::types::{RfmScore, columns};
use crate::utils::{
    bucket_lower_inclusive, bucket_upper_inclusive, datetime_millis, epoch_day, f64_values,
    i64_values, quantiles,
};
use polars::prelude::*;
use tracing::debug;

pub const RECENCY: &str = "Recency";
pub const FREQUENCY: &str = "Frequency";
pub const MONETARY_VALUE: &str = "MonetaryValue";
pub const RECENCY_SCORE: &str = "Recency_Score";
pub const FREQUENCY_SCORE: &str = "Frequency_Score";
pub const MONETARY_SCORE: &str = "MonetaryValue_Score";
pub const RFM_SCORE: &str = "RFM_Score";
pub const RFM_SEGMENT: &str = "RFM_Segment";
pub const NUMBER_CUSTOMERS: &str = "NumberCustomers";
pub const AVERAGE_MONETARY_VALUE: &str = "AverageMonetaryValue";

const LAST_ORDER: &str = "LastOrder";
const QUARTILES: [f64; 3] = [0.25, 0.5, 0.75];

/// Score where a higher value is better: 1 at or below the first
/// quartile up to 4 above the third.
pub fn ascending_score(value: f64, breakpoints: &[f64]) -> u8 {
    bucket_upper_inclusive(value, breakpoints) as u8 + 1
}

/// Score where a lower value is better: 4 below the first quartile down
/// to 1 at or above the third.
pub fn descending_score(value: f64, breakpoints: &[f64]) -> u8 {
    (breakpoints.len() + 1 - bucket_lower_inclusive(value, breakpoints)) as u8
}

/// Score every customer from parallel recency, frequency and monetary slices.
pub fn rfm_scores(recency: &[f64], frequency: &[f64], monetary: &[f64]) -> Result<Vec<RfmScore>> {
    let r_bps = quantiles(recency, &QUARTILES)?.unwrap_or_default();
    let f_bps = quantiles(frequency, &QUARTILES)?.unwrap_or_default();
    let m_bps = quantiles(monetary, &QUARTILES)?.unwrap_or_default();
    debug!(
        "RFM quartiles: recency {:?}, frequency {:?}, monetary {:?}",
        r_bps, f_bps, m_bps
    );

    Ok(recency
        .iter()
        .zip(frequency)
        .zip(monetary)
        .map(|((r, f), m)| {
            RfmScore::new(
                descending_score(*r, &r_bps),
                ascending_score(*f, &f_bps),
                ascending_score(*m, &m_bps),
            )
        })
        .collect())
}

/// Per-customer RFM table ordered by `CustomerID`.
///
/// Recency is the number of whole days between the latest order date of
/// the batch and the customer's latest order date.
pub fn customer_metrics(df: &DataFrame) -> Result<DataFrame> {
    let reference_day = datetime_millis(df, columns::ORDER_DATE)?
        .into_iter()
        .flatten()
        .max()
        .map(epoch_day)
        .unwrap_or_default();

    let grouped = df
        .clone()
        .lazy()
        .group_by([col(columns::CUSTOMER_ID)])
        .agg([
            col(columns::ORDER_DATE).max().alias(LAST_ORDER),
            col(columns::INVOICE_NO).n_unique().alias(FREQUENCY),
            col(columns::REVENUE).sum().alias(MONETARY_VALUE),
        ])
        .sort([columns::CUSTOMER_ID], SortMultipleOptions::default())
        .collect()?;

    let customer_ids: Vec<Option<i64>> = i64_values(&grouped, columns::CUSTOMER_ID)?;
    let recency: Vec<i64> = datetime_millis(&grouped, LAST_ORDER)?
        .into_iter()
        .map(|last| last.map_or(0, |ms| reference_day - epoch_day(ms)))
        .collect();
    let frequency: Vec<i64> = i64_values(&grouped, FREQUENCY)?
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect();
    let monetary: Vec<f64> = f64_values(&grouped, MONETARY_VALUE)?
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect();

    let as_f64 = |values: &[i64]| values.iter().map(|v| *v as f64).collect::<Vec<_>>();
    let scores = rfm_scores(&as_f64(&recency), &as_f64(&frequency), &monetary)?;

    let out = DataFrame::new(vec![
        Column::new(columns::CUSTOMER_ID.into(), customer_ids),
        Column::new(RECENCY.into(), recency),
        Column::new(FREQUENCY.into(), frequency),
        Column::new(MONETARY_VALUE.into(), monetary),
        Column::new(
            RECENCY_SCORE.into(),
            scores.iter().map(|s| s.recency as i32).collect::<Vec<_>>(),
        ),
        Column::new(
            FREQUENCY_SCORE.into(),
            scores.iter().map(|s| s.frequency as i32).collect::<Vec<_>>(),
        ),
        Column::new(
            MONETARY_SCORE.into(),
            scores.iter().map(|s| s.monetary as i32).collect::<Vec<_>>(),
        ),
        Column::new(
            RFM_SCORE.into(),
            scores.iter().map(RfmScore::code).collect::<Vec<_>>(),
        ),
        Column::new(
            RFM_SEGMENT.into(),
            scores.iter().map(|s| s.segment().label()).collect::<Vec<_>>(),
        ),
    ])?;
    Ok(out)
}

/// Customer count and mean monetary value per segment, largest segment
/// first and ties by segment name.
pub fn segment_summary(customers: &DataFrame) -> Result<DataFrame> {
    let mut out = customers
        .clone()
        .lazy()
        .group_by([col(RFM_SEGMENT)])
        .agg([
            len().alias(NUMBER_CUSTOMERS),
            col(MONETARY_VALUE).mean().alias(AVERAGE_MONETARY_VALUE),
        ])
        .sort(
            [NUMBER_CUSTOMERS, RFM_SEGMENT],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        )
        .collect()?;

    let rounded: Vec<Option<f64>> = f64_values(&out, AVERAGE_MONETARY_VALUE)?
        .into_iter()
        .map(|v| v.map(|v| (v * 100.0).round() / 100.0))
        .collect();
    out.with_column(Series::new(AVERAGE_MONETARY_VALUE.into(), rounded))?;
    Ok(out)
}
