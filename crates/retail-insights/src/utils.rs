//! Shared utilities for the analysis pipeline.
//!
//! Quantiles, breakpoint bucketing and typed column extraction used by both
//! the cleaner and the metrics engine.

use crate::error::{AnalysisError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;

// =============================================================================
// Quantiles and bucketing
// =============================================================================

/// Nearest-rank quantiles of `values`, NaN values ignored.
///
/// Each quantile is the value at rank `round(q * (n - 1))` of the sorted
/// values, so breakpoints are always observed values. Returns `None` when
/// no value is left.
pub fn quantiles(values: &[f64], qs: &[f64]) -> Result<Option<Vec<f64>>> {
    let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    let ca = Float64Chunked::from_vec(PlSmallStr::EMPTY, present);
    let breakpoints = qs
        .iter()
        .map(|q| ca.quantile(*q, QuantileMethod::Nearest))
        .collect::<PolarsResult<Option<Vec<f64>>>>()?;
    Ok(breakpoints)
}

/// Number of breakpoints strictly below `value`.
///
/// With ascending breakpoints `[b0, b1, ..]` this yields bucket 0 for
/// `value <= b0`, bucket 1 for `b0 < value <= b1`, and so on.
pub fn bucket_upper_inclusive(value: f64, breakpoints: &[f64]) -> usize {
    breakpoints.iter().take_while(|bp| **bp < value).count()
}

/// Number of breakpoints at or below `value`.
///
/// With ascending breakpoints `[b0, b1, ..]` this yields bucket 0 for
/// `value < b0`, bucket 1 for `b0 <= value < b1`, and so on.
pub fn bucket_lower_inclusive(value: f64, breakpoints: &[f64]) -> usize {
    breakpoints.iter().take_while(|bp| **bp <= value).count()
}

// =============================================================================
// Number and date helpers
// =============================================================================

/// Rewrite a comma decimal separator to a point and parse the result.
///
/// ```rust,ignore
/// assert_eq!(parse_decimal("2,55"), Some(2.55));
/// assert_eq!(parse_decimal(" 3.5 "), Some(3.5));
/// assert_eq!(parse_decimal("n/a"), None);
/// assert_eq!(parse_decimal("inf"), None);
/// ```
pub fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

pub(crate) const MILLIS_PER_DAY: i64 = 86_400_000;

/// Milliseconds since the Unix epoch of a naive timestamp.
pub fn to_epoch_millis(ts: &NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_millis()
}

/// Naive timestamp for milliseconds since the Unix epoch.
pub fn from_epoch_millis(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

/// Days since the Unix epoch of the calendar date containing `ms`.
pub fn epoch_day(ms: i64) -> i64 {
    ms.div_euclid(MILLIS_PER_DAY)
}

/// Calendar date for a day count since the Unix epoch.
pub fn date_from_epoch_day(day: i64) -> Option<NaiveDate> {
    from_epoch_millis(day * MILLIS_PER_DAY).map(|ts| ts.date())
}

// =============================================================================
// Column access
// =============================================================================

/// Look up a column, mapping a miss to [`AnalysisError::ColumnNotFound`].
pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|column| column.as_materialized_series())
        .map_err(|_| AnalysisError::ColumnNotFound(name.to_string()))
}

/// Values of a numeric column as `f64`, nulls preserved.
pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = require_column(df, name)?.cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

/// Values of an integer column as `i64`, nulls preserved.
pub fn i64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let series = require_column(df, name)?.cast(&DataType::Int64)?;
    Ok(series.i64()?.into_iter().collect())
}

/// Values of a string column, nulls preserved.
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = require_column(df, name)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

/// Values of a millisecond datetime column as epoch milliseconds.
pub fn datetime_millis(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let series = require_column(df, name)?
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        .cast(&DataType::Int64)?;
    Ok(series.i64()?.into_iter().collect())
}

/// Build a millisecond datetime series from epoch milliseconds.
pub fn datetime_series(name: &str, millis: Vec<Option<i64>>) -> Result<Series> {
    Ok(Series::new(name.into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?)
}

/// Keep the rows of `df` where `keep` is true.
pub fn filter_rows(df: &DataFrame, keep: impl IntoIterator<Item = bool>) -> Result<DataFrame> {
    let mask: BooleanChunked = keep.into_iter().collect();
    Ok(df.filter(&mask)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantiles_nearest_rank() {
        let prices: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(quantiles(&prices, &[0.33, 0.66]).unwrap(), Some(vec![4.0, 7.0]));

        let frequency = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(
            quantiles(&frequency, &[0.25, 0.5, 0.75]).unwrap(),
            Some(vec![2.0, 3.0, 3.0])
        );
    }

    #[test]
    fn test_quantiles_bounds_and_empty() {
        let qs = quantiles(&[5.0, 1.0, 3.0], &[0.0, 0.5, 1.0]).unwrap();
        assert_eq!(qs, Some(vec![1.0, 3.0, 5.0]));
        assert_eq!(quantiles(&[4.2], &[0.33]).unwrap(), Some(vec![4.2]));
        assert_eq!(quantiles(&[], &[0.5]).unwrap(), None);
        assert_eq!(quantiles(&[f64::NAN, 2.0], &[0.5]).unwrap(), Some(vec![2.0]));
    }

    #[test]
    fn test_bucket_upper_inclusive() {
        let bps = [1.0, 2.0, 3.0];
        assert_eq!(bucket_upper_inclusive(0.5, &bps), 0);
        assert_eq!(bucket_upper_inclusive(1.0, &bps), 0);
        assert_eq!(bucket_upper_inclusive(1.5, &bps), 1);
        assert_eq!(bucket_upper_inclusive(3.0, &bps), 2);
        assert_eq!(bucket_upper_inclusive(3.5, &bps), 3);
    }

    #[test]
    fn test_bucket_lower_inclusive() {
        let bps = [1.0, 2.0, 3.0];
        assert_eq!(bucket_lower_inclusive(0.5, &bps), 0);
        assert_eq!(bucket_lower_inclusive(1.0, &bps), 1);
        assert_eq!(bucket_lower_inclusive(2.5, &bps), 2);
        assert_eq!(bucket_lower_inclusive(3.0, &bps), 3);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("2,55"), Some(2.55));
        assert_eq!(parse_decimal(" 3.5 "), Some(3.5));
        assert_eq!(parse_decimal("-1,5"), Some(-1.5));
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("inf"), None);
        assert_eq!(parse_decimal("-Infinity"), None);
        assert_eq!(parse_decimal("NaN"), None);
        assert_eq!(parse_decimal(""), None);
    }

    #[test]
    fn test_epoch_day_roundtrip() {
        let ts = NaiveDate::from_ymd_opt(2011, 12, 9)
            .unwrap()
            .and_hms_opt(12, 50, 0)
            .unwrap();
        let ms = to_epoch_millis(&ts);
        assert_eq!(from_epoch_millis(ms), Some(ts));
        assert_eq!(date_from_epoch_day(epoch_day(ms)), Some(ts.date()));
    }

    #[test]
    fn test_require_column_missing() {
        let df = df!["a" => [1, 2]].unwrap();
        assert!(require_column(&df, "a").is_ok());
        assert!(matches!(
            require_column(&df, "b"),
            Err(AnalysisError::ColumnNotFound(name)) if name == "b"
        ));
    }

    #[test]
    fn test_filter_rows() {
        let df = df!["a" => [1, 2, 3]].unwrap();
        let filtered = filter_rows(&df, [true, false, true]).unwrap();
        assert_eq!(filtered.height(), 2);
        assert_eq!(i64_values(&filtered, "a").unwrap(), vec![Some(1), Some(3)]);
    }
}
