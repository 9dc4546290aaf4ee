//! Decimal normalisation of locale-formatted price strings.

use crate::error::{AnalysisError, Result};
use crate::utils::{parse_decimal, require_column};
use polars::prelude::*;

/// Maximum number of offending raw values quoted in a diagnostic.
pub(crate) const MAX_SAMPLES: usize = 5;

/// Convert a string column using `,` or `.` as decimal separator to `Float64`.
///
/// Nulls and blank strings become null. A column that is already numeric is
/// cast to `Float64` unchanged, so normalising twice is a no-op.
///
/// # Errors
///
/// [`AnalysisError::InvalidNumber`] if any non-blank value is still not a
/// number after the separator rewrite.
pub(crate) fn normalize_decimal_column(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let series = require_column(df, column)?;

    let normalized = if series.dtype() == &DataType::String {
        let mut values: Vec<Option<f64>> = Vec::with_capacity(series.len());
        let mut samples = Vec::new();
        let mut count = 0usize;

        for raw in series.str()?.into_iter() {
            match raw.map(str::trim) {
                None | Some("") => values.push(None),
                Some(text) => match parse_decimal(text) {
                    Some(value) => values.push(Some(value)),
                    None => {
                        count += 1;
                        if samples.len() < MAX_SAMPLES {
                            samples.push(text.to_string());
                        }
                        values.push(None);
                    }
                },
            }
        }

        if count > 0 {
            return Err(AnalysisError::InvalidNumber {
                column: column.to_string(),
                samples,
                count,
            });
        }
        Series::new(column.into(), values)
    } else {
        series.cast(&DataType::Float64)?
    };

    let mut df = df.clone();
    df.with_column(normalized)?;
    Ok(df)
}
