//! Invoice date parsing with an ordered list of fallback formats.
//!
//! Each value is tried against every format in order and the first format
//! that parses the whole value wins. A value matching no format is never
//! dropped: the parse fails with a [`DateParseFailure`] quoting the first
//! offending values together with the reason each format rejected them.

use crate::cleaner::numeric::MAX_SAMPLES;
use crate::error::{AnalysisError, DateParseFailure, FailedValue, Result};
use crate::utils::{datetime_series, require_column, to_epoch_millis};
use chrono::NaiveDateTime;
use polars::prelude::*;
use tracing::debug;

/// Day/month/year with seconds.
pub const FORMAT_WITH_SECONDS: &str = "%d/%m/%Y %H:%M:%S";
/// Day/month/year without seconds.
pub const FORMAT_WITHOUT_SECONDS: &str = "%d/%m/%Y %H:%M";

const NULL_MARKER: &str = "<null>";

/// Parser trying a fixed list of `chrono` formats in priority order.
#[derive(Debug, Clone)]
pub struct DateParser {
    formats: Vec<String>,
}

impl Default for DateParser {
    fn default() -> Self {
        Self::new([FORMAT_WITH_SECONDS, FORMAT_WITHOUT_SECONDS])
    }
}

impl DateParser {
    pub fn new<I, S>(formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            formats: formats.into_iter().map(Into::into).collect(),
        }
    }

    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    /// Parse one value, returning every `(format, reason)` on failure.
    pub fn parse_value(&self, raw: &str) -> std::result::Result<NaiveDateTime, Vec<(String, String)>> {
        let trimmed = raw.trim();
        let mut attempts = Vec::with_capacity(self.formats.len());
        for format in &self.formats {
            match NaiveDateTime::parse_from_str(trimmed, format) {
                Ok(ts) => return Ok(ts),
                Err(e) => attempts.push((format.clone(), e.to_string())),
            }
        }
        Err(attempts)
    }

    /// Parse every value of `source` into a new millisecond datetime column `target`.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::DateParse`] if any value (including a missing one)
    /// matches none of the formats.
    pub fn parse_column(&self, df: &DataFrame, source: &str, target: &str) -> Result<DataFrame> {
        let series = require_column(df, source)?;
        let mut parsed: Vec<Option<i64>> = Vec::with_capacity(series.len());
        let mut samples = Vec::new();
        let mut total_failures = 0usize;

        for raw in series.str()?.into_iter() {
            let outcome = match raw {
                Some(value) => self.parse_value(value),
                None => Err(self
                    .formats
                    .iter()
                    .map(|f| (f.clone(), "value is missing".to_string()))
                    .collect()),
            };

            match outcome {
                Ok(ts) => parsed.push(Some(to_epoch_millis(&ts))),
                Err(attempts) => {
                    total_failures += 1;
                    if samples.len() < MAX_SAMPLES {
                        samples.push(FailedValue {
                            raw: raw.unwrap_or(NULL_MARKER).to_string(),
                            attempts,
                        });
                    }
                    parsed.push(None);
                }
            }
        }

        if total_failures > 0 {
            return Err(AnalysisError::DateParse(DateParseFailure {
                column: source.to_string(),
                formats: self.formats.clone(),
                samples,
                total_failures,
            }));
        }

        debug!("Parsed {} values of '{}' into '{}'", parsed.len(), source, target);

        let mut df = df.clone();
        df.with_column(datetime_series(target, parsed)?)?;
        Ok(df)
    }
}
