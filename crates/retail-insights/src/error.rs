//! Error types for the retail analysis pipeline.
//!
//! Every failure the pipeline can raise is a variant of [`AnalysisError`].
//! Variants map onto four categories (see [`ErrorCategory`]): input problems
//! and parse problems abort a run, render problems are downgraded to
//! warnings by the pipeline, and everything else is internal.
//!
//! Errors serialize as `{code, message}` so the CLI can emit them as JSON.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Broad classification of an [`AnalysisError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Missing file, schema mismatch, bad configuration.
    Input,
    /// A value could not be parsed after every fallback.
    Parse,
    /// The external document renderer is missing or failed.
    Render,
    /// Anything else (I/O, polars, serialization, cancellation).
    Internal,
}

/// One raw date value that matched none of the known formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedValue {
    /// The raw value as read from the file (`<null>` for a missing value).
    pub raw: String,
    /// `(format, reason)` for every format that was tried, in order.
    pub attempts: Vec<(String, String)>,
}

/// Structured diagnostic for a date column that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateParseFailure {
    /// Column that was being parsed.
    pub column: String,
    /// Formats tried for every value, in priority order.
    pub formats: Vec<String>,
    /// First few offending values, in input order.
    pub samples: Vec<FailedValue>,
    /// Total number of values that matched no format.
    pub total_failures: usize,
}

impl std::fmt::Display for DateParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let raws: Vec<&str> = self.samples.iter().map(|s| s.raw.as_str()).collect();
        write!(
            f,
            "{} value(s) in '{}' match none of the formats {:?}; samples: {:?}",
            self.total_failures, self.column, self.formats, raws
        )
    }
}

/// Failure of the external document renderer.
///
/// The pipeline never propagates these; they are reported as warnings
/// and the exported result files stay usable.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The renderer program could not be found on `PATH`.
    #[error("Renderer '{0}' is not installed or not on PATH")]
    ProgramNotFound(String),

    /// The renderer ran but exited unsuccessfully.
    #[error("Renderer exited with status {0}")]
    ExitStatus(String),

    /// The renderer did not finish within the configured timeout.
    #[error("Renderer did not finish within {0:?}")]
    TimedOut(Duration),

    /// The report template could not be found.
    #[error("Report template not found: {0}")]
    TemplateMissing(PathBuf),

    /// Rendering was cancelled through the cancellation token.
    #[error("Rendering cancelled")]
    Cancelled,

    /// IO failure while spawning or waiting on the renderer.
    #[error("IO error while rendering: {0}")]
    Io(#[from] std::io::Error),
}

/// The main error type for the analysis pipeline.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Pipeline was cancelled by the caller.
    #[error("Pipeline cancelled")]
    Cancelled,

    /// Input file does not exist.
    #[error("Input file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Input header does not match the expected schema.
    #[error("Schema mismatch: expected columns {expected:?}, found {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Values that remained non-numeric after decimal normalisation.
    #[error("{count} non-numeric value(s) in column '{column}'; samples: {samples:?}")]
    InvalidNumber {
        column: String,
        samples: Vec<String>,
        count: usize,
    },

    /// Dates that matched none of the known formats.
    #[error("Failed to parse dates: {0}")]
    DateParse(DateParseFailure),

    /// No rows left to compute metrics on.
    #[error("No rows left to analyse after cleaning")]
    EmptyDataset,

    /// External renderer failure.
    #[error("Report rendering failed: {0}")]
    Render(#[from] RenderError),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AnalysisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::FileNotFound(_) => "FILE_NOT_FOUND",
            Self::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidNumber { .. } => "INVALID_NUMBER",
            Self::DateParse(_) => "DATE_PARSE_FAILED",
            Self::EmptyDataset => "EMPTY_DATASET",
            Self::Render(_) => "RENDER_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Category of this error in the pipeline's failure taxonomy.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::FileNotFound(_)
            | Self::SchemaMismatch { .. }
            | Self::ColumnNotFound(_)
            | Self::InvalidConfig(_)
            | Self::EmptyDataset => ErrorCategory::Input,
            Self::InvalidNumber { .. } | Self::DateParse(_) => ErrorCategory::Parse,
            Self::Render(_) => ErrorCategory::Render,
            Self::Cancelled | Self::Io(_) | Self::Polars(_) | Self::Json(_) => {
                ErrorCategory::Internal
            }
            Self::WithContext { source, .. } => source.category(),
        }
    }

    /// Whether this error must abort the run.
    pub fn is_fatal(&self) -> bool {
        self.category() != ErrorCategory::Render
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

impl Serialize for AnalysisError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AnalysisError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalysisError::Polars(e).with_context(context))
    }
}
