//! Progress reporting and cancellation for the analysis pipeline.
//!
//! Progress is a side channel: the pipeline emits [`ProgressUpdate`]s to an
//! injected [`ProgressReporter`] and never prints on its own. A
//! [`CancellationToken`] can stop a run from another thread.
//!
//! # Example
//!
//! ```rust,ignore
//! use retail_insights::{CancellationToken, Pipeline};
//!
//! let token = CancellationToken::new();
//!
//! let summary = Pipeline::builder()
//!     .cancellation_token(token.clone())
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run("data/raw/sales_data.csv")?;
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stages of the analysis pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Reading the input file
    Loading,
    /// Running the cleaning steps
    Cleaning,
    /// Computing KPIs and segments
    Metrics,
    /// Writing result files and the report document
    Exporting,
    /// Running the external renderer
    Rendering,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline was cancelled by the caller
    Cancelled,
    /// Pipeline failed with an error
    Failed,
}

impl PipelineStage {
    /// Stages a successful run passes through, in order.
    pub const RUN_ORDER: [PipelineStage; 5] = [
        PipelineStage::Loading,
        PipelineStage::Cleaning,
        PipelineStage::Metrics,
        PipelineStage::Exporting,
        PipelineStage::Rendering,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Data",
            Self::Cleaning => "Cleaning Data",
            Self::Metrics => "Computing Metrics",
            Self::Exporting => "Exporting Results",
            Self::Rendering => "Rendering Report",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }

    /// Share of the whole run spent in this stage (0.0 - 1.0).
    pub fn weight(&self) -> f32 {
        match self {
            Self::Loading => 0.10,
            Self::Cleaning => 0.35,
            Self::Metrics => 0.30,
            Self::Exporting => 0.10,
            Self::Rendering => 0.15,
            Self::Complete | Self::Cancelled | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Loading => 0.0,
            Self::Cleaning => 0.10,
            Self::Metrics => 0.45,
            Self::Exporting => 0.75,
            Self::Rendering => 0.85,
            Self::Complete => 1.0,
            Self::Cancelled | Self::Failed => 0.0,
        }
    }
}

/// One progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current pipeline stage
    pub stage: PipelineStage,

    /// Optional sub-stage description (e.g., "Step 3/7: Parsing invoice dates")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    /// Human-readable message describing current activity
    pub message: String,

    /// Row count entering the step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_before: Option<usize>,

    /// Row count leaving the step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_after: Option<usize>,
}

impl ProgressUpdate {
    /// Creates a new progress update for a stage without sub-stage info.
    pub fn new(stage: PipelineStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let stage_progress = stage_progress.clamp(0.0, 1.0);
        Self {
            stage,
            sub_stage: None,
            progress: (stage.base_progress() + stage.weight() * stage_progress).clamp(0.0, 1.0),
            stage_progress,
            message: message.into(),
            rows_before: None,
            rows_after: None,
        }
    }

    /// Creates a progress update with sub-stage information.
    pub fn with_sub_stage(
        stage: PipelineStage,
        sub_stage: impl Into<String>,
        stage_progress: f32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            sub_stage: Some(sub_stage.into()),
            ..Self::new(stage, stage_progress, message)
        }
    }

    /// Attach the row-count transition of a step.
    pub fn rows(mut self, before: usize, after: usize) -> Self {
        self.rows_before = Some(before);
        self.rows_after = Some(after);
        self
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Complete, 1.0, message)
    }

    pub fn cancelled() -> Self {
        Self::new(PipelineStage::Cancelled, 0.0, "Pipeline cancelled by user")
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Failed, 0.0, message)
    }
}

/// Receiver of progress updates.
///
/// Implementations must be `Send + Sync` so a run on a worker thread can
/// report to a caller on another.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

/// Token for cancelling a running pipeline.
///
/// Clones share one atomic flag. The pipeline checks it between stages and
/// while waiting on the renderer, returning
/// [`AnalysisError::Cancelled`](crate::error::AnalysisError::Cancelled).
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Safe to call from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can be reused for another run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}
