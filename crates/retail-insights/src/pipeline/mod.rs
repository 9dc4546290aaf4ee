//! Pipeline module.
//!
//! Load, clean, compute, export and render, with progress reporting and
//! cancellation.

mod builder;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder};
pub use progress::{
    CancellationToken, ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
