//! Configuration types for the retail analysis pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default quantiles splitting unit prices into low / medium / premium.
pub const DEFAULT_PRICE_TIER_QUANTILES: (f64, f64) = (0.33, 0.66);

/// Default renderer program.
pub const DEFAULT_RENDERER: &str = "quarto";

/// Default upper bound on how long the renderer may run.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(600);

/// Configuration for the analysis pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use retail_insights::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .output_dir("data/processed")
///     .render_report(false)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory under which report folders are created.
    /// Default: "output"
    pub output_dir: PathBuf,

    /// Directory containing `template.qmd`.
    /// If None, the bundled default template is used.
    /// Default: None
    pub template_dir: Option<PathBuf>,

    /// Whether each run writes into its own `report_YYYYMMDD_HHMMSS` folder.
    /// When false, files are written directly into `output_dir`.
    /// Default: true
    pub timestamped_output: bool,

    /// Lower and upper unit-price quantiles for the price tiers.
    /// Default: (0.33, 0.66)
    pub price_tier_quantiles: (f64, f64),

    /// Whether to invoke the external renderer after exporting.
    /// Default: true
    pub render_report: bool,

    /// Program used to render the report.
    /// Default: "quarto"
    pub renderer_program: String,

    /// Maximum time the renderer may run before it is killed.
    /// None waits indefinitely.
    /// Default: 600 seconds
    pub render_timeout: Option<Duration>,

    /// Keep only the first N rows of the top-products table.
    /// Default: None (all products)
    pub top_products_limit: Option<usize>,

    /// Whether to add the `IsLargeOrder` and `TimeSegment` columns.
    /// Default: false
    pub advanced_features: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            template_dir: None,
            timestamped_output: true,
            price_tier_quantiles: DEFAULT_PRICE_TIER_QUANTILES,
            render_report: true,
            renderer_program: DEFAULT_RENDERER.to_string(),
            render_timeout: Some(DEFAULT_RENDER_TIMEOUT),
            top_products_limit: None,
            advanced_features: false,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let (low, high) = self.price_tier_quantiles;
        for (field, value) in [("price_tier_quantiles.0", low), ("price_tier_quantiles.1", high)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::InvalidQuantile {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if low >= high {
            return Err(ConfigValidationError::UnorderedQuantiles { low, high });
        }

        if self.renderer_program.trim().is_empty() {
            return Err(ConfigValidationError::EmptyRenderer);
        }

        if self.render_timeout == Some(Duration::ZERO) {
            return Err(ConfigValidationError::ZeroTimeout);
        }

        if self.top_products_limit == Some(0) {
            return Err(ConfigValidationError::ZeroTopProductsLimit);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid quantile for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidQuantile { field: String, value: f64 },

    #[error("Price tier quantiles must be strictly increasing, got ({low}, {high})")]
    UnorderedQuantiles { low: f64, high: f64 },

    #[error("Renderer program must not be empty")]
    EmptyRenderer,

    #[error("Render timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Top products limit must be at least 1")]
    ZeroTopProductsLimit,
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    output_dir: Option<PathBuf>,
    template_dir: Option<PathBuf>,
    timestamped_output: Option<bool>,
    price_tier_quantiles: Option<(f64, f64)>,
    render_report: Option<bool>,
    renderer_program: Option<String>,
    render_timeout: Option<Option<Duration>>,
    top_products_limit: Option<usize>,
    advanced_features: Option<bool>,
}

impl PipelineConfigBuilder {
    /// Set the directory under which report folders are created.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Use `template.qmd` from this directory instead of the bundled template.
    pub fn template_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_dir = Some(path.into());
        self
    }

    /// Enable or disable the per-run timestamped report folder.
    pub fn timestamped_output(mut self, enable: bool) -> Self {
        self.timestamped_output = Some(enable);
        self
    }

    /// Set the unit-price quantiles separating low/medium and medium/premium.
    ///
    /// # Arguments
    /// * `low` - Value between 0.0 and 1.0 (e.g., 0.33)
    /// * `high` - Value between 0.0 and 1.0, strictly above `low`
    pub fn price_tier_quantiles(mut self, low: f64, high: f64) -> Self {
        self.price_tier_quantiles = Some((low, high));
        self
    }

    /// Enable or disable the external render step.
    pub fn render_report(mut self, render: bool) -> Self {
        self.render_report = Some(render);
        self
    }

    /// Set the renderer program (looked up on `PATH`).
    pub fn renderer_program(mut self, program: impl Into<String>) -> Self {
        self.renderer_program = Some(program.into());
        self
    }

    /// Set the render timeout. `None` waits for the renderer indefinitely.
    pub fn render_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.render_timeout = Some(timeout);
        self
    }

    /// Keep only the first `limit` rows of the top-products table.
    pub fn top_products_limit(mut self, limit: usize) -> Self {
        self.top_products_limit = Some(limit);
        self
    }

    /// Enable or disable the advanced feature columns.
    pub fn advanced_features(mut self, enable: bool) -> Self {
        self.advanced_features = Some(enable);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let config = PipelineConfig {
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from("output")),
            template_dir: self.template_dir,
            timestamped_output: self.timestamped_output.unwrap_or(true),
            price_tier_quantiles: self
                .price_tier_quantiles
                .unwrap_or(DEFAULT_PRICE_TIER_QUANTILES),
            render_report: self.render_report.unwrap_or(true),
            renderer_program: self
                .renderer_program
                .unwrap_or_else(|| DEFAULT_RENDERER.to_string()),
            render_timeout: self.render_timeout.unwrap_or(Some(DEFAULT_RENDER_TIMEOUT)),
            top_products_limit: self.top_products_limit,
            advanced_features: self.advanced_features.unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }
}
