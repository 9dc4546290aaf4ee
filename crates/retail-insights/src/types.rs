//! Domain types shared by the cleaner, the metrics engine and the exporter.

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Column names of the raw and cleaned tables.
pub mod columns {
    pub const INVOICE_NO: &str = "InvoiceNo";
    pub const STOCK_CODE: &str = "StockCode";
    pub const DESCRIPTION: &str = "Description";
    pub const QUANTITY: &str = "Quantity";
    pub const INVOICE_DATE: &str = "InvoiceDate";
    pub const UNIT_PRICE: &str = "UnitPrice";
    pub const CUSTOMER_ID: &str = "CustomerID";
    pub const COUNTRY: &str = "Country";

    pub const ORDER_DATE: &str = "OrderDate";
    pub const REVENUE: &str = "Revenue";
    pub const MONTH: &str = "Month";
    pub const WEEKDAY: &str = "WeekDay";
    pub const HOUR: &str = "Hour";
    pub const PRICE_CATEGORY: &str = "PriceCategory";

    pub const IS_LARGE_ORDER: &str = "IsLargeOrder";
    pub const TIME_SEGMENT: &str = "TimeSegment";

    /// Raw input columns, in file order.
    pub const RAW: [&str; 8] = [
        INVOICE_NO,
        STOCK_CODE,
        DESCRIPTION,
        QUANTITY,
        INVOICE_DATE,
        UNIT_PRICE,
        CUSTOMER_ID,
        COUNTRY,
    ];
}

// ============================================================================
// Cleaning
// ============================================================================

/// Price tier of a row, relative to the batch it was cleaned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTier {
    Low,
    Medium,
    Premium,
}

impl PriceTier {
    /// Tiers in ascending order; indexed by bucket position.
    pub const ALL: [PriceTier; 3] = [PriceTier::Low, PriceTier::Medium, PriceTier::Premium];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::Premium => "premium",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.label() == label)
    }
}

impl fmt::Display for PriceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unit-price breakpoints computed for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceThresholds {
    /// Price at the lower quantile; prices at or below are `low`.
    pub low: f64,
    /// Price at the upper quantile; prices at or below are `medium`.
    pub high: f64,
}

/// Steps of the cleaning pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStep {
    NormalizeNumbers,
    FilterInvalid,
    ParseDates,
    ComputeRevenue,
    TemporalFeatures,
    PriceTiers,
    DropMissingCustomers,
}

impl CleaningStep {
    pub const ALL: [CleaningStep; 7] = [
        CleaningStep::NormalizeNumbers,
        CleaningStep::FilterInvalid,
        CleaningStep::ParseDates,
        CleaningStep::ComputeRevenue,
        CleaningStep::TemporalFeatures,
        CleaningStep::PriceTiers,
        CleaningStep::DropMissingCustomers,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::NormalizeNumbers => "Normalizing numeric columns",
            Self::FilterInvalid => "Filtering invalid quantities and prices",
            Self::ParseDates => "Parsing invoice dates",
            Self::ComputeRevenue => "Computing revenue",
            Self::TemporalFeatures => "Extracting temporal features",
            Self::PriceTiers => "Assigning price tiers",
            Self::DropMissingCustomers => "Dropping rows without customer",
        }
    }

    /// 1-based position of the step in the pipeline.
    pub fn position(&self) -> usize {
        Self::ALL
            .iter()
            .position(|step| step == self)
            .map_or(0, |idx| idx + 1)
    }
}

/// Row-count transition of one cleaning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: CleaningStep,
    pub rows_before: usize,
    pub rows_after: usize,
}

impl StepReport {
    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }
}

/// Output of the cleaner.
#[derive(Debug, Clone)]
pub struct CleanedData {
    /// Cleaned table with the derived columns.
    pub frame: DataFrame,
    /// One report per executed step, in order.
    pub steps: Vec<StepReport>,
    /// Price breakpoints of this batch (None when no rows reached step 6).
    pub thresholds: Option<PriceThresholds>,
}

// ============================================================================
// RFM segmentation
// ============================================================================

/// Named customer segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    Champions,
    LoyalCustomers,
    PotentialCustomers,
    AtRiskCustomers,
}

impl Segment {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Champions => "Champions",
            Self::LoyalCustomers => "Loyal Customers",
            Self::PotentialCustomers => "Potential Customers",
            Self::AtRiskCustomers => "At-Risk Customers",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Recency, frequency and monetary scores of a customer, each in 1..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RfmScore {
    pub recency: u8,
    pub frequency: u8,
    pub monetary: u8,
}

/// A segment rule: predicate over the three scores and the segment it selects.
pub type SegmentRule = (fn(&RfmScore) -> bool, Segment);

fn is_top_half(score: u8) -> bool {
    score >= 3
}

fn is_bottom_half(score: u8) -> bool {
    score <= 2
}

fn is_champion(s: &RfmScore) -> bool {
    is_top_half(s.recency) && is_top_half(s.frequency) && is_top_half(s.monetary)
}

fn is_loyal(s: &RfmScore) -> bool {
    is_bottom_half(s.recency) && is_top_half(s.frequency) && is_top_half(s.monetary)
}

fn is_potential(s: &RfmScore) -> bool {
    is_bottom_half(s.recency) && is_bottom_half(s.frequency) && is_top_half(s.monetary)
}

/// Segment rules in priority order; the first matching rule wins and
/// customers matching none are [`Segment::AtRiskCustomers`].
pub const SEGMENT_RULES: [SegmentRule; 3] = [
    (is_champion, Segment::Champions),
    (is_loyal, Segment::LoyalCustomers),
    (is_potential, Segment::PotentialCustomers),
];

impl RfmScore {
    pub fn new(recency: u8, frequency: u8, monetary: u8) -> Self {
        Self {
            recency,
            frequency,
            monetary,
        }
    }

    /// Three-digit code in recency, frequency, monetary order (e.g. "344").
    pub fn code(&self) -> String {
        format!("{}{}{}", self.recency, self.frequency, self.monetary)
    }

    /// Segment selected by the first matching rule of `rules`.
    pub fn segment_with(&self, rules: &[SegmentRule]) -> Segment {
        rules
            .iter()
            .find(|(matches, _)| matches(self))
            .map_or(Segment::AtRiskCustomers, |(_, segment)| *segment)
    }

    /// Segment selected by [`SEGMENT_RULES`].
    pub fn segment(&self) -> Segment {
        self.segment_with(&SEGMENT_RULES)
    }
}

// ============================================================================
// KPI report
// ============================================================================

/// Global scalar KPIs of a cleaned batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalKpis {
    pub total_revenue: f64,
    pub total_orders: usize,
    pub total_customers: usize,
    pub total_products: usize,
    /// Mean of per-invoice revenue totals.
    pub average_order_value: f64,
    /// Mean of per-invoice quantity totals.
    pub average_items_per_order: f64,
}

/// Daily, weekday and hourly aggregates.
#[derive(Debug, Clone)]
pub struct TemporalTables {
    pub daily: DataFrame,
    pub weekday: DataFrame,
    pub hourly: DataFrame,
}

/// Everything computed from one cleaned batch, handed to the exporter.
#[derive(Debug, Clone)]
pub struct KpiReport {
    pub global: GlobalKpis,
    pub top_products: DataFrame,
    pub price_analysis: DataFrame,
    pub customer_metrics: DataFrame,
    pub segment_summary: DataFrame,
    pub temporal: TemporalTables,
}

// ============================================================================
// Run summary
// ============================================================================

/// Outcome of the render step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderStatus {
    /// The renderer succeeded and produced this document.
    Rendered { document: PathBuf },
    /// Rendering was disabled by configuration.
    Skipped,
    /// The renderer failed; the result files are still usable.
    Failed { reason: String },
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub input_file: PathBuf,
    pub report_dir: PathBuf,
    pub rows_loaded: usize,
    pub rows_cleaned: usize,
    pub cleaning_steps: Vec<StepReport>,
    pub price_thresholds: Option<PriceThresholds>,
    /// Result of the post-clean validation check.
    pub validation_passed: bool,
    pub global_kpis: GlobalKpis,
    pub exported_files: Vec<PathBuf>,
    pub render: RenderStatus,
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}
