//! Error taxonomy shared by the scoring, forecast and simulation engines.

use serde::Serialize;
use thiserror::Error;

/// Result alias used across the engines.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Coarse error classes surfaced to the calling layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    Validation,
    Configuration,
    UnknownIndicator,
    UnknownDistrict,
    InsufficientData,
    InsufficientHistory,
    DataOrder,
    Allocation,
    InvalidBudget,
}

/// Errors produced by the analytical engines.
///
/// Every variant names the offending field or quantity so the calling layer
/// can build its own message without parsing strings.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    /// Malformed or out-of-range input value.
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Weights, thresholds or coefficients are misconfigured.
    #[error("configuration error in {field}: {reason}")]
    Configuration { field: String, reason: String },

    /// A weighted indicator category has no value for the district.
    #[error("district {district} has no value for indicator {indicator}")]
    UnknownIndicator { district: String, indicator: String },

    /// District id not present in the loaded dataset.
    #[error("unknown district: {0}")]
    UnknownDistrict(String),

    /// Not enough paired observations, or a degenerate (zero-variance) input.
    #[error("insufficient data for {context}: need {required}, got {available}")]
    InsufficientData {
        context: String,
        required: usize,
        available: usize,
    },

    /// Time series shorter than the model needs.
    #[error("insufficient history: need at least {required} points, got {available}")]
    InsufficientHistory { required: usize, available: usize },

    /// Non-monotonic or gapped series.
    #[error("series out of order at index {index}: year {year} follows {previous}")]
    DataOrder { index: usize, year: i32, previous: i32 },

    /// Lever percentages out of range or not summing to 100.
    #[error("invalid lever allocation ({field}): {reason}")]
    Allocation { field: String, reason: String },

    /// Budget must be strictly positive.
    #[error("total budget must be > 0, got {0}")]
    InvalidBudget(String),
}

impl EngineError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn allocation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Allocation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn insufficient_data(context: impl Into<String>, required: usize, available: usize) -> Self {
        Self::InsufficientData {
            context: context.into(),
            required,
            available,
        }
    }

    /// Error class for the calling layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::UnknownIndicator { .. } => ErrorKind::UnknownIndicator,
            Self::UnknownDistrict(_) => ErrorKind::UnknownDistrict,
            Self::InsufficientData { .. } => ErrorKind::InsufficientData,
            Self::InsufficientHistory { .. } => ErrorKind::InsufficientHistory,
            Self::DataOrder { .. } => ErrorKind::DataOrder,
            Self::Allocation { .. } => ErrorKind::Allocation,
            Self::InvalidBudget(_) => ErrorKind::InvalidBudget,
        }
    }

    /// Name of the offending field or quantity, when the variant carries one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. }
            | Self::Configuration { field, .. }
            | Self::Allocation { field, .. } => Some(field),
            Self::UnknownIndicator { indicator, .. } => Some(indicator),
            Self::InsufficientData { context, .. } => Some(context),
            Self::DataOrder { .. } | Self::InsufficientHistory { .. } => Some("series"),
            Self::InvalidBudget(_) => Some("total_budget"),
            Self::UnknownDistrict(_) => Some("district_id"),
        }
    }
}
