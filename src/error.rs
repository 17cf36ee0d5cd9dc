//! Error taxonomy for the scoring pipeline.

use thiserror::Error;

/// Errors raised by feature engineering, preprocessing, scoring and request
/// validation.
///
/// Missing values and unseen categories are not errors: they are recovered
/// locally by the imputation and ignore policies.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error("unparseable timestamp {value:?} at row {row}")]
    Parse { row: usize, value: String },

    #[error("{component} has not been fit to training data")]
    NotFitted { component: &'static str },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("column '{0}' is not available")]
    MissingColumn(String),

    #[error("training row {row} has no target label")]
    MissingTarget { row: usize },

    #[error("cannot fit on an empty frame")]
    EmptyFrame,

    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("unknown category {value:?} in column '{column}'")]
    UnknownCategory { column: String, value: String },

    #[error("resampling needs at least {required} minority rows, found {found}")]
    InsufficientMinority { found: usize, required: usize },

    #[error("scorer failed: {0}")]
    Scorer(String),
}

impl PipelineError {
    /// Stable identifier used in error replies and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Parse { .. } => "parse_error",
            PipelineError::NotFitted { .. } => "not_fitted",
            PipelineError::InvalidRequest(_) => "invalid_request",
            PipelineError::MissingColumn(_) => "missing_column",
            PipelineError::MissingTarget { .. } => "missing_target",
            PipelineError::EmptyFrame => "empty_frame",
            PipelineError::ShapeMismatch { .. } => "shape_mismatch",
            PipelineError::UnknownCategory { .. } => "unknown_category",
            PipelineError::InsufficientMinority { .. } => "insufficient_minority",
            PipelineError::Scorer(_) => "scorer_error",
        }
    }

    /// Whether the caller's input caused the error (and retrying it unchanged
    /// would fail again).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Parse { .. }
                | PipelineError::InvalidRequest(_)
                | PipelineError::MissingColumn(_)
                | PipelineError::UnknownCategory { .. }
        )
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
