//! Prediction request and response wire types

use crate::error::{PipelineError, PipelineResult};
use crate::preprocessing::frame::FeatureSource;
use serde::{Deserialize, Serialize};

/// One row of a serving batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Transaction amount
    pub amt: f64,
    /// Hour of day, 0-23
    pub hour: u32,
    /// Minutes since the card's previous transaction
    pub time_since_last_minutes: f64,
    /// Merchant category, e.g. "shopping_net"
    pub category: String,
}

impl PredictionRequest {
    pub fn new(amt: f64, hour: u32, time_since_last_minutes: f64, category: &str) -> Self {
        Self {
            amt,
            hour,
            time_since_last_minutes,
            category: category.to_string(),
        }
    }

    /// Reject values the pipeline cannot meaningfully score
    pub fn validate(&self, index: usize) -> PipelineResult<()> {
        if !self.amt.is_finite() {
            return Err(PipelineError::InvalidRequest(format!(
                "request {}: amt must be a finite number",
                index
            )));
        }
        if self.hour > 23 {
            return Err(PipelineError::InvalidRequest(format!(
                "request {}: hour {} is outside 0-23",
                index, self.hour
            )));
        }
        if !self.time_since_last_minutes.is_finite() {
            return Err(PipelineError::InvalidRequest(format!(
                "request {}: time_since_last_minutes must be a finite number",
                index
            )));
        }
        Ok(())
    }
}

impl FeatureSource for PredictionRequest {
    fn numeric(&self, column: &str) -> PipelineResult<Option<f64>> {
        match column {
            "amt" => Ok(Some(self.amt)),
            "hour" => Ok(Some(self.hour as f64)),
            "time_since_last_minutes" => Ok(Some(self.time_since_last_minutes)),
            other => Err(PipelineError::MissingColumn(other.to_string())),
        }
    }

    fn categorical(&self, column: &str) -> PipelineResult<Option<&str>> {
        match column {
            "category" => Ok(Some(self.category.as_str())),
            other => Err(PipelineError::MissingColumn(other.to_string())),
        }
    }

    fn label(&self, column: &str) -> PipelineResult<Option<usize>> {
        Err(PipelineError::MissingColumn(column.to_string()))
    }
}

/// Error body returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: String,
    pub detail: String,
}

/// Reply to a prediction batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionResponse {
    Predictions { predictions: Vec<u8> },
    Error { error: ErrorDetail },
}

impl PredictionResponse {
    pub fn from_error(err: &PipelineError) -> Self {
        PredictionResponse::Error {
            error: ErrorDetail {
                kind: err.kind().to_string(),
                detail: err.to_string(),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PredictionResponse::Error { .. })
    }
}
