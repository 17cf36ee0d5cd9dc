//! Batch inference: preprocess, score, decide

use crate::config::AppConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::models::decision::ScoringDecision;
use crate::models::loader::ArtifactStore;
use crate::models::scorer::Scorer;
use crate::preprocessing::Preprocessor;
use crate::types::request::{PredictionRequest, PredictionResponse};
use anyhow::{Context, Result};
use tracing::{debug, info};

/// Result of scoring one batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPrediction {
    /// 0/1 fraud labels in request order
    pub labels: Vec<u8>,
    pub probabilities: Vec<f64>,
    /// Categorical values not seen at fit time
    pub unknown_categories: usize,
}

impl BatchPrediction {
    pub fn flagged(&self) -> usize {
        self.labels.iter().filter(|l| **l == 1).count()
    }
}

/// Scores prediction batches with a fitted preprocessor and scorer.
///
/// Shared read-only across serving tasks.
pub struct InferenceEngine {
    preprocessor: Preprocessor,
    scorer: Box<dyn Scorer>,
    decision: ScoringDecision,
}

impl InferenceEngine {
    pub fn new(
        preprocessor: Preprocessor,
        scorer: Box<dyn Scorer>,
        decision: ScoringDecision,
    ) -> PipelineResult<Self> {
        if !preprocessor.is_fitted() {
            return Err(PipelineError::NotFitted {
                component: "preprocessor",
            });
        }

        Ok(Self {
            preprocessor,
            scorer,
            decision,
        })
    }

    /// Build an engine from persisted artifacts
    pub fn from_store(store: &ArtifactStore, config: &AppConfig) -> Result<Self> {
        let preprocessor = store.load_preprocessor()?;
        let scorer = store.load_scorer()?;
        let decision = ScoringDecision::new(config.detection.threshold);

        let engine = Self::new(preprocessor, Box::new(scorer), decision)
            .context("Loaded preprocessor is not usable")?;

        info!(
            scorer = engine.scorer.name(),
            threshold = decision.threshold(),
            features = engine.preprocessor.state().map(|s| s.width()).unwrap_or(0),
            "Inference engine initialized"
        );

        Ok(engine)
    }

    /// Score a batch of requests. Labels come back in request order.
    pub fn predict(&self, requests: &[PredictionRequest]) -> PipelineResult<BatchPrediction> {
        if requests.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "empty prediction batch".to_string(),
            ));
        }
        for (index, request) in requests.iter().enumerate() {
            request.validate(index)?;
        }

        let (features, report) = self.preprocessor.transform_rows(requests)?;
        let probabilities = self.scorer.predict_probability(&features)?.to_vec();
        let labels = self.decision.decide_all(&probabilities);

        debug!(
            rows = requests.len(),
            flagged = labels.iter().filter(|l| **l == 1).count(),
            "Batch scored"
        );

        Ok(BatchPrediction {
            labels,
            probabilities,
            unknown_categories: report.unknown_categories,
        })
    }

    /// Decode a JSON array of requests and score it
    pub fn predict_payload(&self, payload: &[u8]) -> PipelineResult<BatchPrediction> {
        let requests: Vec<PredictionRequest> = serde_json::from_slice(payload)
            .map_err(|e| PipelineError::InvalidRequest(e.to_string()))?;
        self.predict(&requests)
    }

    /// Decode, score and build the reply in one step
    pub fn handle_payload(&self, payload: &[u8]) -> PredictionResponse {
        Self::to_response(&self.predict_payload(payload))
    }

    /// Wire response for a batch result
    pub fn to_response(result: &PipelineResult<BatchPrediction>) -> PredictionResponse {
        match result {
            Ok(prediction) => PredictionResponse::Predictions {
                predictions: prediction.labels.clone(),
            },
            Err(e) => PredictionResponse::from_error(e),
        }
    }

    pub fn decision(&self) -> ScoringDecision {
        self.decision
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }
}
