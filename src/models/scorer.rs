//! Fraud-probability scorers

use crate::error::{PipelineError, PipelineResult};
use crate::preprocessing::frame::FeatureMatrix;
use linfa::traits::Fit;
use linfa::Dataset;
use linfa_logistic::LogisticRegression;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

/// A binary classifier producing the probability of the fraud class (label 1).
pub trait Scorer: Send + Sync {
    /// Train on a feature matrix and its labels
    fn fit(&mut self, features: &FeatureMatrix, labels: &Array1<usize>) -> PipelineResult<()>;

    /// Per-row fraud probability in [0, 1]
    fn predict_probability(&self, features: &FeatureMatrix) -> PipelineResult<Array1<f64>>;

    fn name(&self) -> &str;
}

/// Solver settings for [`LogisticScorer`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticConfig {
    pub max_iterations: u64,
    /// L2 regularization strength
    pub alpha: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            max_iterations: 150,
            alpha: 1.0,
        }
    }
}

/// Learned coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticWeights {
    /// Feature names the weights line up with
    pub columns: Vec<String>,
    pub weights: Vec<f64>,
    pub intercept: f64,
}

/// L2-regularized logistic regression.
///
/// Fitting runs the `linfa-logistic` solver; only the coefficients are kept,
/// so a loaded scorer predicts without the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticScorer {
    config: LogisticConfig,
    fitted: Option<LogisticWeights>,
}

impl LogisticScorer {
    pub fn new(config: LogisticConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn weights(&self) -> Option<&LogisticWeights> {
        self.fitted.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }
}

impl Default for LogisticScorer {
    fn default() -> Self {
        Self::new(LogisticConfig::default())
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl Scorer for LogisticScorer {
    fn fit(&mut self, features: &FeatureMatrix, labels: &Array1<usize>) -> PipelineResult<()> {
        if features.nrows() != labels.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: features.nrows(),
                found: labels.len(),
            });
        }
        let classes: BTreeSet<usize> = labels.iter().copied().collect();
        if classes.len() != 2 {
            return Err(PipelineError::Scorer(format!(
                "logistic regression needs exactly two classes, found {:?}",
                classes
            )));
        }

        let dataset = Dataset::new(features.values().clone(), labels.clone());
        let model = LogisticRegression::default()
            .alpha(self.config.alpha)
            .max_iterations(self.config.max_iterations)
            .fit(&dataset)
            .map_err(|e| PipelineError::Scorer(e.to_string()))?;

        // The solver picks its own positive class; flip so weights score label 1
        let sign = if model.labels().pos.class == 1 { 1.0 } else { -1.0 };
        let weights: Vec<f64> = model.params().iter().map(|w| sign * w).collect();
        let intercept = sign * model.intercept();

        info!(
            rows = features.nrows(),
            features = features.ncols(),
            intercept,
            "Logistic scorer fitted"
        );

        self.fitted = Some(LogisticWeights {
            columns: features.column_names().to_vec(),
            weights,
            intercept,
        });
        Ok(())
    }

    fn predict_probability(&self, features: &FeatureMatrix) -> PipelineResult<Array1<f64>> {
        let fitted = self.fitted.as_ref().ok_or(PipelineError::NotFitted {
            component: "logistic scorer",
        })?;
        if features.ncols() != fitted.weights.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: fitted.weights.len(),
                found: features.ncols(),
            });
        }

        let weights = Array1::from_vec(fitted.weights.clone());
        let logits = features.values().dot(&weights) + fitted.intercept;
        Ok(logits.mapv(sigmoid))
    }

    fn name(&self) -> &str {
        "logistic_regression"
    }
}
