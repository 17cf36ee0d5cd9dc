//! Preprocessing pipeline: imputation, one-hot encoding and scaling with a
//! fit-once / transform-many contract.
//!
//! A [`Preprocessor`] is built from training rows, fitted once with
//! [`Preprocessor::fit_transform`], and then shared read-only for
//! [`Preprocessor::transform`] calls. Transforming never touches the fitted
//! state, and transforming before fitting is an error rather than an
//! implicit fit.

pub mod categorical;
pub mod column;
pub mod frame;
pub mod numeric;

pub use column::{ColumnTransformer, FittedState, TransformReport};
pub use frame::{FeatureFrame, FeatureMatrix, FeatureSchema, FeatureSource};

use crate::error::{PipelineError, PipelineResult};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Fit state of a transformer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FitState<P> {
    Unfit,
    Fitted(P),
}

impl<P> FitState<P> {
    pub fn is_fitted(&self) -> bool {
        matches!(self, FitState::Fitted(_))
    }

    /// Fitted parameters, or `NotFitted` naming the component.
    pub fn params(&self, component: &'static str) -> PipelineResult<&P> {
        match self {
            FitState::Fitted(params) => Ok(params),
            FitState::Unfit => Err(PipelineError::NotFitted { component }),
        }
    }
}

/// What to do with a categorical value not seen at fit time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownCategoryPolicy {
    /// Encode as an all-zero indicator row and carry on
    #[default]
    Ignore,
    /// Fail the transform
    Error,
}

/// How to scale a column whose fit-time standard deviation is zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegenerateScalePolicy {
    /// Output 0 for every row
    #[default]
    Zero,
    /// Output `x - mean` (unit scale)
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransformPolicy {
    #[serde(default)]
    pub unknown_category: UnknownCategoryPolicy,
    #[serde(default)]
    pub degenerate_scale: DegenerateScalePolicy,
}

/// Orchestrates column selection and the column transformer.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    training: Option<FeatureFrame>,
    transformer: ColumnTransformer,
}

impl Preprocessor {
    /// Select the schema's feature and target columns from training rows.
    pub fn new<R: FeatureSource>(rows: &[R], schema: FeatureSchema, policy: TransformPolicy) -> PipelineResult<Self> {
        let frame = FeatureFrame::select_with_target(rows, &schema)?;
        Ok(Self::from_frame(frame, schema, policy))
    }

    /// Use an already selected training frame.
    pub fn from_frame(frame: FeatureFrame, schema: FeatureSchema, policy: TransformPolicy) -> Self {
        Self {
            training: Some(frame),
            transformer: ColumnTransformer::new(schema, policy),
        }
    }

    /// Restore a fitted preprocessor from persisted state. It holds no
    /// training data and cannot be refit.
    pub fn from_state(state: FittedState) -> Self {
        Self {
            training: None,
            transformer: ColumnTransformer::from_state(state),
        }
    }

    /// Fit on the retained training frame and return its transformed matrix.
    ///
    /// Fitting is deterministic, so calling this again on the same instance
    /// reproduces the same state.
    pub fn fit_transform(&mut self) -> PipelineResult<FeatureMatrix> {
        let frame = self.training.as_ref().ok_or(PipelineError::EmptyFrame)?;
        let matrix = self.transformer.fit_transform(frame)?;

        info!(
            rows = matrix.nrows(),
            width = matrix.ncols(),
            "Preprocessor fitted"
        );

        Ok(matrix)
    }

    pub fn transform(&self, frame: &FeatureFrame) -> PipelineResult<FeatureMatrix> {
        self.transformer.transform(frame)
    }

    pub fn transform_with_report(&self, frame: &FeatureFrame) -> PipelineResult<(FeatureMatrix, TransformReport)> {
        self.transformer.transform_with_report(frame)
    }

    /// Select and transform rows in one go. The fit check comes first, so an
    /// unfitted preprocessor reports `NotFitted` for any input.
    pub fn transform_rows<R: FeatureSource>(&self, rows: &[R]) -> PipelineResult<(FeatureMatrix, TransformReport)> {
        self.transformer.ensure_fitted()?;
        let frame = FeatureFrame::select(rows, self.schema())?;
        self.transform_with_report(&frame)
    }

    pub fn is_fitted(&self) -> bool {
        self.transformer.is_fitted()
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.transformer.schema()
    }

    pub fn numeric_features(&self) -> &[String] {
        &self.schema().numeric
    }

    pub fn categorical_features(&self) -> &[String] {
        &self.schema().categorical
    }

    pub fn target(&self) -> &str {
        &self.schema().target
    }

    pub fn feature_names(&self) -> PipelineResult<Vec<String>> {
        self.transformer.feature_names()
    }

    /// Labels of the retained training frame.
    pub fn labels(&self) -> Option<Array1<usize>> {
        self.training.as_ref().and_then(FeatureFrame::labels)
    }

    pub fn state(&self) -> PipelineResult<FittedState> {
        self.transformer.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_engineering::TimestampFeatures;
    use crate::types::request::PredictionRequest;
    use crate::types::transaction::TransactionRecord;

    fn training_rows() -> Vec<TransactionRecord> {
        vec![
            TransactionRecord::new("1234", "2019-01-01 08:00:00", Some(10.0), Some("food")).with_label(0),
            TransactionRecord::new("1234", "2019-01-01 09:30:00", Some(20.0), Some("food")).with_label(0),
            TransactionRecord::new("1234", "2019-01-01 10:00:00", None, Some("travel")).with_label(1),
        ]
    }

    fn fitted() -> Preprocessor {
        let engineered = TimestampFeatures::new().engineer(training_rows()).unwrap();
        let mut preprocessor =
            Preprocessor::new(&engineered, FeatureSchema::default(), TransformPolicy::default()).unwrap();
        preprocessor.fit_transform().unwrap();
        preprocessor
    }

    #[test]
    fn test_end_to_end_scenario() {
        let preprocessor = fitted();
        assert_eq!(preprocessor.labels().unwrap().to_vec(), vec![0, 0, 1]);

        let (matrix, report) = preprocessor
            .transform_rows(&[PredictionRequest::new(15.0, 10, 7.0, "food")])
            .unwrap();

        assert_eq!(matrix.nrows(), 1);
        assert_eq!(matrix.ncols(), 5);
        assert_eq!(matrix.get(0, "category_food"), Some(1.0));
        assert_eq!(matrix.get(0, "category_travel"), Some(0.0));
        assert_eq!(report.unknown_categories, 0);
        // amt median is 15, the mean of the imputed column [10, 20, 15]
        assert_eq!(matrix.get(0, "amt"), Some(0.0));
    }

    #[test]
    fn test_transform_is_deterministic() {
        let preprocessor = fitted();
        let state = preprocessor.state().unwrap();
        let rows = vec![
            PredictionRequest::new(1000.0, 23, 10.0, "shopping_net"),
            PredictionRequest::new(50.0, 15, 5.0, "food"),
        ];

        let (first, _) = preprocessor.transform_rows(&rows).unwrap();
        let (second, _) = preprocessor.transform_rows(&rows).unwrap();

        assert_eq!(first, second);
        assert_eq!(preprocessor.state().unwrap(), state);
    }

    #[test]
    fn test_row_order_preserved() {
        let preprocessor = fitted();
        let rows = vec![
            PredictionRequest::new(5.0, 1, 1.0, "travel"),
            PredictionRequest::new(500.0, 2, 2.0, "food"),
            PredictionRequest::new(50.0, 3, 3.0, "travel"),
        ];

        let (matrix, _) = preprocessor.transform_rows(&rows).unwrap();
        let single = |row: &PredictionRequest| preprocessor.transform_rows(&[row.clone()]).unwrap().0;

        for (i, row) in rows.iter().enumerate() {
            assert_eq!(matrix.row(i), single(row).row(0));
        }
    }

    #[test]
    fn test_transform_before_fit_is_error() {
        let engineered = TimestampFeatures::new().engineer(training_rows()).unwrap();
        let preprocessor =
            Preprocessor::new(&engineered, FeatureSchema::default(), TransformPolicy::default()).unwrap();
        let empty: Vec<PredictionRequest> = Vec::new();

        assert!(!preprocessor.is_fitted());
        for rows in [empty, vec![PredictionRequest::new(1.0, 1, 1.0, "food")]] {
            let err = preprocessor.transform_rows(&rows).unwrap_err();
            assert_eq!(err.kind(), "not_fitted");
        }
    }

    #[test]
    fn test_refit_reproduces_state() {
        let mut preprocessor = fitted();
        let state = preprocessor.state().unwrap();
        preprocessor.fit_transform().unwrap();
        assert_eq!(preprocessor.state().unwrap(), state);
    }

    #[test]
    fn test_restored_preprocessor_cannot_refit() {
        let mut restored = Preprocessor::from_state(fitted().state().unwrap());
        assert!(restored.is_fitted());
        assert_eq!(restored.fit_transform().unwrap_err(), PipelineError::EmptyFrame);
    }

    #[test]
    fn test_introspection() {
        let preprocessor = fitted();
        assert_eq!(
            preprocessor.numeric_features(),
            &["amt", "hour", "time_since_last_minutes"]
        );
        assert_eq!(preprocessor.categorical_features(), &["category"]);
        assert_eq!(preprocessor.target(), "is_fraud");
    }

    #[test]
    fn test_unlabelled_training_row_rejected() {
        let mut rows = training_rows();
        rows[1].is_fraud = None;
        let engineered = TimestampFeatures::new().engineer(rows).unwrap();

        let err = Preprocessor::new(&engineered, FeatureSchema::default(), TransformPolicy::default())
            .unwrap_err();
        assert_eq!(err, PipelineError::MissingTarget { row: 1 });
    }
}
