//! Column transformer: runs the numeric and categorical transformers on
//! their columns and concatenates the results.

use super::categorical::{CategoricalColumnParams, CategoricalTransformer};
use super::numeric::{NumericColumnParams, NumericTransformer};
use super::TransformPolicy;
use crate::error::{PipelineError, PipelineResult};
use crate::preprocessing::frame::{FeatureFrame, FeatureMatrix, FeatureSchema};
use ndarray::{concatenate, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Everything learned at fit time. Immutable once produced; this is what
/// gets persisted for serving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedState {
    pub schema: FeatureSchema,
    pub policy: TransformPolicy,
    pub numeric: Vec<NumericColumnParams>,
    pub categorical: Vec<CategoricalColumnParams>,
}

impl FittedState {
    /// Output width: one column per numeric feature plus one per category.
    pub fn width(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|c| c.vocabulary.len())
                .sum::<usize>()
    }
}

/// Per-call diagnostics from a transform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformReport {
    pub rows: usize,
    /// Values encoded as all-zero because they were not seen at fit time
    pub unknown_categories: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnTransformer {
    schema: FeatureSchema,
    policy: TransformPolicy,
    numeric: NumericTransformer,
    categorical: CategoricalTransformer,
}

impl ColumnTransformer {
    pub fn new(schema: FeatureSchema, policy: TransformPolicy) -> Self {
        Self {
            numeric: NumericTransformer::new(schema.numeric.clone(), policy.degenerate_scale),
            categorical: CategoricalTransformer::new(schema.categorical.clone(), policy.unknown_category),
            schema,
            policy,
        }
    }

    /// Restore a fitted transformer from persisted state.
    pub fn from_state(state: FittedState) -> Self {
        Self {
            numeric: NumericTransformer::from_params(state.numeric, state.policy.degenerate_scale),
            categorical: CategoricalTransformer::from_params(
                state.categorical,
                state.policy.unknown_category,
            ),
            schema: state.schema,
            policy: state.policy,
        }
    }

    /// Fit both transformers and return the transformed training frame.
    ///
    /// Either both transformers are fitted or neither is.
    pub fn fit_transform(&mut self, frame: &FeatureFrame) -> PipelineResult<FeatureMatrix> {
        let mut numeric = NumericTransformer::new(self.schema.numeric.clone(), self.policy.degenerate_scale);
        let mut categorical =
            CategoricalTransformer::new(self.schema.categorical.clone(), self.policy.unknown_category);
        numeric.fit(frame)?;
        categorical.fit(frame)?;
        self.numeric = numeric;
        self.categorical = categorical;

        debug!(
            rows = frame.len(),
            width = self.width()?,
            "Column transformer fitted"
        );

        self.transform(frame)
    }

    pub fn transform(&self, frame: &FeatureFrame) -> PipelineResult<FeatureMatrix> {
        self.transform_with_report(frame).map(|(matrix, _)| matrix)
    }

    pub fn transform_with_report(&self, frame: &FeatureFrame) -> PipelineResult<(FeatureMatrix, TransformReport)> {
        self.ensure_fitted()?;

        let numeric = self.numeric.transform(frame)?;
        let (categorical, unknown_categories) = self.categorical.transform(frame)?;

        let values = concatenate(Axis(1), &[numeric.view(), categorical.view()]).map_err(|_| {
            PipelineError::ShapeMismatch {
                expected: numeric.nrows(),
                found: categorical.nrows(),
            }
        })?;
        let matrix = FeatureMatrix::new(values, self.feature_names()?)?;

        Ok((
            matrix,
            TransformReport {
                rows: frame.len(),
                unknown_categories,
            },
        ))
    }

    pub fn ensure_fitted(&self) -> PipelineResult<()> {
        if self.is_fitted() {
            Ok(())
        } else {
            Err(PipelineError::NotFitted {
                component: "column transformer",
            })
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.numeric.is_fitted() && self.categorical.is_fitted()
    }

    /// Output column names: numeric features, then `<column>_<category>`.
    pub fn feature_names(&self) -> PipelineResult<Vec<String>> {
        self.ensure_fitted()?;
        let mut names = self.numeric.output_names();
        names.extend(self.categorical.output_names()?);
        Ok(names)
    }

    pub fn width(&self) -> PipelineResult<usize> {
        Ok(self.feature_names()?.len())
    }

    /// Snapshot of the fitted parameters for persistence.
    pub fn state(&self) -> PipelineResult<FittedState> {
        Ok(FittedState {
            schema: self.schema.clone(),
            policy: self.policy,
            numeric: self.numeric.params()?.to_vec(),
            categorical: self.categorical.params()?.to_vec(),
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }
}
