//! Mode imputation followed by one-hot encoding.

use super::{FitState, UnknownCategoryPolicy};
use crate::error::{PipelineError, PipelineResult};
use crate::preprocessing::frame::FeatureFrame;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Learned mode and vocabulary for one categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumnParams {
    pub name: String,
    /// Most frequent observed value, used to fill missing ones. `None` when
    /// the column had no observed values at fit time.
    pub mode: Option<String>,
    /// Distinct observed values in lexicographic order; the position is the
    /// indicator column offset
    pub vocabulary: Vec<String>,
}

impl CategoricalColumnParams {
    /// A column with no observed values gets an empty vocabulary and no
    /// mode, so it contributes no indicator columns.
    fn fit(name: &str, values: &[Option<String>]) -> Self {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for value in values.iter().flatten() {
            *counts.entry(value.as_str()).or_insert(0) += 1;
        }

        // Ties resolve to the smallest value since the map iterates in order
        let mut mode: Option<(&str, usize)> = None;
        for (&value, &count) in &counts {
            if mode.map_or(true, |(_, best)| count > best) {
                mode = Some((value, count));
            }
        }
        if mode.is_none() {
            warn!(column = %name, rows = values.len(), "No observed values, column encodes to nothing");
        }

        Self {
            name: name.to_string(),
            mode: mode.map(|(value, _)| value.to_string()),
            vocabulary: counts.keys().map(|v| v.to_string()).collect(),
        }
    }

    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.vocabulary
            .binary_search_by(|candidate| candidate.as_str().cmp(value))
            .ok()
    }

    pub fn output_names(&self) -> impl Iterator<Item = String> + '_ {
        self.vocabulary
            .iter()
            .map(move |value| format!("{}_{}", self.name, value))
    }
}

/// Imputes and one-hot encodes the categorical columns of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalTransformer {
    columns: Vec<String>,
    policy: UnknownCategoryPolicy,
    state: FitState<Vec<CategoricalColumnParams>>,
}

impl CategoricalTransformer {
    pub fn new(columns: Vec<String>, policy: UnknownCategoryPolicy) -> Self {
        Self {
            columns,
            policy,
            state: FitState::Unfit,
        }
    }

    /// Restore a fitted transformer from persisted parameters.
    pub fn from_params(params: Vec<CategoricalColumnParams>, policy: UnknownCategoryPolicy) -> Self {
        Self {
            columns: params.iter().map(|p| p.name.clone()).collect(),
            policy,
            state: FitState::Fitted(params),
        }
    }

    pub fn fit(&mut self, frame: &FeatureFrame) -> PipelineResult<()> {
        if frame.is_empty() {
            return Err(PipelineError::EmptyFrame);
        }
        let params = self
            .columns
            .iter()
            .map(|name| Ok(CategoricalColumnParams::fit(name, frame.categorical_column(name)?)))
            .collect::<PipelineResult<Vec<_>>>()?;
        self.state = FitState::Fitted(params);
        Ok(())
    }

    /// Encode a frame. Returns the indicator block and the number of values
    /// that fell outside the fit-time vocabulary.
    pub fn transform(&self, frame: &FeatureFrame) -> PipelineResult<(Array2<f64>, usize)> {
        let params = self.params()?;
        let width = params.iter().map(|p| p.vocabulary.len()).sum::<usize>();
        let mut output = Array2::zeros((frame.len(), width));
        let mut unknown_total = 0;

        let mut offset = 0;
        for column in params {
            let values = frame.categorical_column(&column.name)?;
            let mut unknown: BTreeSet<&str> = BTreeSet::new();
            let mut unknown_rows = 0;

            for (row, value) in values.iter().enumerate() {
                let value = match value.as_deref().or(column.mode.as_deref()) {
                    Some(value) => value,
                    None => continue,
                };
                match column.index_of(value) {
                    Some(index) => output[[row, offset + index]] = 1.0,
                    None => match self.policy {
                        // Row stays all-zero for this column
                        UnknownCategoryPolicy::Ignore => {
                            unknown.insert(value);
                            unknown_rows += 1;
                        }
                        UnknownCategoryPolicy::Error => {
                            return Err(PipelineError::UnknownCategory {
                                column: column.name.clone(),
                                value: value.to_string(),
                            });
                        }
                    },
                }
            }

            if unknown_rows > 0 {
                warn!(
                    column = %column.name,
                    rows = unknown_rows,
                    values = ?unknown,
                    "Unknown categories encoded as all-zero"
                );
            }
            unknown_total += unknown_rows;
            offset += column.vocabulary.len();
        }

        Ok((output, unknown_total))
    }

    pub fn params(&self) -> PipelineResult<&[CategoricalColumnParams]> {
        self.state
            .params("categorical transformer")
            .map(Vec::as_slice)
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_fitted()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn output_names(&self) -> PipelineResult<Vec<String>> {
        Ok(self.params()?.iter().flat_map(|p| p.output_names()).collect())
    }
}
