//! Median imputation followed by standardization.

use super::{DegenerateScalePolicy, FitState};
use crate::error::{PipelineError, PipelineResult};
use crate::preprocessing::frame::FeatureFrame;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Learned statistics for one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumnParams {
    pub name: String,
    /// Median of the observed values, used to fill missing ones
    pub median: f64,
    /// Mean of the imputed column
    pub mean: f64,
    /// Population standard deviation of the imputed column
    pub std: f64,
}

impl NumericColumnParams {
    /// A column with no observed values is filled with 0 and treated as
    /// constant.
    fn fit(name: &str, values: &[Option<f64>]) -> Self {
        let mut observed: Vec<f64> = values.iter().filter_map(|v| observed_value(*v)).collect();
        if observed.is_empty() {
            warn!(column = %name, rows = values.len(), "No observed values, filling with 0");
            return Self {
                name: name.to_string(),
                median: 0.0,
                mean: 0.0,
                std: 0.0,
            };
        }
        let median = median(&mut observed);

        // Constant columns must scale exactly, whatever rounding the mean picks up
        if observed.iter().all(|x| *x == median) {
            return Self {
                name: name.to_string(),
                median,
                mean: median,
                std: 0.0,
            };
        }

        let imputed: Vec<f64> = values
            .iter()
            .map(|v| observed_value(*v).unwrap_or(median))
            .collect();
        let n = imputed.len() as f64;
        let mean = imputed.iter().sum::<f64>() / n;
        let variance = imputed.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        Self {
            name: name.to_string(),
            median,
            mean,
            std: variance.sqrt(),
        }
    }

    fn scale(&self, value: Option<f64>, policy: DegenerateScalePolicy) -> f64 {
        let x = observed_value(value).unwrap_or(self.median);
        if self.std == 0.0 {
            return match policy {
                DegenerateScalePolicy::Zero => 0.0,
                DegenerateScalePolicy::Center => x - self.mean,
            };
        }
        (x - self.mean) / self.std
    }
}

/// NaN counts as missing
fn observed_value(value: Option<f64>) -> Option<f64> {
    value.filter(|x| !x.is_nan())
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Imputes and scales the numeric columns of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericTransformer {
    columns: Vec<String>,
    policy: DegenerateScalePolicy,
    state: FitState<Vec<NumericColumnParams>>,
}

impl NumericTransformer {
    pub fn new(columns: Vec<String>, policy: DegenerateScalePolicy) -> Self {
        Self {
            columns,
            policy,
            state: FitState::Unfit,
        }
    }

    /// Restore a fitted transformer from persisted parameters.
    pub fn from_params(params: Vec<NumericColumnParams>, policy: DegenerateScalePolicy) -> Self {
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
            .map(|name| Ok(NumericColumnParams::fit(name, frame.numeric_column(name)?)))
            .collect::<PipelineResult<Vec<_>>>()?;
        self.state = FitState::Fitted(params);
        Ok(())
    }

    pub fn transform(&self, frame: &FeatureFrame) -> PipelineResult<Array2<f64>> {
        let params = self.params()?;
        let mut output = Array2::zeros((frame.len(), params.len()));

        for (col, column) in params.iter().enumerate() {
            let values = frame.numeric_column(&column.name)?;
            for (row, value) in values.iter().enumerate() {
                output[[row, col]] = column.scale(*value, self.policy);
            }
        }

        Ok(output)
    }

    pub fn params(&self) -> PipelineResult<&[NumericColumnParams]> {
        self.state
            .params("numeric transformer")
            .map(Vec::as_slice)
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_fitted()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn output_names(&self) -> Vec<String> {
        self.columns.clone()
    }
}
