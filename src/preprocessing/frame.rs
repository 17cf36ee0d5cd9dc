//! Column selection: the schema, the row-to-column bridge and the columnar
//! frames consumed and produced by the transformers.

use crate::error::{PipelineError, PipelineResult};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Which columns feed the transformers, and which one is the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Columns imputed with the median and standardized
    pub numeric: Vec<String>,
    /// Columns imputed with the mode and one-hot encoded
    pub categorical: Vec<String>,
    /// Binary label column (training only)
    pub target: String,
}

impl FeatureSchema {
    pub fn new(numeric: &[&str], categorical: &[&str], target: &str) -> Self {
        Self {
            numeric: numeric.iter().map(|c| c.to_string()).collect(),
            categorical: categorical.iter().map(|c| c.to_string()).collect(),
            target: target.to_string(),
        }
    }

    /// All input feature columns, numeric first.
    pub fn all_features(&self) -> Vec<&str> {
        self.numeric
            .iter()
            .chain(&self.categorical)
            .map(String::as_str)
            .collect()
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::new(
            &["amt", "hour", "time_since_last_minutes"],
            &["category"],
            "is_fraud",
        )
    }
}

/// A row that can hand out its values by column name.
///
/// Unknown column names are a `MissingColumn` error; `Ok(None)` is a missing
/// value to be imputed.
pub trait FeatureSource {
    fn numeric(&self, column: &str) -> PipelineResult<Option<f64>>;
    fn categorical(&self, column: &str) -> PipelineResult<Option<&str>>;
    fn label(&self, column: &str) -> PipelineResult<Option<usize>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalColumn {
    pub name: String,
    pub values: Vec<Option<String>>,
}

/// Columnar selection of the schema's feature columns, in input row order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    len: usize,
    numeric: Vec<NumericColumn>,
    categorical: Vec<CategoricalColumn>,
    target: Option<Vec<usize>>,
}

impl FeatureFrame {
    /// Select the schema's feature columns from a batch of rows.
    pub fn select<R: FeatureSource>(rows: &[R], schema: &FeatureSchema) -> PipelineResult<Self> {
        let numeric = schema
            .numeric
            .iter()
            .map(|name| {
                let values = rows
                    .iter()
                    .map(|row| row.numeric(name))
                    .collect::<PipelineResult<Vec<_>>>()?;
                Ok(NumericColumn {
                    name: name.clone(),
                    values,
                })
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        let categorical = schema
            .categorical
            .iter()
            .map(|name| {
                let values = rows
                    .iter()
                    .map(|row| Ok(row.categorical(name)?.map(str::to_string)))
                    .collect::<PipelineResult<Vec<_>>>()?;
                Ok(CategoricalColumn {
                    name: name.clone(),
                    values,
                })
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        Ok(Self {
            len: rows.len(),
            numeric,
            categorical,
            target: None,
        })
    }

    /// Select the feature columns plus the target column. Every row must be
    /// labelled.
    pub fn select_with_target<R: FeatureSource>(rows: &[R], schema: &FeatureSchema) -> PipelineResult<Self> {
        let mut frame = Self::select(rows, schema)?;
        let labels = rows
            .iter()
            .enumerate()
            .map(|(row, source)| {
                source
                    .label(&schema.target)?
                    .ok_or(PipelineError::MissingTarget { row })
            })
            .collect::<PipelineResult<Vec<_>>>()?;
        frame.target = Some(labels);
        Ok(frame)
    }

    /// Build a frame directly from columns. All columns must have equal length.
    pub fn from_columns(
        numeric: Vec<(&str, Vec<Option<f64>>)>,
        categorical: Vec<(&str, Vec<Option<&str>>)>,
    ) -> PipelineResult<Self> {
        let len = numeric
            .first()
            .map(|(_, values)| values.len())
            .or_else(|| categorical.first().map(|(_, values)| values.len()))
            .unwrap_or(0);

        let numeric = numeric
            .into_iter()
            .map(|(name, values)| {
                check_len(len, values.len())?;
                Ok(NumericColumn {
                    name: name.to_string(),
                    values,
                })
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        let categorical = categorical
            .into_iter()
            .map(|(name, values)| {
                check_len(len, values.len())?;
                Ok(CategoricalColumn {
                    name: name.to_string(),
                    values: values.into_iter().map(|v| v.map(str::to_string)).collect(),
                })
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        Ok(Self {
            len,
            numeric,
            categorical,
            target: None,
        })
    }

    /// Attach labels to a frame built with [`FeatureFrame::from_columns`].
    pub fn with_target(mut self, labels: Vec<usize>) -> PipelineResult<Self> {
        check_len(self.len, labels.len())?;
        self.target = Some(labels);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn numeric_column(&self, name: &str) -> PipelineResult<&[Option<f64>]> {
        self.numeric
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
    }

    pub fn categorical_column(&self, name: &str) -> PipelineResult<&[Option<String>]> {
        self.categorical
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
    }

    /// Target labels, if the frame was selected with them.
    pub fn labels(&self) -> Option<Array1<usize>> {
        self.target.as_ref().map(|t| Array1::from_vec(t.clone()))
    }
}

fn check_len(expected: usize, found: usize) -> PipelineResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(PipelineError::ShapeMismatch { expected, found })
    }
}

/// Dense numeric output of the column transformer.
///
/// Rows mirror the input frame's row order; columns are the numeric features
/// followed by the one-hot indicators in vocabulary order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    values: Array2<f64>,
    columns: Vec<String>,
}

impl FeatureMatrix {
    pub fn new(values: Array2<f64>, columns: Vec<String>) -> PipelineResult<Self> {
        check_len(columns.len(), values.ncols())?;
        Ok(Self { values, columns })
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.values.row(index)
    }

    /// Value at `(row, column name)`, if the column exists.
    pub fn get(&self, row: usize, column: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.values.get((row, col)).copied()
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn into_values(self) -> Array2<f64> {
        self.values
    }

    /// Number of non-zero entries.
    pub fn nnz(&self) -> usize {
        self.values.iter().filter(|v| **v != 0.0).count()
    }
}
