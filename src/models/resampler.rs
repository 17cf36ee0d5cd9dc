//! Class rebalancing for training data

use crate::error::{PipelineError, PipelineResult};
use crate::preprocessing::frame::FeatureMatrix;
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use tracing::info;

/// Rebalances a labelled feature matrix. Column order and meaning are kept.
pub trait Resampler {
    fn resample(
        &self,
        features: &FeatureMatrix,
        labels: &Array1<usize>,
    ) -> PipelineResult<(FeatureMatrix, Array1<usize>)>;
}

/// Synthetic minority oversampling.
///
/// Every class smaller than the majority is grown to the majority count with
/// points interpolated between a random member and one of its `k` nearest
/// same-class neighbours. Original rows come first, synthetic rows after.
#[derive(Debug, Clone)]
pub struct Smote {
    k_neighbors: usize,
    seed: u64,
}

impl Smote {
    pub fn new(k_neighbors: usize, seed: u64) -> Self {
        Self {
            k_neighbors: k_neighbors.max(1),
            seed,
        }
    }
}

impl Default for Smote {
    fn default() -> Self {
        Self::new(5, 42)
    }
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// For each member, the positions (within `members`) of its `k` nearest
/// other members.
fn nearest_neighbors(values: &Array2<f64>, members: &[usize], k: usize) -> Vec<Vec<usize>> {
    members
        .iter()
        .enumerate()
        .map(|(i, &row)| {
            let mut distances: Vec<(f64, usize)> = members
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(j, &other)| (squared_distance(values.row(row), values.row(other)), j))
                .collect();
            distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            distances.into_iter().take(k).map(|(_, j)| j).collect()
        })
        .collect()
}

impl Resampler for Smote {
    fn resample(
        &self,
        features: &FeatureMatrix,
        labels: &Array1<usize>,
    ) -> PipelineResult<(FeatureMatrix, Array1<usize>)> {
        if features.nrows() != labels.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: features.nrows(),
                found: labels.len(),
            });
        }

        let mut classes: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (row, label) in labels.iter().enumerate() {
            classes.entry(*label).or_default().push(row);
        }
        let majority = classes.values().map(Vec::len).max().unwrap_or(0);

        let values = features.values();
        let width = features.ncols();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut data: Vec<f64> = values.iter().copied().collect();
        let mut out_labels = labels.to_vec();

        for (&label, members) in &classes {
            let needed = majority - members.len();
            if needed == 0 {
                continue;
            }
            if members.len() < 2 {
                return Err(PipelineError::InsufficientMinority {
                    found: members.len(),
                    required: 2,
                });
            }

            let k = self.k_neighbors.min(members.len() - 1);
            let neighbors = nearest_neighbors(values, members, k);

            for _ in 0..needed {
                let i = rng.gen_range(0..members.len());
                let j = neighbors[i][rng.gen_range(0..k)];
                let gap: f64 = rng.gen();
                let base = values.row(members[i]);
                let other = values.row(members[j]);
                data.extend(base.iter().zip(other.iter()).map(|(a, b)| a + gap * (b - a)));
                out_labels.push(label);
            }

            info!(
                class = label,
                original = members.len(),
                synthetic = needed,
                "Oversampled class"
            );
        }

        let rows = out_labels.len();
        let resampled = Array2::from_shape_vec((rows, width), data).map_err(|_| {
            PipelineError::ShapeMismatch {
                expected: rows * width,
                found: rows,
            }
        })?;

        Ok((
            FeatureMatrix::new(resampled, features.column_names().to_vec())?,
            Array1::from_vec(out_labels),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> (FeatureMatrix, Array1<usize>) {
        let values = Array2::from_shape_vec(
            (8, 2),
            vec![
                0.0, 0.0, //
                1.0, 0.0, //
                0.0, 1.0, //
                1.0, 1.0, //
                2.0, 2.0, //
                10.0, 10.0, //
                11.0, 10.0, //
                10.0, 11.0,
            ],
        )
        .unwrap();
        let matrix = FeatureMatrix::new(values, vec!["x".to_string(), "y".to_string()]).unwrap();
        (matrix, Array1::from_vec(vec![0, 0, 0, 0, 0, 1, 1, 1]))
    }

    #[test]
    fn test_balances_classes() {
        let (features, labels) = dataset();
        let (resampled, new_labels) = Smote::new(2, 42).resample(&features, &labels).unwrap();

        assert_eq!(resampled.nrows(), 10);
        assert_eq!(new_labels.iter().filter(|l| **l == 1).count(), 5);
        assert_eq!(resampled.column_names(), features.column_names());

        // Originals are kept in place
        for row in 0..8 {
            assert_eq!(resampled.row(row), features.row(row));
        }
        // Synthetic points lie inside the minority cluster's bounding box
        for row in 8..10 {
            let point = resampled.row(row);
            assert!(point.iter().all(|v| (10.0..=11.0).contains(v)));
        }
    }

    #[test]
    fn test_seeded_resampling_is_reproducible() {
        let (features, labels) = dataset();
        let first = Smote::new(2, 7).resample(&features, &labels).unwrap();
        let second = Smote::new(2, 7).resample(&features, &labels).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_balanced_input_unchanged() {
        let (features, _) = dataset();
        let labels = Array1::from_vec(vec![0, 1, 0, 1, 0, 1, 0, 1]);
        let (resampled, new_labels) = Smote::default().resample(&features, &labels).unwrap();
        assert_eq!(resampled, features);
        assert_eq!(new_labels, labels);
    }

    #[test]
    fn test_single_minority_row_rejected() {
        let (features, _) = dataset();
        let labels = Array1::from_vec(vec![0, 0, 0, 0, 0, 0, 0, 1]);
        let err = Smote::default().resample(&features, &labels).unwrap_err();
        assert_eq!(err, PipelineError::InsufficientMinority { found: 1, required: 2 });
    }
}
