//! Offline training run

use crate::config::AppConfig;
use crate::dataset::read_transactions;
use crate::error::PipelineResult;
use crate::feature_engineering::TimestampFeatures;
use crate::models::loader::ArtifactStore;
use crate::models::resampler::{Resampler, Smote};
use crate::models::scorer::{LogisticScorer, Scorer};
use crate::preprocessing::Preprocessor;
use crate::types::transaction::TransactionRecord;
use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tracing::info;

/// Statistics of a training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub rows: usize,
    pub fraud_rows: usize,
    pub feature_width: usize,
    /// Rows the scorer was fit on, after resampling
    pub scorer_rows: usize,
    pub engineer_time: Duration,
    pub preprocess_time: Duration,
    pub resample_time: Duration,
    pub fit_time: Duration,
}

/// Fitted artifacts of a training run
pub struct TrainingOutput {
    pub preprocessor: Preprocessor,
    pub scorer: LogisticScorer,
    pub summary: TrainingSummary,
}

/// Engineer, preprocess, optionally resample, and fit the scorer in memory.
pub fn train_from_records(
    records: Vec<TransactionRecord>,
    config: &AppConfig,
) -> PipelineResult<TrainingOutput> {
    let rows = records.len();

    let start = Instant::now();
    let engineered = TimestampFeatures::new().engineer(records)?;
    let engineer_time = start.elapsed();

    let start = Instant::now();
    let mut preprocessor =
        Preprocessor::new(&engineered, config.features.clone(), config.preprocessing)?;
    let features = preprocessor.fit_transform()?;
    let labels = preprocessor.labels().unwrap_or_default();
    let preprocess_time = start.elapsed();

    let fraud_rows = labels.iter().filter(|l| **l == 1).count();
    info!(
        rows,
        fraud_rows,
        legit_rows = rows - fraud_rows,
        fraud_rate = format!("{:.4}", fraud_rows as f64 / rows.max(1) as f64),
        "Class balance"
    );

    let start = Instant::now();
    let (features, labels) = if config.training.resample {
        Smote::new(config.training.k_neighbors, config.training.seed).resample(&features, &labels)?
    } else {
        (features, labels)
    };
    let resample_time = start.elapsed();

    let start = Instant::now();
    let mut scorer = LogisticScorer::new(config.training.scorer);
    scorer.fit(&features, &labels)?;
    let fit_time = start.elapsed();

    let summary = TrainingSummary {
        rows,
        fraud_rows,
        feature_width: features.ncols(),
        scorer_rows: features.nrows(),
        engineer_time,
        preprocess_time,
        resample_time,
        fit_time,
    };

    Ok(TrainingOutput {
        preprocessor,
        scorer,
        summary,
    })
}

/// Train from the configured CSV and persist both artifacts
pub fn run_training(config: &AppConfig) -> Result<TrainingSummary> {
    let records = read_transactions(&config.data.train_path)?;
    let output = train_from_records(records, config).context("Training failed")?;

    let store = ArtifactStore::new(&config.artifacts);
    store.save_preprocessor(&output.preprocessor)?;
    store.save_scorer(&output.scorer)?;

    let summary = output.summary;
    info!(
        rows = summary.rows,
        fraud_rows = summary.fraud_rows,
        feature_width = summary.feature_width,
        scorer_rows = summary.scorer_rows,
        engineer_ms = summary.engineer_time.as_millis(),
        preprocess_ms = summary.preprocess_time.as_millis(),
        resample_ms = summary.resample_time.as_millis(),
        fit_ms = summary.fit_time.as_millis(),
        "Training complete"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inference::InferenceEngine;
    use crate::types::request::PredictionRequest;
    use std::io::Write;

    fn records() -> Vec<TransactionRecord> {
        let mut records = Vec::new();
        for i in 0..16 {
            let category = if i % 2 == 0 { "grocery_pos" } else { "food" };
            records.push(
                TransactionRecord::new(
                    &format!("card{}", i % 4),
                    &format!("2019-01-{:02} {:02}:15:00", 1 + i / 4, 8 + i % 4),
                    Some(20.0 + i as f64),
                    Some(category),
                )
                .with_label(0),
            );
        }
        for i in 0..4 {
            records.push(
                TransactionRecord::new(
                    "card9",
                    &format!("2019-01-05 0{}:00:00", i),
                    Some(900.0 + 50.0 * i as f64),
                    Some("shopping_net"),
                )
                .with_label(1),
            );
        }
        records
    }

    #[test]
    fn test_train_from_records() {
        let output = train_from_records(records(), &AppConfig::default()).unwrap();

        assert_eq!(output.summary.rows, 20);
        assert_eq!(output.summary.fraud_rows, 4);
        // amt, hour, time_since_last_minutes + three categories
        assert_eq!(output.summary.feature_width, 6);
        assert_eq!(output.summary.scorer_rows, 32);
        assert!(output.scorer.is_fitted());

        let (features, _) = output
            .preprocessor
            .transform_rows(&[
                PredictionRequest::new(1000.0, 2, 60.0, "shopping_net"),
                PredictionRequest::new(25.0, 9, 1440.0, "grocery_pos"),
            ])
            .unwrap();
        let probs = output.scorer.predict_probability(&features).unwrap();
        assert!(probs[0] > probs[1]);
    }

    #[test]
    fn test_without_resampling() {
        let mut config = AppConfig::default();
        config.training.resample = false;

        let output = train_from_records(records(), &config).unwrap();
        assert_eq!(output.summary.scorer_rows, 20);
    }

    #[test]
    fn test_single_transaction_cards_train() {
        // Every card appears once, so no gap is ever observed
        let records: Vec<TransactionRecord> = records()
            .into_iter()
            .enumerate()
            .map(|(i, mut record)| {
                record.account_id = format!("solo{}", i);
                record
            })
            .collect();

        let output = train_from_records(records, &AppConfig::default()).unwrap();

        assert_eq!(output.summary.feature_width, 6);
        let params = output.preprocessor.state().unwrap().numeric;
        assert_eq!(params[2].name, "time_since_last_minutes");
        assert_eq!(params[2].std, 0.0);
    }

    #[test]
    fn test_bad_timestamp_fails_training() {
        let mut records = records();
        records[3].timestamp = "yesterday".to_string();

        let err = train_from_records(records, &AppConfig::default())
            .err()
            .unwrap();
        assert_eq!(err.kind(), "parse_error");
    }

    #[test]
    fn test_run_training_persists_artifacts() {
        let dir = std::env::temp_dir().join(format!("fraud-scoring-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let csv_path = dir.join("train.csv");

        let mut file = std::fs::File::create(&csv_path).unwrap();
        writeln!(file, "trans_date_trans_time,cc_num,category,amt,is_fraud").unwrap();
        for record in records() {
            writeln!(
                file,
                "{},{},{},{},{}",
                record.timestamp,
                record.account_id,
                record.category.unwrap_or_default(),
                record.amount.unwrap_or_default(),
                record.is_fraud.unwrap_or_default()
            )
            .unwrap();
        }
        drop(file);

        let mut config = AppConfig::default();
        config.data.train_path = csv_path.to_string_lossy().into_owned();
        config.artifacts.dir = dir.join("artifacts").to_string_lossy().into_owned();

        let summary = run_training(&config).unwrap();
        assert_eq!(summary.rows, 20);

        let engine = InferenceEngine::from_store(&ArtifactStore::new(&config.artifacts), &config).unwrap();
        let prediction = engine
            .predict(&[PredictionRequest::new(30.0, 10, 100.0, "food")])
            .unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(prediction.labels.len(), 1);
    }
}
