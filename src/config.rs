//! Configuration management for the fraud scoring pipeline

use crate::models::decision::DEFAULT_THRESHOLD;
use crate::models::scorer::LogisticConfig;
use crate::preprocessing::{FeatureSchema, TransformPolicy};
use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub data: DataConfig,
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub features: FeatureSchema,
    #[serde(default)]
    pub preprocessing: TransformPolicy,
    pub training: TrainingConfig,
    pub detection: DetectionConfig,
    pub nats: NatsConfig,
    pub serving: ServingConfig,
    pub logging: LoggingConfig,
}

/// Training data location
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// CSV of historical labelled transactions
    pub train_path: String,
}

/// Where fitted artifacts are written and read
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    pub dir: String,
    #[serde(default = "default_preprocessor_file")]
    pub preprocessor_file: String,
    #[serde(default = "default_scorer_file")]
    pub scorer_file: String,
}

fn default_preprocessor_file() -> String {
    "preprocessor.json".to_string()
}

fn default_scorer_file() -> String {
    "scorer.json".to_string()
}

/// Offline training settings
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Oversample the minority class before fitting the scorer
    #[serde(default = "default_resample")]
    pub resample: bool,
    /// Neighbours considered when synthesizing minority rows
    #[serde(default = "default_k_neighbors")]
    pub k_neighbors: usize,
    /// Seed for the resampler
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub scorer: LogisticConfig,
}

fn default_resample() -> bool {
    true
}

fn default_k_neighbors() -> usize {
    5
}

fn default_seed() -> u64 {
    42
}

/// Detection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Fraud probability above which a transaction is flagged
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject prediction batches arrive on
    pub request_subject: String,
    /// Queue group shared by serving replicas
    #[serde(default)]
    pub queue_group: Option<String>,
}

/// Serving configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServingConfig {
    /// Maximum batches scored concurrently
    pub workers: usize,
    /// Seconds between metrics summaries
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the default file
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path, with `FRAUD_SCORING__*`
    /// environment variables taking precedence
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("FRAUD_SCORING")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.detection.threshold),
            "detection.threshold must be within [0, 1], got {}",
            self.detection.threshold
        );
        ensure!(
            !self.features.numeric.is_empty() || !self.features.categorical.is_empty(),
            "features must name at least one numeric or categorical column"
        );
        ensure!(self.serving.workers > 0, "serving.workers must be positive");
        ensure!(self.training.k_neighbors > 0, "training.k_neighbors must be positive");
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig {
                train_path: "data/fraudTrain.csv".to_string(),
            },
            artifacts: ArtifactsConfig {
                dir: "models".to_string(),
                preprocessor_file: default_preprocessor_file(),
                scorer_file: default_scorer_file(),
            },
            features: FeatureSchema::default(),
            preprocessing: TransformPolicy::default(),
            training: TrainingConfig {
                resample: true,
                k_neighbors: 5,
                seed: 42,
                scorer: LogisticConfig::default(),
            },
            detection: DetectionConfig {
                threshold: DEFAULT_THRESHOLD,
            },
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                request_subject: "fraud.predict".to_string(),
                queue_group: None,
            },
            serving: ServingConfig {
                workers: 4,
                metrics_interval_secs: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::UnknownCategoryPolicy;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.detection.threshold, 0.875);
        assert_eq!(config.features.target, "is_fraud");
        assert_eq!(config.preprocessing.unknown_category, UnknownCategoryPolicy::Ignore);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_out_of_range() {
        let mut config = AppConfig::default();
        config.detection.threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("fraud-scoring-{}.toml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"
[data]
train_path = "data/train.csv"

[artifacts]
dir = "/tmp/artifacts"

[preprocessing]
degenerate_scale = "center"

[training]
resample = false

[detection]
threshold = 0.9

[nats]
url = "nats://nats:4222"
request_subject = "fraud.predict"

[serving]
workers = 2

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.detection.threshold, 0.9);
        assert_eq!(config.artifacts.preprocessor_file, "preprocessor.json");
        assert_eq!(config.features, FeatureSchema::default());
        assert_eq!(
            config.preprocessing.degenerate_scale,
            crate::preprocessing::DegenerateScalePolicy::Center
        );
        assert!(!config.training.resample);
        assert_eq!(config.training.k_neighbors, 5);
        assert_eq!(config.serving.metrics_interval_secs, 30);
    }
}
