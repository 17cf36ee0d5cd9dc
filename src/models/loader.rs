//! Persistence of fitted artifacts

use crate::config::ArtifactsConfig;
use crate::models::scorer::LogisticScorer;
use crate::preprocessing::{FittedState, Preprocessor};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// A persisted artifact with its creation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact<T> {
    pub created_at: DateTime<Utc>,
    pub payload: T,
}

/// Reads and writes the fitted preprocessor state and the scorer as JSON
pub struct ArtifactStore {
    dir: PathBuf,
    preprocessor_file: String,
    scorer_file: String,
}

impl ArtifactStore {
    pub fn new(config: &ArtifactsConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.dir),
            preprocessor_file: config.preprocessor_file.clone(),
            scorer_file: config.scorer_file.clone(),
        }
    }

    pub fn preprocessor_path(&self) -> PathBuf {
        self.dir.join(&self.preprocessor_file)
    }

    pub fn scorer_path(&self) -> PathBuf {
        self.dir.join(&self.scorer_file)
    }

    /// Persist the fitted state of a preprocessor
    pub fn save_preprocessor(&self, preprocessor: &Preprocessor) -> Result<PathBuf> {
        let state = preprocessor
            .state()
            .context("Cannot persist an unfitted preprocessor")?;
        let path = self.preprocessor_path();
        self.write(&path, state)?;
        Ok(path)
    }

    /// Load a fitted preprocessor
    pub fn load_preprocessor(&self) -> Result<Preprocessor> {
        let artifact: Artifact<FittedState> = self.read(&self.preprocessor_path())?;
        info!(
            created_at = %artifact.created_at,
            width = artifact.payload.width(),
            "Preprocessor state loaded"
        );
        Ok(Preprocessor::from_state(artifact.payload))
    }

    pub fn save_scorer(&self, scorer: &LogisticScorer) -> Result<PathBuf> {
        let path = self.scorer_path();
        self.write(&path, scorer.clone())?;
        Ok(path)
    }

    pub fn load_scorer(&self) -> Result<LogisticScorer> {
        let artifact: Artifact<LogisticScorer> = self.read(&self.scorer_path())?;
        info!(created_at = %artifact.created_at, "Scorer loaded");
        Ok(artifact.payload)
    }

    fn write<T: Serialize>(&self, path: &Path, payload: T) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let artifact = Artifact {
            created_at: Utc::now(),
            payload,
        };
        let bytes = serde_json::to_vec_pretty(&artifact)?;
        fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;

        info!(path = %path.display(), "Artifact saved");
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, path: &Path) -> Result<Artifact<T>> {
        let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse {}", path.display()))
    }
}
