//! Scoring, resampling and artifact persistence

pub mod decision;
pub mod inference;
pub mod loader;
pub mod resampler;
pub mod scorer;

pub use decision::ScoringDecision;
pub use inference::{BatchPrediction, InferenceEngine};
pub use loader::ArtifactStore;
pub use resampler::{Resampler, Smote};
pub use scorer::{LogisticScorer, Scorer};
