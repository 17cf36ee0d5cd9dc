//! Fraud Scoring Library
//!
//! Turns time-ordered card transactions into fixed-width feature vectors with
//! a fit-once / transform-many preprocessing pipeline, trains a fraud scorer
//! on them offline, and serves thresholded fraud labels for prediction
//! batches over NATS.

pub mod config;
pub mod consumer;
pub mod dataset;
pub mod error;
pub mod feature_engineering;
pub mod metrics;
pub mod models;
pub mod preprocessing;
pub mod producer;
pub mod training;
pub mod types;

pub use config::AppConfig;
pub use consumer::RequestConsumer;
pub use error::{PipelineError, PipelineResult};
pub use feature_engineering::TimestampFeatures;
pub use models::inference::InferenceEngine;
pub use preprocessing::Preprocessor;
pub use producer::ResponsePublisher;
pub use types::{request::PredictionRequest, transaction::TransactionRecord};
