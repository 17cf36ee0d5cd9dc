//! Type definitions for the fraud scoring pipeline

pub mod request;
pub mod transaction;

pub use request::{PredictionRequest, PredictionResponse};
pub use transaction::{EngineeredRecord, TransactionRecord};
