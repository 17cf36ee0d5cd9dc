//! Transaction data structures for card fraud scoring

use crate::error::{PipelineError, PipelineResult};
use crate::preprocessing::frame::FeatureSource;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One raw historical card transaction, as read from the training CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Card number; transactions are grouped by it
    #[serde(rename = "cc_num")]
    pub account_id: String,

    /// Transaction date-time, parsed during feature engineering
    #[serde(rename = "trans_date_trans_time")]
    pub timestamp: String,

    /// Transaction amount
    #[serde(rename = "amt", default)]
    pub amount: Option<f64>,

    /// Merchant category (e.g. "shopping_net")
    #[serde(default)]
    pub category: Option<String>,

    /// Fraud label (training data only)
    #[serde(default)]
    pub is_fraud: Option<u8>,
}

impl TransactionRecord {
    /// Create a new record with required fields
    pub fn new(account_id: &str, timestamp: &str, amount: Option<f64>, category: Option<&str>) -> Self {
        Self {
            account_id: account_id.to_string(),
            timestamp: timestamp.to_string(),
            amount,
            category: category.map(str::to_string),
            is_fraud: None,
        }
    }

    /// Attach a fraud label
    pub fn with_label(mut self, is_fraud: u8) -> Self {
        self.is_fraud = Some(is_fraud);
        self
    }
}

/// A transaction record augmented with the derived timestamp features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineeredRecord {
    pub record: TransactionRecord,

    /// Parsed timestamp
    pub datetime: NaiveDateTime,

    /// Hour of day, 0-23
    pub hour: u32,

    /// Weekday name ("Monday", ...); informational only
    pub day_name: String,

    /// Minutes since the previous transaction on the same account;
    /// `None` for the first transaction of each account in the batch
    pub time_since_last_minutes: Option<f64>,
}

impl FeatureSource for EngineeredRecord {
    fn numeric(&self, column: &str) -> PipelineResult<Option<f64>> {
        match column {
            "amt" => Ok(self.record.amount),
            "hour" => Ok(Some(self.hour as f64)),
            "time_since_last_minutes" => Ok(self.time_since_last_minutes),
            other => Err(PipelineError::MissingColumn(other.to_string())),
        }
    }

    fn categorical(&self, column: &str) -> PipelineResult<Option<&str>> {
        match column {
            "category" => Ok(self.record.category.as_deref()),
            "day_name" => Ok(Some(self.day_name.as_str())),
            other => Err(PipelineError::MissingColumn(other.to_string())),
        }
    }

    fn label(&self, column: &str) -> PipelineResult<Option<usize>> {
        match column {
            "is_fraud" => Ok(self.record.is_fraud.map(usize::from)),
            other => Err(PipelineError::MissingColumn(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_serialization() {
        let tx = TransactionRecord::new("1234", "2019-01-01 00:00:18", Some(4.97), Some("misc_net"))
            .with_label(0);

        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.contains("\"cc_num\":\"1234\""));
        assert!(json.contains("\"trans_date_trans_time\""));

        let deserialized: TransactionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, deserialized);
    }

    #[test]
    fn test_engineered_record_feature_source() {
        let record = EngineeredRecord {
            record: TransactionRecord::new("1234", "2019-01-01 10:00:00", None, Some("food"))
                .with_label(1),
            datetime: NaiveDateTime::parse_from_str("2019-01-01 10:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
            hour: 10,
            day_name: "Tuesday".to_string(),
            time_since_last_minutes: Some(5.0),
        };

        assert_eq!(record.numeric("amt").unwrap(), None);
        assert_eq!(record.numeric("hour").unwrap(), Some(10.0));
        assert_eq!(record.numeric("time_since_last_minutes").unwrap(), Some(5.0));
        assert_eq!(record.categorical("category").unwrap(), Some("food"));
        assert_eq!(record.label("is_fraud").unwrap(), Some(1));
        assert!(matches!(
            record.numeric("merchant"),
            Err(PipelineError::MissingColumn(_))
        ));
    }
}
