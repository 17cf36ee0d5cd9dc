//! Prediction Request Producer
//!
//! Sends random prediction batches to the scoring service over NATS
//! request/reply and logs the labels that come back.

use fraud_scoring::types::{PredictionRequest, PredictionResponse};
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

const LEGIT_CATEGORIES: &[&str] = &["grocery_pos", "gas_transport", "home", "kids_pets", "food_dining"];
const RISKY_CATEGORIES: &[&str] = &["shopping_net", "misc_net", "grocery_net"];

/// Random request generator
struct RequestGenerator {
    rng: rand::rngs::ThreadRng,
}

impl RequestGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Daytime purchase at a usual merchant, well spaced from the last one
    fn generate_legitimate(&mut self) -> PredictionRequest {
        PredictionRequest {
            amt: self.rng.gen_range(5.0..200.0),
            hour: self.rng.gen_range(7..22),
            time_since_last_minutes: self.rng.gen_range(60.0..4320.0),
            category: self.random_choice(LEGIT_CATEGORIES).to_string(),
        }
    }

    /// Large late-night online purchase shortly after the previous one
    fn generate_suspicious(&mut self) -> PredictionRequest {
        PredictionRequest {
            amt: self.rng.gen_range(700.0..1500.0),
            hour: self.rng.gen_range(0..4),
            time_since_last_minutes: self.rng.gen_range(0.5..30.0),
            category: self.random_choice(RISKY_CATEGORIES).to_string(),
        }
    }

    fn generate_batch(&mut self, size: usize, fraud_rate: f64) -> Vec<PredictionRequest> {
        (0..size)
            .map(|_| {
                if self.rng.gen_bool(fraud_rate) {
                    self.generate_suspicious()
                } else {
                    self.generate_legitimate()
                }
            })
            .collect()
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

/// Share of suspicious requests, a probability in [0, 1] (default 0.1)
fn fraud_rate_arg(arg: Option<&str>) -> anyhow::Result<f64> {
    let fraud_rate = match arg {
        Some(value) => value
            .parse::<f64>()
            .map_err(|e| anyhow::anyhow!("Invalid fraud rate {:?}: {}", value, e))?,
        None => 0.1,
    };
    anyhow::ensure!(
        (0.0..=1.0).contains(&fraud_rate),
        "Fraud rate must be within [0, 1], got {}",
        fraud_rate
    );
    Ok(fraud_rate)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("request_producer=info".parse()?),
        )
        .init();

    info!("Starting Prediction Request Producer");

    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("fraud.predict");
    let batches: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let batch_size: usize = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(8);
    let fraud_rate = fraud_rate_arg(args.get(5).map(|s| s.as_str()))?;
    let delay_ms: u64 = args.get(6).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        batches,
        batch_size,
        fraud_rate,
        delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(batches, batch_size, fraud_rate, delay_ms).await;
        }
    };

    let mut generator = RequestGenerator::new();
    let mut flagged = 0usize;
    let mut rejected = 0u64;

    for i in 0..batches {
        let batch = generator.generate_batch(batch_size, fraud_rate);
        let payload = serde_json::to_vec(&batch)?;

        let reply = client.request(subject.to_string(), payload.into()).await?;
        match serde_json::from_slice::<PredictionResponse>(&reply.payload)? {
            PredictionResponse::Predictions { predictions } => {
                flagged += predictions.iter().filter(|p| **p == 1).count();
            }
            PredictionResponse::Error { error } => {
                rejected += 1;
                warn!(kind = %error.kind, detail = %error.detail, "Batch rejected");
            }
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Sent {}/{} batches ({} rows flagged, {} batches rejected)",
                i + 1,
                batches,
                flagged,
                rejected
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} batches ({} rows flagged, {} batches rejected)",
        batches, flagged, rejected
    );

    Ok(())
}

async fn run_dry_mode(batches: u64, batch_size: usize, fraud_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = RequestGenerator::new();

    for i in 0..batches {
        let batch = generator.generate_batch(batch_size, fraud_rate);
        let json = serde_json::to_string_pretty(&batch)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample batch {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraud_rate_arg() {
        assert_eq!(fraud_rate_arg(None).unwrap(), 0.1);
        assert_eq!(fraud_rate_arg(Some("0.25")).unwrap(), 0.25);
        assert_eq!(fraud_rate_arg(Some("1")).unwrap(), 1.0);

        assert!(fraud_rate_arg(Some("1.5")).is_err());
        assert!(fraud_rate_arg(Some("-0.1")).is_err());
        assert!(fraud_rate_arg(Some("NaN")).is_err());
        assert!(fraud_rate_arg(Some("lots")).is_err());
    }

    #[test]
    fn test_batch_generation_bounds() {
        let mut generator = RequestGenerator::new();

        let batch = generator.generate_batch(50, 1.0);
        assert_eq!(batch.len(), 50);
        assert!(batch.iter().all(|r| r.hour < 4 && r.amt >= 700.0));

        let batch = generator.generate_batch(50, 0.0);
        assert!(batch.iter().all(|r| r.validate(0).is_ok() && r.amt < 200.0));
    }
}
