//! Offline training
//!
//! Fits the preprocessor and scorer on the configured transaction history and
//! writes both artifacts for the scoring service.
//!
//! Usage: `train [config-path]`

use fraud_scoring::config::{AppConfig, DEFAULT_CONFIG_PATH};
use fraud_scoring::training::run_training;
use tracing::info;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fraud_scoring=info".parse()?)
                .add_directive("train=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = args.get(1).map(|s| s.as_str()).unwrap_or(DEFAULT_CONFIG_PATH);

    let config = AppConfig::load_from_path(config_path)?;
    info!(
        config = %config_path,
        train_path = %config.data.train_path,
        resample = config.training.resample,
        "Starting training run"
    );

    let summary = run_training(&config)?;

    info!(
        "Trained on {} rows ({} fraud), feature width {}",
        summary.rows, summary.fraud_rows, summary.feature_width
    );

    Ok(())
}
