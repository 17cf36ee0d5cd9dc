//! Fraud Scoring Service - Main Entry Point
//!
//! Answers prediction batches received over NATS request/reply with 0/1 fraud
//! labels, scoring batches concurrently against one fitted pipeline.

use anyhow::{Context, Result};
use fraud_scoring::{
    config::{AppConfig, LoggingConfig},
    consumer::RequestConsumer,
    metrics::{MetricsReporter, ServingMetrics},
    models::{inference::InferenceEngine, loader::ArtifactStore},
    producer::ResponsePublisher,
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("fraud_scoring={}", logging.level).parse()?);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format.as_str() {
        "json" => builder.json().init(),
        _ => builder.init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Fraud Scoring Service");
    info!(
        threshold = config.detection.threshold,
        artifacts = %config.artifacts.dir,
        "Configuration loaded"
    );

    let store = ArtifactStore::new(&config.artifacts);
    let engine = Arc::new(
        InferenceEngine::from_store(&store, &config).context("Failed to load fitted artifacts")?,
    );

    let metrics = Arc::new(ServingMetrics::new());

    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = RequestConsumer::new(
        client.clone(),
        &config.nats.request_subject,
        config.nats.queue_group.as_deref(),
    );
    let publisher = ResponsePublisher::new(client.clone());

    let num_workers = config.serving.workers;
    info!(workers = num_workers, "Starting request loop");

    // Bounds the number of batches scored at once
    let semaphore = Arc::new(Semaphore::new(num_workers));

    let reporter = MetricsReporter::new(metrics.clone(), config.serving.metrics_interval_secs);
    tokio::spawn(reporter.start());

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(error = %e, "Worker pool closed");
                break;
            }
        };

        let engine = engine.clone();
        let publisher = publisher.clone();
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let request_id = Uuid::new_v4();
            let start_time = Instant::now();

            let result = engine.predict_payload(&message.payload);
            let latency = start_time.elapsed();

            match &result {
                Ok(prediction) => {
                    metrics.record_batch(latency, prediction);
                    debug!(
                        request_id = %request_id,
                        rows = prediction.labels.len(),
                        flagged = prediction.flagged(),
                        unknown_categories = prediction.unknown_categories,
                        latency_us = latency.as_micros(),
                        "Batch scored"
                    );
                }
                Err(e) => {
                    metrics.record_rejection(latency, e.kind());
                    if e.is_client_error() {
                        warn!(request_id = %request_id, kind = e.kind(), error = %e, "Batch rejected");
                    } else {
                        error!(request_id = %request_id, kind = e.kind(), error = %e, "Batch failed");
                    }
                }
            }

            match message.reply {
                Some(reply_to) => {
                    let response = InferenceEngine::to_response(&result);
                    if let Err(e) = publisher.reply(reply_to, &response).await {
                        error!(request_id = %request_id, error = %e, "Failed to publish response");
                    }
                }
                None => {
                    warn!(request_id = %request_id, "Request has no reply subject, response dropped");
                }
            }

            drop(permit);
        });
    }

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}
