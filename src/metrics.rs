//! Serving statistics for the scoring service.

use crate::models::inference::BatchPrediction;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

const MAX_LATENCIES: usize = 10_000;

/// Metrics collector for the serving loop
pub struct ServingMetrics {
    /// Batches scored successfully
    pub batches_scored: AtomicU64,
    /// Rows across scored batches
    pub rows_scored: AtomicU64,
    /// Rows labelled fraudulent
    pub rows_flagged: AtomicU64,
    /// Categorical values outside the fitted vocabulary
    pub unknown_categories: AtomicU64,
    /// Rejected batches by error kind
    rejections: RwLock<BTreeMap<&'static str, u64>>,
    /// Batch latencies (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Fraud probability distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl ServingMetrics {
    pub fn new() -> Self {
        Self {
            batches_scored: AtomicU64::new(0),
            rows_scored: AtomicU64::new(0),
            rows_flagged: AtomicU64::new(0),
            unknown_categories: AtomicU64::new(0),
            rejections: RwLock::new(BTreeMap::new()),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a successfully scored batch
    pub fn record_batch(&self, latency: Duration, prediction: &BatchPrediction) {
        self.batches_scored.fetch_add(1, Ordering::Relaxed);
        self.rows_scored
            .fetch_add(prediction.labels.len() as u64, Ordering::Relaxed);
        self.rows_flagged
            .fetch_add(prediction.flagged() as u64, Ordering::Relaxed);
        self.unknown_categories
            .fetch_add(prediction.unknown_categories as u64, Ordering::Relaxed);

        self.record_latency(latency);

        if let Ok(mut buckets) = self.score_buckets.write() {
            for p in &prediction.probabilities {
                let bucket = (p * 10.0).clamp(0.0, 9.0) as usize;
                buckets[bucket] += 1;
            }
        }
    }

    /// Record a batch that was answered with an error
    pub fn record_rejection(&self, latency: Duration, kind: &'static str) {
        self.record_latency(latency);
        if let Ok(mut rejections) = self.rejections.write() {
            *rejections.entry(kind).or_insert(0) += 1;
        }
    }

    fn record_latency(&self, latency: Duration) {
        if let Ok(mut times) = self.latencies.write() {
            times.push(latency.as_micros() as u64);
            // Keep only the most recent half once full
            if times.len() > MAX_LATENCIES {
                times.drain(0..MAX_LATENCIES / 2);
            }
        }
    }

    pub fn get_latency_stats(&self) -> LatencyStats {
        let mut sorted = match self.latencies.read() {
            Ok(times) if !times.is_empty() => times.clone(),
            _ => return LatencyStats::default(),
        };
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[((count as f64 * 0.95) as usize).min(count - 1)],
            p99_us: sorted[((count as f64 * 0.99) as usize).min(count - 1)],
            max_us: sorted[count - 1],
        }
    }

    /// Rows scored per second since startup
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.rows_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or_default()
    }

    pub fn get_rejections(&self) -> BTreeMap<&'static str, u64> {
        self.rejections.read().map(|r| r.clone()).unwrap_or_default()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let batches = self.batches_scored.load(Ordering::Relaxed);
        let rows = self.rows_scored.load(Ordering::Relaxed);
        let flagged = self.rows_flagged.load(Ordering::Relaxed);
        let unknown = self.unknown_categories.load(Ordering::Relaxed);
        let flag_rate = if rows > 0 {
            (flagged as f64 / rows as f64) * 100.0
        } else {
            0.0
        };

        let latency = self.get_latency_stats();
        let throughput = self.get_throughput();
        let rejections = self.get_rejections();
        let score_dist = self.get_score_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║              FRAUD SCORING SERVICE - METRICS SUMMARY         ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Batches Scored: {:>8}  │  Rows Scored: {:>10}           ║",
            batches, rows
        );
        info!(
            "║ Rows Flagged:   {:>8}  │  Flag Rate: {:>6.2}%  {:>6.1} rows/s ║",
            flagged, flag_rate, throughput
        );
        info!("║ Unknown Categories: {:>8}                                 ║", unknown);
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Batch Latency (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            latency.mean_us, latency.p50_us, latency.p95_us, latency.p99_us
        );
        if !rejections.is_empty() {
            info!("╠══════════════════════════════════════════════════════════════╣");
            info!("║ Rejected Batches:                                            ║");
            for (kind, count) in &rejections {
                info!("║   {:22}: {:>8}                          ║", kind, count);
            }
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Fraud Probability Distribution:                              ║");
        let total: u64 = score_dist.iter().sum();
        for (i, &count) in score_dist.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for ServingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Batch latency statistics
#[derive(Debug, Default)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Prints periodic summaries
pub struct MetricsReporter {
    metrics: Arc<ServingMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServingMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
