//! Fixed-interval sampling scheduler
//!
//! One iteration: collect the three fields, assemble a record on full
//! success, write it, sleep. Lookup failures skip the row for that
//! iteration only; sink failures abort the run.

use crate::aggregate::PodAggregator;
use crate::cluster::ClusterClient;
use crate::error::SampleError;
use crate::inspect::{AutoscalerInspector, ReplicaInspector};
use crate::models::{MetricRecord, SamplingConfig};
use crate::sink::RecordWriter;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Outcome of a completed run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: u64,
    pub rows_written: u64,
    pub skipped: u64,
}

/// Number of loop iterations for a run; remainder time past the last
/// whole interval is dropped
pub fn iteration_count(observation: Duration, interval: Duration) -> u64 {
    if interval.is_zero() {
        return 0;
    }
    (observation.as_millis() / interval.as_millis()) as u64
}

/// Current wall clock as fractional seconds since epoch
pub(crate) fn epoch_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1e6
}

/// Wait out one interval, returning `true` if shutdown was requested.
///
/// Only a delivered signal counts as a shutdown. A closed channel means no
/// signal can ever arrive, so the run keeps its configured duration rather
/// than ending early.
pub(crate) async fn sleep_or_shutdown(
    interval: Duration,
    shutdown: &mut broadcast::Receiver<()>,
) -> bool {
    use tokio::sync::broadcast::error::RecvError;

    let sleep = tokio::time::sleep(interval);
    tokio::pin!(sleep);
    let mut channel_open = true;

    loop {
        tokio::select! {
            _ = &mut sleep => return false,
            result = shutdown.recv(), if channel_open => match result {
                Ok(()) | Err(RecvError::Lagged(_)) => return true,
                Err(RecvError::Closed) => {
                    warn!("shutdown channel closed without a signal, continuing the run");
                    channel_open = false;
                }
            }
        }
    }
}

/// Drives the sampling loop for one deployment
pub struct Sampler<'a> {
    client: &'a dyn ClusterClient,
    config: SamplingConfig,
}

impl<'a> Sampler<'a> {
    pub fn new(client: &'a dyn ClusterClient, config: SamplingConfig) -> Self {
        Self { client, config }
    }

    /// Run to completion. The run always reaches its configured iteration
    /// count regardless of per-iteration failures, unless the shutdown
    /// signal is raised: then the in-flight iteration finishes and the
    /// sink is flushed before returning.
    pub async fn run(
        &self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<RunSummary, SampleError> {
        let iterations = iteration_count(self.config.observation, self.config.interval);
        let mut writer = RecordWriter::open(&self.config.sink_path, self.config.mode)?;
        let mut summary = RunSummary::default();

        info!(
            namespace = %self.config.namespace,
            deployment = %self.config.deployment,
            iterations,
            interval_secs = self.config.interval.as_secs_f64(),
            "starting sampling run"
        );

        for iteration in 0..iterations {
            summary.iterations += 1;

            match self.collect().await {
                Some(record) => {
                    writer.append(&record)?;
                    summary.rows_written += 1;
                    info!(
                        iteration,
                        cpu_usage_avg = record.cpu_usage_avg,
                        memory_usage_avg = record.memory_usage_avg,
                        hpa_cpu_threshold = record.hpa_cpu_threshold,
                        replicas = record.replicas,
                        "wrote metrics row"
                    );
                }
                None => {
                    summary.skipped += 1;
                    warn!(iteration, "no row for this iteration");
                }
            }

            if sleep_or_shutdown(self.config.interval, &mut shutdown).await {
                info!(iteration, "shutdown requested, ending run early");
                break;
            }
        }

        Ok(summary)
    }

    /// Gather all three fields for one iteration. Every failed field gets
    /// its own diagnostic; any failure means no record.
    async fn collect(&self) -> Option<MetricRecord> {
        let usage = PodAggregator::new(self.client)
            .sample(&self.config.namespace, &self.config.selector)
            .await;
        let threshold = AutoscalerInspector::new(self.client)
            .cpu_threshold(&self.config.namespace, &self.config.deployment)
            .await;
        let replicas = ReplicaInspector::new(self.client)
            .count(&self.config.namespace, &self.config.deployment)
            .await;

        let failures: Vec<&SampleError> = [
            usage.as_ref().err(),
            threshold.as_ref().err(),
            replicas.as_ref().err(),
        ]
        .into_iter()
        .flatten()
        .collect();

        for err in &failures {
            warn!(error = %err, "field unavailable");
        }
        if !failures.is_empty() {
            return None;
        }

        let usage = usage.ok()?;
        Some(MetricRecord {
            // Captured last so rows stay monotonic in write order
            timestamp: epoch_seconds(),
            cpu_usage_avg: usage.cpu_millicores_avg,
            memory_usage_avg: usage.memory_megabytes_avg,
            hpa_cpu_threshold: threshold.ok()?,
            replicas: replicas.ok()?,
        })
    }
}
