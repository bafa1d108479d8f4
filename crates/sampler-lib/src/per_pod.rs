//! Per-pod sampling mode
//!
//! Samples each selected pod individually instead of aggregating, writing
//! one CSV per pod under an output directory. Iteration, sleep, and
//! termination rules match the aggregate scheduler.

use crate::aggregate::pod_sample;
use crate::cluster::ClusterClient;
use crate::error::SampleError;
use crate::models::{PodSelector, WriteMode};
use crate::sampler::{epoch_seconds, iteration_count, sleep_or_shutdown, RunSummary};
use crate::sink::open_csv;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Column order of the per-pod schema
pub const POD_CSV_HEADER: [&str; 3] = ["timestamp", "cpu_usage", "memory_usage"];

/// One persisted per-pod row
#[derive(Debug, Clone, Serialize)]
pub struct PodRecord {
    pub timestamp: f64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
}

/// Immutable configuration for one per-pod run
#[derive(Debug, Clone)]
pub struct PodSamplingConfig {
    pub namespace: String,
    pub selector: PodSelector,
    /// Directory receiving one `<pod>_metrics.csv` per selected pod
    pub output_dir: PathBuf,
    pub interval: Duration,
    pub observation: Duration,
    pub mode: WriteMode,
}

/// Drives the per-pod sampling loop
pub struct PodSampler<'a> {
    client: &'a dyn ClusterClient,
    config: PodSamplingConfig,
    /// One writer per pod, opened on first sight and held for the run
    writers: HashMap<String, csv::Writer<File>>,
}

impl<'a> PodSampler<'a> {
    pub fn new(client: &'a dyn ClusterClient, config: PodSamplingConfig) -> Self {
        Self {
            client,
            config,
            writers: HashMap::new(),
        }
    }

    pub async fn run(
        mut self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<RunSummary, SampleError> {
        let iterations = iteration_count(self.config.observation, self.config.interval);
        let mut summary = RunSummary::default();

        info!(
            namespace = %self.config.namespace,
            iterations,
            interval_secs = self.config.interval.as_secs_f64(),
            output_dir = %self.config.output_dir.display(),
            "starting per-pod sampling run"
        );

        for iteration in 0..iterations {
            summary.iterations += 1;

            match self.client.list_pod_metrics(&self.config.namespace).await {
                Ok(listing) => {
                    let mut matched = 0usize;
                    let selector = self.config.selector.clone();
                    for pod in listing
                        .iter()
                        .filter(|pod| selector.matches(&pod.name))
                    {
                        let sample = pod_sample(pod);
                        let record = PodRecord {
                            timestamp: epoch_seconds(),
                            cpu_usage: sample.cpu_millicores,
                            memory_usage: sample.memory_megabytes,
                        };
                        self.write_row(&sample.pod, &record)?;
                        summary.rows_written += 1;
                        matched += 1;
                    }
                    if matched == 0 {
                        summary.skipped += 1;
                        warn!(iteration, "no pods matched the selection");
                    }
                }
                Err(e) => {
                    summary.skipped += 1;
                    warn!(iteration, error = %e, "pod metrics unavailable");
                }
            }

            if sleep_or_shutdown(self.config.interval, &mut shutdown).await {
                info!(iteration, "shutdown requested, ending run early");
                break;
            }
        }

        Ok(summary)
    }

    fn write_row(&mut self, pod: &str, record: &PodRecord) -> Result<(), SampleError> {
        let mode = self.config.mode;
        let writer = match self.writers.entry(pod.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let path = self.config.output_dir.join(format!("{pod}_metrics.csv"));
                let mut writer = open_csv(&path, mode)?;
                if mode == WriteMode::Overwrite {
                    writer.write_record(POD_CSV_HEADER)?;
                }
                entry.insert(writer)
            }
        };

        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockCluster;
    use std::fs;
    use std::path::Path;

    fn config(output_dir: &Path, selector: PodSelector, mode: WriteMode) -> PodSamplingConfig {
        PodSamplingConfig {
            namespace: "default".to_string(),
            selector,
            output_dir: output_dir.to_path_buf(),
            interval: Duration::from_millis(10),
            observation: Duration::from_millis(20),
            mode,
        }
    }

    #[tokio::test]
    async fn writes_one_file_per_selected_pod() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = MockCluster {
            pods: vec![
                MockCluster::pod("api-1", "100000000n", "32Mi"),
                MockCluster::pod("api-2", "200000000n", "64Mi"),
                MockCluster::pod("db-1", "900000000n", "512Mi"),
            ],
            ..Default::default()
        };

        let (_tx, rx) = broadcast::channel(1);
        let summary = PodSampler::new(
            &cluster,
            config(
                dir.path(),
                PodSelector::Deployment("api".to_string()),
                WriteMode::Overwrite,
            ),
        )
        .run(rx)
        .await
        .unwrap();

        assert_eq!(summary.iterations, 2);
        assert_eq!(summary.rows_written, 4);

        let api1 = fs::read_to_string(dir.path().join("api-1_metrics.csv")).unwrap();
        let lines: Vec<&str> = api1.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "timestamp,cpu_usage,memory_usage");
        assert!(lines[1].ends_with(",100.0,32.0"));

        let api2 = fs::read_to_string(dir.path().join("api-2_metrics.csv")).unwrap();
        assert_eq!(api2.lines().count(), 3);

        assert!(!dir.path().join("db-1_metrics.csv").exists());
    }

    #[tokio::test]
    async fn append_preserves_prior_per_pod_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api-1_metrics.csv");
        fs::write(&path, "prior row\n").unwrap();

        let cluster = MockCluster {
            pods: vec![MockCluster::pod("api-1", "100000000n", "32Mi")],
            ..Default::default()
        };

        let (_tx, rx) = broadcast::channel(1);
        PodSampler::new(
            &cluster,
            config(
                dir.path(),
                PodSelector::AllPods,
                WriteMode::Append,
            ),
        )
        .run(rx)
        .await
        .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "prior row");
        assert_eq!(lines.len(), 3);
        assert!(!content.contains("timestamp"));
    }

    #[tokio::test]
    async fn empty_selection_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = MockCluster {
            pods: vec![MockCluster::pod("db-1", "100000000n", "32Mi")],
            ..Default::default()
        };

        let (_tx, rx) = broadcast::channel(1);
        let summary = PodSampler::new(
            &cluster,
            config(
                dir.path(),
                PodSelector::Deployment("api".to_string()),
                WriteMode::Overwrite,
            ),
        )
        .run(rx)
        .await
        .unwrap();

        assert_eq!(summary.rows_written, 0);
        assert_eq!(summary.skipped, 2);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn listing_failure_skips_the_iteration() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = MockCluster {
            fail_metrics: true,
            ..Default::default()
        };

        let (_tx, rx) = broadcast::channel(1);
        let summary = PodSampler::new(
            &cluster,
            config(dir.path(), PodSelector::AllPods, WriteMode::Overwrite),
        )
        .run(rx)
        .await
        .unwrap();

        assert_eq!(summary.iterations, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.rows_written, 0);
    }

    #[tokio::test]
    async fn dropped_shutdown_sender_does_not_end_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = MockCluster {
            pods: vec![MockCluster::pod("api-1", "100000000n", "32Mi")],
            ..Default::default()
        };

        let (tx, rx) = broadcast::channel(1);
        drop(tx);

        let summary = PodSampler::new(
            &cluster,
            config(dir.path(), PodSelector::AllPods, WriteMode::Overwrite),
        )
        .run(rx)
        .await
        .unwrap();

        assert_eq!(summary.iterations, 2);
        assert_eq!(summary.rows_written, 2);
    }

    #[tokio::test]
    async fn unparsable_pod_still_yields_a_zero_row() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = MockCluster {
            pods: vec![MockCluster::pod("api-1", "garbage", "alsogarbage")],
            ..Default::default()
        };

        let (_tx, rx) = broadcast::channel(1);
        let summary = PodSampler::new(
            &cluster,
            config(
                dir.path(),
                PodSelector::AllPods,
                WriteMode::Overwrite,
            ),
        )
        .run(rx)
        .await
        .unwrap();

        assert_eq!(summary.rows_written, 2);

        let content = fs::read_to_string(dir.path().join("api-1_metrics.csv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines[1].ends_with(",0.0,0.0"));
    }
}
