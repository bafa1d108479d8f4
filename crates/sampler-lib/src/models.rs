//! Core data models for the metrics sampler

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Usage for one pod, summed across its containers. Lives for one
/// sampling iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct PodSample {
    pub pod: String,
    pub cpu_millicores: f64,
    pub memory_megabytes: f64,
}

/// Namespace-wide averages across the selected pods for one iteration
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSample {
    pub cpu_millicores_avg: f64,
    pub memory_megabytes_avg: f64,
    pub pods_selected: usize,
}

/// One persisted CSV row. Assembled only when every lookup succeeded,
/// and never mutated once written.
#[derive(Debug, Clone, Serialize)]
pub struct MetricRecord {
    /// Seconds since epoch, captured immediately before the write
    pub timestamp: f64,
    /// Millicores, averaged across the selected pods
    pub cpu_usage_avg: f64,
    /// Megabytes, averaged across the selected pods
    pub memory_usage_avg: f64,
    /// Configured HPA CPU average-utilization target, percent
    pub hpa_cpu_threshold: i32,
    /// Desired replica count from the deployment spec
    pub replicas: i32,
}

/// Which pods in the namespace count toward a sample
#[derive(Debug, Clone)]
pub enum PodSelector {
    /// Pods whose name starts with the deployment name
    Deployment(String),
    /// Every pod the metrics API reports in the namespace
    AllPods,
}

impl PodSelector {
    pub fn matches(&self, pod_name: &str) -> bool {
        match self {
            PodSelector::Deployment(name) => pod_name.starts_with(name.as_str()),
            PodSelector::AllPods => true,
        }
    }
}

/// How the CSV sink is opened at the start of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Truncate and write the header row
    Overwrite,
    /// Open at end-of-file, no header
    Append,
}

/// Immutable configuration for one sampling run, owned by the scheduler
#[derive(Debug, Clone)]
pub struct SamplingConfig {
    pub namespace: String,
    /// Deployment whose autoscaler and replica count are inspected
    pub deployment: String,
    /// Pod selection for the usage average; independent of `deployment`
    /// so an all-pods average can still carry the deployment's HPA state
    pub selector: PodSelector,
    pub sink_path: PathBuf,
    /// Sleep between iterations
    pub interval: Duration,
    /// Total observation time; remainder past the last whole interval
    /// is dropped
    pub observation: Duration,
    pub mode: WriteMode,
}
