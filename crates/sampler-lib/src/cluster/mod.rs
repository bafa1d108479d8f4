//! Cluster API surface consumed by the sampler
//!
//! The trait keeps the inspectors testable against a double instead of a
//! process-global client; the kube-backed implementation lives in
//! [`self::kube`].

mod kube;

pub use self::kube::{KubeCluster, PodMetrics, PodMetricsContainer, PodMetricsUsage};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Container usage as reported by the metrics API, quantity strings
/// still unparsed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerUsage {
    pub name: String,
    pub cpu: String,
    pub memory: String,
}

/// One pod's entry in the metrics listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodUsage {
    pub name: String,
    pub containers: Vec<ContainerUsage>,
}

/// Read-only view of the cluster needed by one sampling iteration
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// List all pods reporting metrics in the namespace
    async fn list_pod_metrics(&self, namespace: &str) -> Result<Vec<PodUsage>>;

    /// CPU average-utilization target from the deployment's autoscaler.
    /// `None` when the first configured metric carries no such target.
    async fn hpa_cpu_target(&self, namespace: &str, deployment: &str) -> Result<Option<i32>>;

    /// Desired replica count from the deployment spec
    async fn deployment_replicas(&self, namespace: &str, deployment: &str)
        -> Result<Option<i32>>;
}
