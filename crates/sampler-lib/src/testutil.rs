//! Shared test doubles

use crate::cluster::{ClusterClient, ContainerUsage, PodUsage};
use anyhow::{bail, Result};
use async_trait::async_trait;

/// In-memory cluster returning canned responses, with per-field
/// failure switches
#[derive(Debug, Default)]
pub struct MockCluster {
    pub pods: Vec<PodUsage>,
    pub hpa_target: Option<i32>,
    pub replicas: Option<i32>,
    pub fail_metrics: bool,
    pub fail_hpa: bool,
    pub fail_replicas: bool,
}

impl MockCluster {
    /// A single-container pod with the given usage strings
    pub fn pod(name: &str, cpu: &str, memory: &str) -> PodUsage {
        PodUsage {
            name: name.to_string(),
            containers: vec![ContainerUsage {
                name: "main".to_string(),
                cpu: cpu.to_string(),
                memory: memory.to_string(),
            }],
        }
    }
}

#[async_trait]
impl ClusterClient for MockCluster {
    async fn list_pod_metrics(&self, _namespace: &str) -> Result<Vec<PodUsage>> {
        if self.fail_metrics {
            bail!("metrics api unreachable");
        }
        Ok(self.pods.clone())
    }

    async fn hpa_cpu_target(&self, _namespace: &str, _deployment: &str) -> Result<Option<i32>> {
        if self.fail_hpa {
            bail!("autoscaler lookup failed");
        }
        Ok(self.hpa_target)
    }

    async fn deployment_replicas(
        &self,
        _namespace: &str,
        _deployment: &str,
    ) -> Result<Option<i32>> {
        if self.fail_replicas {
            bail!("deployment lookup failed");
        }
        Ok(self.replicas)
    }
}
