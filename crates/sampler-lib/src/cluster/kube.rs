//! kube-backed cluster client
//!
//! `metrics.k8s.io` ships no types in k8s-openapi, so `PodMetrics` is
//! declared here as a custom resource. Every call gets a bounded timeout:
//! an API server that hangs past the sampling interval reads as
//! unavailable instead of stalling the run.

use super::{ClusterClient, ContainerUsage, PodUsage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, ListParams};
use kube::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Pod metrics as served by metrics.k8s.io/v1beta1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodMetrics {
    pub metadata: ObjectMeta,
    pub containers: Vec<PodMetricsContainer>,
    pub timestamp: String,
    pub window: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodMetricsContainer {
    pub name: String,
    pub usage: PodMetricsUsage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodMetricsUsage {
    pub cpu: String,
    pub memory: String,
}

impl k8s_openapi::Resource for PodMetrics {
    const GROUP: &'static str = "metrics.k8s.io";
    const KIND: &'static str = "PodMetrics";
    const VERSION: &'static str = "v1beta1";
    const API_VERSION: &'static str = "metrics.k8s.io/v1beta1";
    const URL_PATH_SEGMENT: &'static str = "pods";
    type Scope = k8s_openapi::NamespaceResourceScope;
}

impl k8s_openapi::Metadata for PodMetrics {
    type Ty = ObjectMeta;

    fn metadata(&self) -> &Self::Ty {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Self::Ty {
        &mut self.metadata
    }
}

/// Default bound on a single cluster API call
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Cluster client backed by the kube API
pub struct KubeCluster {
    client: Client,
    call_timeout: Duration,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(client: Client, call_timeout: Duration) -> Self {
        Self {
            client,
            call_timeout,
        }
    }

    async fn bounded<T>(
        &self,
        what: &str,
        fut: impl Future<Output = kube::Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.call_timeout, fut)
            .await
            .map_err(|_| anyhow::anyhow!("{what} timed out after {:?}", self.call_timeout))?
            .with_context(|| format!("{what} failed"))
    }
}

#[async_trait]
impl ClusterClient for KubeCluster {
    async fn list_pod_metrics(&self, namespace: &str) -> Result<Vec<PodUsage>> {
        let api: Api<PodMetrics> = Api::namespaced(self.client.clone(), namespace);
        let listing = self
            .bounded("pod metrics listing", api.list(&ListParams::default()))
            .await?;

        let pods = listing
            .items
            .into_iter()
            .filter_map(|pod| {
                let name = pod.metadata.name?;
                let containers = pod
                    .containers
                    .into_iter()
                    .map(|c| ContainerUsage {
                        name: c.name,
                        cpu: c.usage.cpu,
                        memory: c.usage.memory,
                    })
                    .collect();
                Some(PodUsage { name, containers })
            })
            .collect();

        Ok(pods)
    }

    async fn hpa_cpu_target(&self, namespace: &str, deployment: &str) -> Result<Option<i32>> {
        let api: Api<HorizontalPodAutoscaler> = Api::namespaced(self.client.clone(), namespace);
        let hpa = self.bounded("autoscaler read", api.get(deployment)).await?;

        // Only the first configured metric is inspected
        let target = hpa
            .spec
            .and_then(|spec| spec.metrics)
            .and_then(|metrics| metrics.into_iter().next())
            .and_then(|metric| metric.resource)
            .and_then(|resource| resource.target.average_utilization);

        Ok(target)
    }

    async fn deployment_replicas(
        &self,
        namespace: &str,
        deployment: &str,
    ) -> Result<Option<i32>> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let deploy = self.bounded("deployment read", api.get(deployment)).await?;
        Ok(deploy.spec.and_then(|spec| spec.replicas))
    }
}
