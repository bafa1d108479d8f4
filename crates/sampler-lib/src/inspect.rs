//! Autoscaler and replica lookups
//!
//! Both inspectors are stateless views over the cluster client: any lookup
//! failure becomes a tagged `Unavailable` so the scheduler can skip one
//! iteration's row without aborting the run.

use crate::cluster::ClusterClient;
use crate::error::{Field, SampleError};

/// Reads the autoscaler's configured CPU average-utilization target
pub struct AutoscalerInspector<'a> {
    client: &'a dyn ClusterClient,
}

impl<'a> AutoscalerInspector<'a> {
    pub fn new(client: &'a dyn ClusterClient) -> Self {
        Self { client }
    }

    pub async fn cpu_threshold(
        &self,
        namespace: &str,
        deployment: &str,
    ) -> Result<i32, SampleError> {
        match self.client.hpa_cpu_target(namespace, deployment).await {
            Ok(Some(target)) => Ok(target),
            Ok(None) => Err(SampleError::unavailable(
                Field::HpaThreshold,
                "autoscaler's first metric carries no cpu utilization target",
            )),
            Err(e) => Err(SampleError::unavailable(Field::HpaThreshold, e.to_string())),
        }
    }
}

/// Reads the deployment's desired replica count
pub struct ReplicaInspector<'a> {
    client: &'a dyn ClusterClient,
}

impl<'a> ReplicaInspector<'a> {
    pub fn new(client: &'a dyn ClusterClient) -> Self {
        Self { client }
    }

    pub async fn count(&self, namespace: &str, deployment: &str) -> Result<i32, SampleError> {
        match self.client.deployment_replicas(namespace, deployment).await {
            Ok(Some(replicas)) => Ok(replicas),
            Ok(None) => Err(SampleError::unavailable(
                Field::Replicas,
                "deployment spec carries no replica count",
            )),
            Err(e) => Err(SampleError::unavailable(Field::Replicas, e.to_string())),
        }
    }
}
