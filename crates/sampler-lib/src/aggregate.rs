//! Namespace-wide usage aggregation

use crate::cluster::{ClusterClient, PodUsage};
use crate::error::{Field, SampleError};
use crate::models::{AggregateSample, PodSample, PodSelector};
use crate::quantity;
use tracing::warn;

/// Sums container usage per pod and averages across the selected set
pub struct PodAggregator<'a> {
    client: &'a dyn ClusterClient,
}

impl<'a> PodAggregator<'a> {
    pub fn new(client: &'a dyn ClusterClient) -> Self {
        Self { client }
    }

    /// One aggregate sample for the namespace.
    ///
    /// The average divides by the number of selected pods, not the size of
    /// the full listing, so unrelated pods sharing the namespace cannot
    /// dilute the result. An empty selection is a defined failure, never a
    /// division by zero.
    pub async fn sample(
        &self,
        namespace: &str,
        selector: &PodSelector,
    ) -> Result<AggregateSample, SampleError> {
        let listing = self
            .client
            .list_pod_metrics(namespace)
            .await
            .map_err(|e| SampleError::unavailable(Field::Metrics, e.to_string()))?;

        let samples: Vec<PodSample> = listing
            .iter()
            .filter(|pod| selector.matches(&pod.name))
            .map(pod_sample)
            .collect();

        if samples.is_empty() {
            return Err(SampleError::unavailable(
                Field::Metrics,
                format!("no pods matched in namespace {namespace:?}"),
            ));
        }

        let count = samples.len() as f64;
        let cpu_sum: f64 = samples.iter().map(|s| s.cpu_millicores).sum();
        let memory_sum: f64 = samples.iter().map(|s| s.memory_megabytes).sum();

        Ok(AggregateSample {
            cpu_millicores_avg: cpu_sum / count,
            memory_megabytes_avg: memory_sum / count,
            pods_selected: samples.len(),
        })
    }
}

/// Sum one pod's container contributions. A malformed quantity contributes
/// zero rather than failing the pod; the offending string is logged.
pub(crate) fn pod_sample(pod: &PodUsage) -> PodSample {
    let mut cpu_millicores = 0.0;
    let mut memory_megabytes = 0.0;

    for container in &pod.containers {
        match quantity::cpu_millicores(&container.cpu) {
            Ok(millicores) => cpu_millicores += millicores,
            Err(e) => warn!(
                pod = %pod.name,
                container = %container.name,
                error = %e,
                "could not parse cpu usage"
            ),
        }
        match quantity::memory_megabytes(&container.memory) {
            Ok(megabytes) => memory_megabytes += megabytes,
            Err(e) => warn!(
                pod = %pod.name,
                container = %container.name,
                error = %e,
                "could not parse memory usage"
            ),
        }
    }

    PodSample {
        pod: pod.name.clone(),
        cpu_millicores,
        memory_megabytes,
    }
}
