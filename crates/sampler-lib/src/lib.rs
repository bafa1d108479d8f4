//! Sampling library for Kubernetes deployment metrics
//!
//! This crate provides the core functionality for:
//! - Listing and aggregating pod metrics from the cluster API
//! - Normalizing resource-quantity strings into millicores and megabytes
//! - Reading the autoscaler target and desired replica count
//! - Appending normalized records to a CSV sink

pub mod aggregate;
pub mod cluster;
pub mod error;
pub mod inspect;
pub mod models;
pub mod per_pod;
pub mod quantity;
pub mod sampler;
pub mod sink;

#[cfg(test)]
pub(crate) mod testutil;

pub use cluster::{ClusterClient, KubeCluster};
pub use error::{Field, SampleError};
pub use models::*;
pub use per_pod::{PodSampler, PodSamplingConfig};
pub use sampler::{iteration_count, RunSummary, Sampler};
pub use sink::RecordWriter;
