//! Error taxonomy for the sampler
//!
//! `Unavailable` is the recoverable case: the scheduler skips the row for
//! that iteration and keeps going. Sink variants are fatal for the run.

use std::fmt;
use thiserror::Error;

/// Sampled field that failed to resolve for an iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Metrics,
    HpaThreshold,
    Replicas,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Metrics => "pod_metrics",
            Field::HpaThreshold => "hpa_cpu_threshold",
            Field::Replicas => "replicas",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by sampling components
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("{field} unavailable: {reason}")]
    Unavailable { field: Field, reason: String },

    #[error("csv sink error: {0}")]
    Sink(#[from] csv::Error),

    #[error("sink i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl SampleError {
    pub fn unavailable(field: Field, reason: impl Into<String>) -> Self {
        SampleError::Unavailable {
            field,
            reason: reason.into(),
        }
    }

    /// Whether the scheduler may continue with the next iteration
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SampleError::Unavailable { .. })
    }
}
