//! Normalization of Kubernetes resource-quantity strings
//!
//! The metrics API reports CPU in nanocores (`"250000000n"`) and memory in
//! kibibytes (`"65536Ki"`) or mebibytes (`"64Mi"`). Persisted units are
//! millicores and megabytes.

use thiserror::Error;

/// Unit suffix of a quantity string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Nanocores,
    Kibibytes,
    Mebibytes,
}

/// A quantity string split into magnitude and unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuantityError {
    #[error("unrecognized unit suffix in quantity {0:?}")]
    UnknownSuffix(String),

    #[error("invalid magnitude in quantity {0:?}")]
    InvalidMagnitude(String),

    #[error("quantity {0:?} is not a {1} unit")]
    UnexpectedUnit(String, &'static str),
}

/// Split a quantity string into magnitude and unit. Magnitudes are
/// non-negative; anything else is a parse failure, never a panic.
pub fn parse(raw: &str) -> Result<Quantity, QuantityError> {
    let (digits, unit) = if let Some(v) = raw.strip_suffix("Ki") {
        (v, Unit::Kibibytes)
    } else if let Some(v) = raw.strip_suffix("Mi") {
        (v, Unit::Mebibytes)
    } else if let Some(v) = raw.strip_suffix('n') {
        (v, Unit::Nanocores)
    } else {
        return Err(QuantityError::UnknownSuffix(raw.to_string()));
    };

    let value: f64 = digits
        .parse()
        .map_err(|_| QuantityError::InvalidMagnitude(raw.to_string()))?;
    if !value.is_finite() || value < 0.0 {
        return Err(QuantityError::InvalidMagnitude(raw.to_string()));
    }

    Ok(Quantity { value, unit })
}

/// Parse a CPU usage quantity into millicores
pub fn cpu_millicores(raw: &str) -> Result<f64, QuantityError> {
    match parse(raw)? {
        Quantity {
            value,
            unit: Unit::Nanocores,
        } => Ok(value / 1_000_000.0),
        _ => Err(QuantityError::UnexpectedUnit(raw.to_string(), "cpu")),
    }
}

/// Parse a memory usage quantity into megabytes
///
/// `Ki` divides by 1000 rather than 1024; the downstream analysis has
/// always treated the column as decimal megabytes.
pub fn memory_megabytes(raw: &str) -> Result<f64, QuantityError> {
    match parse(raw)? {
        Quantity {
            value,
            unit: Unit::Kibibytes,
        } => Ok(value / 1000.0),
        Quantity {
            value,
            unit: Unit::Mebibytes,
        } => Ok(value),
        _ => Err(QuantityError::UnexpectedUnit(raw.to_string(), "memory")),
    }
}
