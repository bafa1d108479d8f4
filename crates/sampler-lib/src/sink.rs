//! CSV sink for metric records
//!
//! The sink is opened once per run and held for the whole lifetime of the
//! run, so the header is written at most once and rows never interleave
//! with a reopened handle's output.

use crate::error::SampleError;
use crate::models::{MetricRecord, WriteMode};
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Column order of the persisted schema
pub const CSV_HEADER: [&str; 5] = [
    "timestamp",
    "cpu_usage_avg",
    "memory_usage_avg",
    "hpa_cpu_threshold",
    "replicas",
];

/// Append-only writer for the run's CSV sink
#[derive(Debug)]
pub struct RecordWriter {
    writer: csv::Writer<File>,
}

impl RecordWriter {
    /// Open the sink. Overwrite mode truncates and writes the header row;
    /// append mode starts at end-of-file and writes none.
    pub fn open(path: &Path, mode: WriteMode) -> Result<Self, SampleError> {
        let mut writer = open_csv(path, mode)?;
        if mode == WriteMode::Overwrite {
            writer.write_record(CSV_HEADER)?;
            writer.flush()?;
        }
        Ok(Self { writer })
    }

    /// Append one row and flush it, so a crash loses at most the row
    /// currently in flight
    pub fn append(&mut self, record: &MetricRecord) -> Result<(), SampleError> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Open a CSV writer under the given mode. Header handling is the
/// caller's responsibility.
pub(crate) fn open_csv(path: &Path, mode: WriteMode) -> Result<csv::Writer<File>, SampleError> {
    let file = match mode {
        WriteMode::Overwrite => File::create(path)?,
        WriteMode::Append => OpenOptions::new().create(true).append(true).open(path)?,
    };
    Ok(csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file))
}
