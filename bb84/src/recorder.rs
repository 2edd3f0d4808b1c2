//! Sinks for [`ExperimentRecord`]s.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;

use crate::error::Result;
use crate::experiment::ExperimentRecord;

/// Column header of the delimited dataset format.
pub const CSV_HEADER: &str = "QBER_Value,Attack_Detected";

/// Receives one record per completed run, in run order.
pub trait Recorder {
    fn record(&mut self, record: &ExperimentRecord) -> Result<()>;
}

/// Keeps records in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecorder {
    records: Vec<ExperimentRecord>,
}

impl MemoryRecorder {
    pub fn records(&self) -> &[ExperimentRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ExperimentRecord> {
        self.records
    }
}

impl Recorder for MemoryRecorder {
    fn record(&mut self, record: &ExperimentRecord) -> Result<()> {
        self.records.push(*record);
        Ok(())
    }
}

/// Writes `QBER_Value,Attack_Detected` rows, the flag as `1`/`0`.
#[derive(Debug)]
pub struct CsvRecorder<W: Write> {
    writer: W,
}

impl<W: Write> CsvRecorder<W> {
    /// Starts a new dataset on an empty sink, writing the header.
    pub fn new(mut writer: W) -> Result<Self> {
        writeln!(writer, "{}", CSV_HEADER)?;
        Ok(Self { writer })
    }

    /// Continues a dataset whose header is already present.
    pub fn continuing(writer: W) -> Self {
        Self { writer }
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl CsvRecorder<BufWriter<File>> {
    /// Opens `path` for appending, creating it if needed. The header is only
    /// written when the file is empty.
    pub fn append_to<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let empty = file.metadata()?.len() == 0;
        debug!("appending dataset to {} (new file: {})", path.display(), empty);
        let writer = BufWriter::new(file);
        if empty {
            Self::new(writer)
        } else {
            Ok(Self::continuing(writer))
        }
    }
}

impl<W: Write> Recorder for CsvRecorder<W> {
    fn record(&mut self, record: &ExperimentRecord) -> Result<()> {
        writeln!(
            self.writer,
            "{},{}",
            record.qber,
            if record.attack_present { 1 } else { 0 }
        )?;
        Ok(())
    }
}
