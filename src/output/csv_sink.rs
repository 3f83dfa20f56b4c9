//! CSV file sink
//!
//! Rows are appended to one UTF-8 file. The header is written whenever the
//! file is missing or empty at the time of the write, so consecutive runs
//! keep appending to the same table.

use crate::output::traits::{Sink, SinkResult};
use crate::record::{Field, ValidatedAgentRecord};
use async_trait::async_trait;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// Appends records to a CSV file
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn needs_header(&self) -> bool {
        fs::metadata(&self.path).map_or(true, |meta| meta.len() == 0)
    }

    fn append(&self, record: &ValidatedAgentRecord) -> SinkResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let write_header = self.needs_header();
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if write_header {
            writer.write_record(Field::ALL.iter().map(|f| f.column_name()))?;
        }
        writer.write_record(
            record
                .cells()
                .map(|(_, cell)| cell.to_text().unwrap_or_default()),
        )?;
        writer.flush()?;

        Ok(())
    }
}

#[async_trait]
impl Sink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn persist(&mut self, record: &ValidatedAgentRecord) -> SinkResult<()> {
        self.append(record)?;
        tracing::info!("Appended record to {}", self.path.display());
        Ok(())
    }
}
