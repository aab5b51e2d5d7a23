//! Batch sink for output rows
//!
//! Rows are buffered in memory and appended to the CSV file once the buffer
//! reaches `batch_size` rows or `flush_interval` has passed since the last
//! flush. The header is written only when the file is absent or empty at
//! flush time, so repeated runs append to one file with a single header.

use crate::domain::OutputRow;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Output I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV write error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub type SinkResult<T> = Result<T, SinkError>;

/// Destination for output rows.
pub trait RowSink {
    /// Buffer rows, flushing if a threshold is crossed.
    fn add(&mut self, rows: Vec<OutputRow>) -> SinkResult<()>;

    /// Persist everything buffered so far.
    fn flush(&mut self) -> SinkResult<()>;

    fn stats(&self) -> SinkStats;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub rows_added: u64,
    pub rows_written: u64,
    pub flushes: u64,
}

pub struct CsvBatchSink {
    path: PathBuf,
    batch_size: usize,
    flush_interval: Duration,
    buffer: Vec<OutputRow>,
    last_flush: Instant,
    stats: SinkStats,
}

impl CsvBatchSink {
    pub fn new(path: impl AsRef<Path>, batch_size: usize, flush_interval: Duration) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            batch_size: batch_size.max(1),
            flush_interval,
            buffer: Vec::new(),
            last_flush: Instant::now(),
            stats: SinkStats::default(),
        }
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn threshold_reached(&self) -> bool {
        self.buffer.len() >= self.batch_size || self.last_flush.elapsed() >= self.flush_interval
    }

    fn io_error(&self, source: io::Error) -> SinkError {
        SinkError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_error(&self, source: csv::Error) -> SinkError {
        SinkError::Csv {
            path: self.path.clone(),
            source,
        }
    }

    /// Append the whole buffer as one write. A failed write is truncated
    /// back to the previous end of file, so a retry never duplicates rows.
    fn write_buffer(&self) -> SinkResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        let start = file.metadata().map_err(|e| self.io_error(e))?.len();

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        if start == 0 {
            writer
                .write_record(OutputRow::HEADER)
                .map_err(|e| self.csv_error(e))?;
        }
        for row in &self.buffer {
            writer.serialize(row).map_err(|e| self.csv_error(e))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| self.io_error(e.into_error()))?;

        if let Err(e) = file.write_all(&bytes).and_then(|()| file.sync_data()) {
            if let Err(rollback) = file.set_len(start) {
                warn!(
                    "Could not roll {} back to {} bytes: {}",
                    self.path.display(),
                    start,
                    rollback
                );
            }
            return Err(self.io_error(e));
        }
        Ok(())
    }
}

impl RowSink for CsvBatchSink {
    fn add(&mut self, rows: Vec<OutputRow>) -> SinkResult<()> {
        self.stats.rows_added += rows.len() as u64;
        self.buffer.extend(rows);
        if self.threshold_reached() {
            self.flush()?;
        }
        Ok(())
    }

    /// On error the buffer is kept, so nothing collected is lost.
    fn flush(&mut self) -> SinkResult<()> {
        if self.buffer.is_empty() {
            self.last_flush = Instant::now();
            return Ok(());
        }

        self.write_buffer()?;

        let written = self.buffer.len() as u64;
        self.buffer.clear();
        self.last_flush = Instant::now();
        self.stats.rows_written += written;
        self.stats.flushes += 1;
        debug!(
            "Flushed {} rows to {} ({} total)",
            written,
            self.path.display(),
            self.stats.rows_written
        );
        Ok(())
    }

    fn stats(&self) -> SinkStats {
        self.stats
    }
}

impl Drop for CsvBatchSink {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        info!("Flushing {} buffered rows on shutdown", self.buffer.len());
        if let Err(e) = self.flush() {
            error!("Final flush failed, {} rows lost: {}", self.buffer.len(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemRecord, ReviewRecord};
    use tempfile::TempDir;

    const HOUR: Duration = Duration::from_secs(3600);

    fn rows(n: usize) -> Vec<OutputRow> {
        let item = ItemRecord::new("Boots", "Leather, waterproof");
        (0..n)
            .map(|i| OutputRow::new(&item, &ReviewRecord::new(format!("review {i}"), 5)))
            .collect()
    }

    #[test]
    fn test_count_threshold_triggers_flush() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reviews.csv");
        let mut sink = CsvBatchSink::new(&path, 3, HOUR);

        sink.add(rows(2)).unwrap();
        assert!(!path.exists());

        sink.add(rows(1)).unwrap();
        assert_eq!(sink.buffered(), 0);
        assert_eq!(sink.stats().rows_written, 3);
        assert!(path.exists());
    }

    #[test]
    fn test_time_threshold_triggers_flush() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reviews.csv");
        let mut sink = CsvBatchSink::new(&path, 1000, Duration::ZERO);

        sink.add(rows(1)).unwrap();

        assert_eq!(sink.stats().flushes, 1);
        assert_eq!(sink.buffered(), 0);
    }

    #[test]
    fn test_fields_with_commas_are_quoted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reviews.csv");
        let mut sink = CsvBatchSink::new(&path, 10, HOUR);

        sink.add(rows(1)).unwrap();
        sink.flush().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "ItemName,Description,ReviewText,Rating\nBoots,\"Leather, waterproof\",review 0,5\n"
        );
    }

    #[test]
    fn test_drop_flushes_remaining_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reviews.csv");
        {
            let mut sink = CsvBatchSink::new(&path, 100, HOUR);
            sink.add(rows(2)).unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn test_failed_flush_keeps_rows_and_retry_writes_them_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reviews.csv");
        std::fs::create_dir(&path).unwrap();
        let mut sink = CsvBatchSink::new(&path, 100, HOUR);
        sink.add(rows(2)).unwrap();

        assert!(sink.flush().is_err());
        assert_eq!(sink.buffered(), 2);
        assert_eq!(sink.stats().rows_written, 0);

        std::fs::remove_dir(&path).unwrap();
        sink.flush().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert_eq!(contents.matches("review 0").count(), 1);
        assert_eq!(sink.stats().rows_written, 2);
    }

    #[test]
    fn test_empty_existing_file_gets_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reviews.csv");
        std::fs::write(&path, "").unwrap();

        let mut sink = CsvBatchSink::new(&path, 100, HOUR);
        sink.add(rows(1)).unwrap();
        sink.flush().unwrap();

        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .starts_with("ItemName,"));
    }
}
