//! Review Harvester - incremental review crawler
//!
//! Walks catalog and review pages of e-commerce and media sites in a real
//! browser, extracts (item, review, rating) records, and appends them to a
//! CSV file in batches. A ledger of processed items makes every run resume
//! where the last one stopped.

pub mod application;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
pub(crate) mod test_utils;

pub use application::{CrawlOrchestrator, CrawlReport, TextNormalizer};
pub use domain::{ItemRecord, OutputRow, ReviewRecord, Seed, SeedKind};
pub use infrastructure::{AppConfig, CsvBatchSink, FileLedger, RecordExtractor, SiteProfile};
