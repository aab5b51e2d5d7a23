//! Domain module - records, identifiers and crawl state
//!
//! Everything in here is plain data: no I/O, no browser, no filesystem.
//! The infrastructure and application layers build on these types.

pub mod crawl_cursor;
pub mod item_id;
pub mod review;
pub mod seed;

pub use crawl_cursor::{CrawlCursor, CrawlState};
pub use item_id::ItemId;
pub use review::{ItemRecord, NOT_FOUND, OutputRow, ReviewRecord};
pub use seed::{Seed, SeedError, SeedKind, SeedSpec};
