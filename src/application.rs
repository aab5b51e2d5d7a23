//! Application layer
//!
//! The crawl core: text cleanup, page walking and the orchestrator state
//! machine. Everything here talks to the outside world only through the
//! traits defined in the infrastructure layer.

pub mod crawl_orchestrator;
pub mod pagination_walker;
pub mod text_normalizer;

pub use crawl_orchestrator::{CrawlError, CrawlOrchestrator, CrawlReport};
pub use pagination_walker::{PageAdvance, PageReady, PaginationWalker};
pub use text_normalizer::TextNormalizer;
