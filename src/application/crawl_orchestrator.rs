//! Crawl orchestrator
//!
//! The state machine that ties the browser, extractor, normalizer, sink and
//! ledger together:
//!
//! ```text
//! Catalog(p) -> Item(id) -> ReviewPage(id, n) ... -> Item(next) -> Catalog(p + 1) -> Done
//! ```
//!
//! An item is marked in the ledger only after its rows are flushed, so the
//! ledger never lists an item whose rows could still be lost. Browser and
//! extraction failures inside an item end that item early; sink and ledger
//! failures end the seed.

use super::pagination_walker::PaginationWalker;
use super::text_normalizer::TextNormalizer;
use crate::domain::{CrawlCursor, CrawlState, ItemId, ItemRecord, OutputRow, Seed, SeedKind};
use crate::infrastructure::batch_sink::{RowSink, SinkError};
use crate::infrastructure::browser::{Browser, BrowserError, BrowserLauncher};
use crate::infrastructure::config::CrawlSettings;
use crate::infrastructure::ledger::{FileLedger, LedgerError};
use crate::infrastructure::parsing::{PageContext, ParsingError, ParsingResult, RecordExtractor};
use crate::infrastructure::site_profiles::SiteProfile;
use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Extraction error: {0}")]
    Parsing(#[from] ParsingError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl CrawlError {
    /// Fatal errors abort the current seed; the rest only end the current item.
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Browser(e) => !e.is_recoverable(),
            Self::Parsing(e) => !e.is_recoverable(),
            Self::Sink(_) | Self::Ledger(_) => true,
        }
    }
}

pub type CrawlResult<T> = Result<T, CrawlError>;

/// Per-run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub seeds_attempted: u32,
    pub seeds_failed: u32,
    pub items_processed: u32,
    /// Already in the ledger
    pub items_skipped: u32,
    /// Ended early by an error, still marked
    pub items_degraded: u32,
    /// Could not be opened at all, not marked
    pub items_failed: u32,
    pub rows_added: u64,
    pub rows_written: u64,
    pub duration: Duration,
}

impl CrawlReport {
    /// Nothing at all succeeded.
    pub const fn all_seeds_failed(&self) -> bool {
        self.seeds_attempted > 0 && self.seeds_failed == self.seeds_attempted
    }
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "seeds {}/{} ok, items processed {}, skipped {}, degraded {}, failed {}, rows {}/{} written in {:.1?}",
            self.seeds_attempted - self.seeds_failed,
            self.seeds_attempted,
            self.items_processed,
            self.items_skipped,
            self.items_degraded,
            self.items_failed,
            self.rows_written,
            self.rows_added,
            self.duration
        )
    }
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() >= deadline)
}

fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

pub struct CrawlOrchestrator<L: BrowserLauncher, S: RowSink> {
    launcher: L,
    sink: S,
    ledger: FileLedger,
    extractor: RecordExtractor,
    normalizer: TextNormalizer,
    profile: SiteProfile,
    settings: CrawlSettings,
    state: CrawlState,
    cursor: CrawlCursor,
    report: CrawlReport,
    /// Items that failed to open during this run
    failed: HashSet<ItemId>,
}

impl<L: BrowserLauncher, S: RowSink> CrawlOrchestrator<L, S> {
    /// Fails if the profile's selectors do not compile.
    pub fn new(
        launcher: L,
        sink: S,
        ledger: FileLedger,
        profile: SiteProfile,
        settings: CrawlSettings,
    ) -> ParsingResult<Self> {
        profile.validate()?;
        let extractor = RecordExtractor::from_profile(&profile)?;
        let normalizer = TextNormalizer::new(&profile.normalizer);
        Ok(Self {
            launcher,
            sink,
            ledger,
            extractor,
            normalizer,
            profile,
            settings,
            state: CrawlState::Done,
            cursor: CrawlCursor::default(),
            report: CrawlReport::default(),
            failed: HashSet::new(),
        })
    }

    pub const fn state(&self) -> &CrawlState {
        &self.state
    }

    pub const fn sink(&self) -> &S {
        &self.sink
    }

    pub const fn ledger(&self) -> &FileLedger {
        &self.ledger
    }

    /// Crawl every seed in order and return the run summary.
    ///
    /// A failing seed is logged and counted; the run moves on to the next
    /// one. The sink is flushed on every exit path.
    pub fn run(&mut self, seeds: &[Seed]) -> CrawlReport {
        let started = Instant::now();
        let deadline = self.settings.max_run_duration().map(|budget| started + budget);
        self.report = CrawlReport::default();
        self.failed.clear();
        info!("🚀 Crawling {} seeds with profile '{}'", seeds.len(), self.profile.name);

        for (index, seed) in seeds.iter().enumerate() {
            if expired(deadline) {
                warn!("⏱️ Run budget spent, {} seeds not started", seeds.len() - index);
                break;
            }
            self.report.seeds_attempted += 1;
            info!("🔄 Seed {}/{}: {} ({})", index + 1, seeds.len(), seed.url(), seed.kind());

            match self.run_seed(seed, deadline) {
                Ok(()) => info!("✅ Seed {} finished", seed.url()),
                Err(e) => {
                    error!("❌ Seed {} aborted: {}", seed.url(), e);
                    self.report.seeds_failed += 1;
                }
            }
        }

        if let Err(e) = self.sink.flush() {
            error!("Final flush failed: {}", e);
        }
        self.transition(CrawlState::Done);

        let stats = self.sink.stats();
        self.report.rows_written = stats.rows_written;
        self.report.duration = started.elapsed();
        info!("🏁 Crawl finished: {}", self.report);
        self.report
    }

    fn transition(&mut self, next: CrawlState) {
        debug!("State {} -> {}", self.state, next);
        self.state = next;
    }

    fn run_seed(&mut self, seed: &Seed, deadline: Option<Instant>) -> CrawlResult<()> {
        let item_id = match seed.kind() {
            SeedKind::Catalog => None,
            SeedKind::Item => {
                let id = ItemId::parse(seed.url()).map_err(|e| ParsingError::UrlResolutionFailed {
                    url: seed.url().to_string(),
                    reason: e.to_string(),
                    base_url: None,
                })?;
                if self.ledger.contains(&id) {
                    info!("Item {} already processed, skipping", id);
                    self.report.items_skipped += 1;
                    return Ok(());
                }
                Some(id)
            }
        };

        let mut browser = self.launcher.launch()?;
        browser.navigate(seed.url())?;
        self.cursor = CrawlCursor::default();

        match item_id {
            None => self.crawl_catalog(&mut browser, deadline),
            Some(id) => {
                self.cursor.enter_item();
                let outcome = self.process_item(&mut browser, &id, deadline);
                self.finish_item(&id, outcome)
            }
        }
    }

    fn crawl_catalog<B: Browser>(&mut self, browser: &mut B, deadline: Option<Instant>) -> CrawlResult<()> {
        let mut walker =
            PaginationWalker::for_catalog(&self.profile.catalog, &self.settings).with_deadline(deadline);

        while let Some(page) = walker.next_page(browser)? {
            self.cursor.enter_catalog_page(page.number);
            self.transition(CrawlState::Catalog(page.number));

            let context = PageContext::new(browser.current_url()?).with_page_number(page.number);
            let links = self
                .extractor
                .extract_item_links(&browser.current_markup()?, &context)?;
            info!("📄 Catalog page {}: {} item links", page.number, links.len());

            for id in links {
                if expired(deadline) {
                    break;
                }
                if self.ledger.contains(&id) {
                    debug!("Skipping processed item {}", id);
                    self.report.items_skipped += 1;
                    continue;
                }
                if self.failed.contains(&id) {
                    debug!("Item {} already failed this run", id);
                    continue;
                }
                self.cursor.enter_item();

                if let Err(e) = browser.open_in_background_tab(id.as_str()) {
                    if !e.is_recoverable() {
                        return Err(e.into());
                    }
                    warn!("Could not open {}: {}", id, e);
                    self.report.items_failed += 1;
                    self.failed.insert(id);
                    continue;
                }
                let outcome = self.process_item(browser, &id, deadline);
                let closed = browser.close_tab();
                self.finish_item(&id, outcome)?;
                closed?;
            }
        }
        Ok(())
    }

    /// Flush the item's rows, then mark it. Recoverable errors degrade the
    /// item; anything fatal propagates before the mark.
    fn finish_item(&mut self, id: &ItemId, outcome: CrawlResult<()>) -> CrawlResult<()> {
        match outcome {
            Ok(()) => self.report.items_processed += 1,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("⚠️ Item {} ended early: {}", id, e);
                self.report.items_degraded += 1;
            }
        }
        self.sink.flush()?;
        self.ledger.mark(id)?;
        info!("Item {} done ({})", id, self.cursor);
        Ok(())
    }

    fn process_item<B: Browser>(
        &mut self,
        browser: &mut B,
        id: &ItemId,
        run_deadline: Option<Instant>,
    ) -> CrawlResult<()> {
        self.transition(CrawlState::Item(id.clone()));
        let item_deadline = self
            .settings
            .max_item_duration()
            .map(|budget| Instant::now() + budget);
        let deadline = earliest(run_deadline, item_deadline);

        if let Some(landmark) = &self.profile.item.landmark {
            if !browser.wait_for(landmark, self.settings.landmark_timeout())? {
                warn!("Item landmark '{}' not found on {}", landmark, id);
            }
        }
        if let Some(reveal) = &self.profile.item.description_reveal {
            if browser.click(reveal, self.settings.reveal_timeout())? {
                browser.settle(self.settings.settle());
            } else {
                debug!("Description reveal '{}' not clickable", reveal);
            }
        }

        let markup = browser.current_markup()?;
        let item = self.extractor.extract_item(&markup);
        if !self.open_reviews(browser, id, &markup)? {
            return Ok(());
        }
        self.collect_reviews(browser, id, &item, deadline)
    }

    /// Evaluate the reviews gate, leaving the browser on the first review
    /// page when it is open.
    fn open_reviews<B: Browser>(&self, browser: &mut B, id: &ItemId, markup: &str) -> CrawlResult<bool> {
        if self.extractor.extract_review_count(markup) == Some(0) {
            info!("Item {} has no reviews", id);
            return Ok(false);
        }

        if let Some(reveal) = &self.profile.gate.reveal {
            if !browser.click(reveal, self.settings.reveal_timeout())? {
                info!("No reviews control on {}", id);
                return Ok(false);
            }
            browser.settle(self.settings.settle());
        }

        if self.extractor.uses_reviews_page() {
            let context = PageContext::new(browser.current_url()?);
            let markup = browser.current_markup()?;
            let Some(link) = self.extractor.extract_reviews_link(&markup, &context) else {
                info!("No reviews link on {}", id);
                return Ok(false);
            };
            browser.navigate(&link)?;
        }
        Ok(true)
    }

    fn collect_reviews<B: Browser>(
        &mut self,
        browser: &mut B,
        id: &ItemId,
        item: &ItemRecord,
        deadline: Option<Instant>,
    ) -> CrawlResult<()> {
        let mut walker =
            PaginationWalker::for_reviews(&self.profile, &self.settings).with_deadline(deadline);

        while let Some(page) = walker.next_page(browser)? {
            let number = self.cursor.enter_review_page();
            self.transition(CrawlState::ReviewPage(id.clone(), number));

            let reviews = self
                .normalizer
                .normalize_reviews(self.extractor.extract_reviews(&browser.current_markup()?));
            debug!(
                "Review page {} of {}: {} reviews ({} scrolls)",
                number,
                id,
                reviews.len(),
                page.scrolls
            );

            let rows = OutputRow::join(item, &reviews);
            self.report.rows_added += rows.len() as u64;
            self.sink.add(rows)?;
        }

        if walker.pages() == 0 {
            info!("Reviews section absent on {}", id);
        }
        Ok(())
    }
}
