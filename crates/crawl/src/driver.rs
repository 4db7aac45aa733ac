//! The pagination loop.
//!
//! Pages are fetched strictly in cursor order: each cursor comes from the
//! page before it and is never invented. A stop request is honoured only at
//! the top of the loop, so a page is always persisted in full before the
//! driver yields.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use starscan_core::Cursor;
use starscan_github::QueryFailure;
use starscan_store::PersistenceSink;

use crate::source::PageSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Idle,
    Running,
    /// Stream exhausted, budget spent, or no further progress possible.
    Completed,
    /// Interrupted from outside.
    Stopped,
    /// A page could not be fetched.
    Failed,
}

impl CrawlState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Failed)
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Cloneable flag used to interrupt a running crawl between pages.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        info!("Crawl stop requested");
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Outcome of one crawl run.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub state: CrawlState,
    /// Records fetched and decoded, whether or not they were persisted.
    pub processed_count: u64,
    /// Records the store accepted.
    pub saved_count: u64,
    pub pages: u64,
    /// Items dropped while decoding.
    pub skipped: u64,
    pub last_cursor: Option<Cursor>,
    /// The fetch failure that ended the run, if any.
    pub failure: Option<QueryFailure>,
}

impl CrawlReport {
    fn new() -> Self {
        Self {
            state: CrawlState::Running,
            processed_count: 0,
            saved_count: 0,
            pages: 0,
            skipped: 0,
            last_cursor: None,
            failure: None,
        }
    }
}

pub struct CrawlDriver {
    source: Arc<dyn PageSource>,
    sink: PersistenceSink,
    page_delay: Duration,
    stop: StopHandle,
    state: CrawlState,
}

impl CrawlDriver {
    pub fn new(source: Arc<dyn PageSource>, sink: PersistenceSink, page_delay: Duration) -> Self {
        Self {
            source,
            sink,
            page_delay,
            stop: StopHandle::new(),
            state: CrawlState::Idle,
        }
    }

    /// Share an existing stop flag instead of the driver's own.
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    /// Crawl until the stream ends, `max_items` records have been
    /// processed, a page stalls or fails, or a stop is requested.
    pub async fn run(&mut self, max_items: u64, page_size: u32) -> CrawlReport {
        let mut report = CrawlReport::new();
        self.state = CrawlState::Running;
        info!(max_items, page_size, "Crawl started");

        let state = loop {
            if self.stop.is_stopped() {
                break CrawlState::Stopped;
            }
            if report.processed_count >= max_items {
                break CrawlState::Completed;
            }

            let remaining = max_items - report.processed_count;
            let request = u64::from(page_size).min(remaining) as u32;
            let page = self
                .source
                .fetch_page(report.last_cursor.as_ref(), request)
                .await;
            report.pages += 1;

            if let Some(failure) = page.failure {
                warn!(
                    page = report.pages,
                    cursor = ?report.last_cursor.as_ref().map(Cursor::as_str),
                    error = %failure,
                    "Page fetch failed; ending crawl"
                );
                report.failure = Some(failure);
                break CrawlState::Failed;
            }

            let decoded = page.records.len();
            report.processed_count += decoded as u64;
            report.skipped += page.skipped as u64;
            let saved = self.sink.upsert_page(page.records).await;
            report.saved_count += saved as u64;
            if page.next_cursor.is_some() {
                report.last_cursor = page.next_cursor;
            }

            info!(
                page = report.pages,
                decoded,
                saved,
                processed = report.processed_count,
                "Page processed"
            );

            if !page.has_more {
                break CrawlState::Completed;
            }
            if decoded == 0 {
                warn!(page = report.pages, "Page yielded no records; stopping");
                break CrawlState::Completed;
            }
            if report.processed_count >= max_items {
                break CrawlState::Completed;
            }

            tokio::time::sleep(self.page_delay).await;
        };

        self.state = state;
        report.state = state;
        info!(
            state = %state,
            processed = report.processed_count,
            saved = report.saved_count,
            pages = report.pages,
            "Crawl finished"
        );
        report
    }
}
