//! Crawl entry point: credential check, then the pagination loop.

use std::sync::Arc;

use tracing::{error, info};

use starscan_core::config::{Config, CrawlConfig};
use starscan_github::{HttpTransport, PageFetcher, QueryExecutor};
use starscan_store::{PersistenceSink, RepositoryStore};

use crate::driver::{CrawlDriver, CrawlReport, StopHandle};
use crate::error::CrawlError;

/// Wires the query executor, page fetcher and persistence sink for one
/// crawl stream.
pub struct Crawler {
    executor: QueryExecutor,
    store: Arc<dyn RepositoryStore>,
    settings: CrawlConfig,
    stop: StopHandle,
}

impl Crawler {
    pub fn new(executor: QueryExecutor, store: Arc<dyn RepositoryStore>, settings: CrawlConfig) -> Self {
        Self {
            executor,
            store,
            settings,
            stop: StopHandle::new(),
        }
    }

    /// Build against the real GitHub endpoint. Fails without a token.
    pub fn from_config(config: &Config, store: Arc<dyn RepositoryStore>) -> Result<Self, CrawlError> {
        let transport = HttpTransport::from_config(&config.github)?;
        let executor = QueryExecutor::new(Arc::new(transport), config.retry.clone());
        Ok(Self::new(executor, store, config.crawl.clone()))
    }

    /// Flag that interrupts the crawl at the next page boundary.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn store(&self) -> &Arc<dyn RepositoryStore> {
        &self.store
    }

    /// Verify the credential, then crawl up to `max_items` repositories in
    /// pages of `page_size`. Blocks until the crawl reaches a terminal state.
    pub async fn crawl(&self, max_items: u64, page_size: u32) -> Result<CrawlReport, CrawlError> {
        let settings = CrawlConfig {
            max_items,
            page_size,
            ..self.settings.clone()
        };
        settings.validate()?;

        let viewer = self.executor.verify_credentials().await.map_err(|e| {
            error!(error = %e, "GitHub authentication failed; not crawling");
            CrawlError::Credentials(e)
        })?;
        info!(
            login = %viewer.login,
            remaining = viewer.rate_limit.remaining,
            query = %self.settings.search_query,
            "Starting repository crawl"
        );

        let fetcher = PageFetcher::new(self.executor.clone(), &settings.search_query);
        let sink = PersistenceSink::new(Arc::clone(&self.store), settings.persist_concurrency);
        let mut driver = CrawlDriver::new(Arc::new(fetcher), sink, settings.page_delay())
            .with_stop_handle(self.stop.clone());

        Ok(driver.run(settings.max_items, settings.page_size).await)
    }
}
