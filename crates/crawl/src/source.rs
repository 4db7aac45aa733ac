//! The page-producing seam the driver pulls from.

use async_trait::async_trait;

use starscan_core::Cursor;
use starscan_github::{Page, PageFetcher};

/// Anything that can turn a cursor into the next page.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, cursor: Option<&Cursor>, page_size: u32) -> Page;
}

#[async_trait]
impl PageSource for PageFetcher {
    async fn fetch_page(&self, cursor: Option<&Cursor>, page_size: u32) -> Page {
        PageFetcher::fetch_page(self, cursor, page_size).await
    }
}
