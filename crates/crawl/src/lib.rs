//! Crawl driver for the GitHub repository ingestion pipeline.
//!
//! `Crawler::crawl` checks the credential and then runs a `CrawlDriver`:
//! fetch a page, persist it, follow the cursor, repeat until the stream
//! ends, the budget is spent, a page stalls or fails, or a `StopHandle`
//! fires.

pub mod crawler;
pub mod driver;
pub mod error;
pub mod source;

pub use crawler::Crawler;
pub use driver::{CrawlDriver, CrawlReport, CrawlState, StopHandle};
pub use error::CrawlError;
pub use source::PageSource;
