//! GitHub GraphQL client for the repository crawler.
//!
//! This crate provides:
//! - `GraphqlTransport`, the remote query port, with an HTTPS implementation
//! - `QueryExecutor`: retry with exponential backoff and rate-limit waiting
//! - `PageFetcher`: cursor in, decoded page of repositories out
//! - Credential probe and rate-limit status queries

pub mod account;
pub mod error;
pub mod executor;
pub mod fetcher;
pub mod queries;
pub mod retry;
pub mod transport;

pub use account::{RateLimitStatus, Viewer};
pub use error::{DecodeSkip, GraphqlError, QueryFailure, SetupError, TransportError};
pub use executor::QueryExecutor;
pub use fetcher::{Page, PageFetcher, MAX_PAGE_SIZE};
pub use transport::{GraphqlRequest, GraphqlTransport, HttpTransport, RateLimitHeaders, TransportResponse};
