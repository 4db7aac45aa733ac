use thiserror::Error;

use starscan_core::ConfigError;
use starscan_github::{QueryFailure, SetupError};

/// Reasons a crawl refuses to start. Once running, a crawl always ends
/// with a [`CrawlReport`](crate::CrawlReport) instead of an error.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("invalid crawl settings: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot reach GitHub: {0}")]
    Setup(#[from] SetupError),

    #[error("credential check failed: {0}")]
    Credentials(QueryFailure),
}
