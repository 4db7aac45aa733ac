//! Credential probe and rate-limit status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::QueryFailure;
use crate::executor::QueryExecutor;
use crate::queries;

/// Quota snapshot reported by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub limit: u64,
    pub cost: u64,
    pub remaining: u64,
    #[serde(rename = "resetAt")]
    pub reset_at: DateTime<Utc>,
}

/// The authenticated identity behind the bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub login: String,
    pub rate_limit: RateLimitStatus,
}

#[derive(Deserialize)]
struct ViewerData {
    viewer: ViewerLogin,
    #[serde(rename = "rateLimit")]
    rate_limit: RateLimitStatus,
}

#[derive(Deserialize)]
struct ViewerLogin {
    login: String,
}

#[derive(Deserialize)]
struct RateLimitData {
    #[serde(rename = "rateLimit")]
    rate_limit: RateLimitStatus,
}

fn decode<T: serde::de::DeserializeOwned>(data: serde_json::Value) -> Result<T, QueryFailure> {
    serde_json::from_value(data).map_err(|e| QueryFailure::Unexpected {
        status: Some(200),
        message: format!("unexpected payload shape: {e}"),
    })
}

impl QueryExecutor {
    /// Ask "who am I" to prove the token works before committing to a crawl.
    pub async fn verify_credentials(&self) -> Result<Viewer, QueryFailure> {
        let data: ViewerData = decode(self.execute(queries::VIEWER, serde_json::json!({})).await?)?;
        info!(
            login = %data.viewer.login,
            remaining = data.rate_limit.remaining,
            limit = data.rate_limit.limit,
            "GitHub authentication successful"
        );
        Ok(Viewer {
            login: data.viewer.login,
            rate_limit: data.rate_limit,
        })
    }

    pub async fn rate_limit_status(&self) -> Result<RateLimitStatus, QueryFailure> {
        let data: RateLimitData =
            decode(self.execute(queries::RATE_LIMIT, serde_json::json!({})).await?)?;
        Ok(data.rate_limit)
    }
}
