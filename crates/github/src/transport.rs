//! Remote query port and its HTTP implementation.
//!
//! [`GraphqlTransport`] is the seam between the retry logic and the wire:
//! it performs exactly one POST and reports the raw status, body and the
//! rate-limit headers. Everything above it (retry, backoff, decoding) is
//! transport-agnostic, which is what lets tests script responses.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, AUTHORIZATION, USER_AGENT};
use serde::Serialize;
use tracing::debug;

use starscan_core::config::GithubConfig;

use crate::error::{SetupError, TransportError};

/// Safety margin added on top of an absolute reset time.
const RESET_MARGIN: Duration = Duration::from_secs(1);

/// Request body for a GraphQL POST.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphqlRequest {
    pub query: String,
    pub variables: serde_json::Value,
}

/// Rate-limit headers as the remote sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitHeaders {
    /// `Retry-After`, relative seconds.
    pub retry_after_secs: Option<u64>,
    /// `X-RateLimit-Reset`, epoch seconds.
    pub reset_epoch: Option<i64>,
    /// `X-RateLimit-Remaining`.
    pub remaining: Option<u64>,
}

impl RateLimitHeaders {
    fn from_headers(headers: &HeaderMap) -> Self {
        fn parse<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
        }
        Self {
            retry_after_secs: parse(headers, "retry-after"),
            reset_epoch: parse(headers, "x-ratelimit-reset"),
            remaining: parse(headers, "x-ratelimit-remaining"),
        }
    }

    /// Whether a 403 carrying these headers is a rate limit.
    ///
    /// `X-RateLimit-Reset` rides on every GitHub response, so it alone says
    /// nothing; only `Retry-After` or an exhausted quota count.
    pub fn signals_rate_limit(&self) -> bool {
        self.retry_after_secs.is_some() || self.is_exhausted()
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// How long to wait before retrying, measured from `now`.
    ///
    /// `Retry-After` wins over the absolute reset time. A reset time in the
    /// past still yields the margin. `None` means no hint was given.
    pub fn wait_hint(&self, now: DateTime<Utc>) -> Option<Duration> {
        if let Some(secs) = self.retry_after_secs {
            return Some(Duration::from_secs(secs));
        }
        let reset = self.reset_epoch?;
        let remaining_ms = reset
            .saturating_mul(1000)
            .saturating_sub(now.timestamp_millis())
            .max(0);
        Some(Duration::from_millis(remaining_ms as u64) + RESET_MARGIN)
    }
}

/// One raw HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
    pub rate_limit: RateLimitHeaders,
}

impl TransportResponse {
    /// A 200 response carrying `body` as JSON.
    pub fn ok(body: serde_json::Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            rate_limit: RateLimitHeaders::default(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            rate_limit: RateLimitHeaders::default(),
        }
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitHeaders) -> Self {
        self.rate_limit = rate_limit;
        self
    }
}

/// The remote query port: one request in, one raw response out.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    async fn post(&self, request: &GraphqlRequest) -> Result<TransportResponse, TransportError>;
}

/// [`GraphqlTransport`] over HTTPS with a bearer token.
pub struct HttpTransport {
    url: String,
    token: String,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build from config; fails when the token is absent.
    pub fn from_config(config: &GithubConfig) -> Result<Self, SetupError> {
        let token = config.token()?.to_string();
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            url: config.graphql_url.clone(),
            token,
            client,
        })
    }
}

#[async_trait]
impl GraphqlTransport for HttpTransport {
    async fn post(&self, request: &GraphqlRequest) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(USER_AGENT, concat!("starscan/", env!("CARGO_PKG_VERSION")))
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let rate_limit = RateLimitHeaders::from_headers(response.headers());
        let body = response.text().await?;

        debug!(
            url = %self.url,
            status,
            remaining = ?rate_limit.remaining,
            bytes = body.len(),
            "GraphQL response received"
        );

        Ok(TransportResponse { status, body, rate_limit })
    }
}

/// Scripted transport for tests: replays queued responses in order.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
        requests: Mutex<Vec<GraphqlRequest>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response for the next call.
        pub fn push(&self, response: Result<TransportResponse, TransportError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        pub fn push_ok(&self, body: serde_json::Value) {
            self.push(Ok(TransportResponse::ok(body)));
        }

        /// Requests seen so far, oldest first.
        pub fn requests(&self) -> Vec<GraphqlRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn remaining(&self) -> usize {
            self.responses.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GraphqlTransport for ScriptedTransport {
        async fn post(&self, request: &GraphqlRequest) -> Result<TransportResponse, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Other("no scripted response left".into())))
        }
    }
}
