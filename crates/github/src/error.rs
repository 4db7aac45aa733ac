//! Error types for the GitHub GraphQL client.

use serde::{Deserialize, Serialize};
use starscan_core::{ConfigError, RecordError};

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlError {
    pub message: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<serde_json::Value>>,
}

/// Why a query did not produce a payload.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueryFailure {
    /// The remote answered but reported application-level errors.
    /// Retrying the same request unchanged will not help.
    #[error("query rejected: {}", summarize(.0))]
    Rejected(Vec<GraphqlError>),

    #[error("rate limited: gave up after {waits} waits")]
    RateLimited { waits: u32 },

    #[error("remote unavailable after {attempts} attempts: {last_error}")]
    Unavailable { attempts: u32, last_error: String },

    #[error("unexpected response{}: {message}", status_suffix(.status))]
    Unexpected { status: Option<u16>, message: String },
}

fn summarize(errors: &[GraphqlError]) -> String {
    if errors.is_empty() {
        return "(empty error list)".to_string();
    }
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

/// Failure below the HTTP status layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Timeouts and connection drops are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Connect(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Other(e.to_string())
        }
    }
}

/// The client could not be constructed.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Why a single search result item was dropped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeSkip {
    #[error("item is not a repository object: {0}")]
    Malformed(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' has unparseable timestamp '{value}'")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("negative stargazer count {0}")]
    NegativeStars(i64),

    #[error(transparent)]
    Record(#[from] RecordError),
}
