//! Query execution with retry and rate-limit waiting.
//!
//! [`QueryExecutor::execute`] knows nothing about pagination or repository
//! records. It turns one logical query into the `data` payload, or a
//! [`QueryFailure`] once the retry budgets in [`RetryConfig`] run out.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, error, warn};

use starscan_core::config::RetryConfig;

use crate::error::{GraphqlError, QueryFailure};
use crate::retry::{RetryState, Signal, Step};
use crate::transport::{GraphqlRequest, GraphqlTransport, TransportResponse};

/// Body prefix kept in error messages.
const BODY_EXCERPT_LEN: usize = 200;

#[derive(Debug, Deserialize)]
struct GraphqlEnvelope {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

/// How one raw response should be handled.
enum Verdict {
    Done(Result<serde_json::Value, QueryFailure>),
    Retry(Signal),
}

#[derive(Clone)]
pub struct QueryExecutor {
    transport: Arc<dyn GraphqlTransport>,
    retry: RetryConfig,
}

impl QueryExecutor {
    pub fn new(transport: Arc<dyn GraphqlTransport>, retry: RetryConfig) -> Self {
        Self { transport, retry }
    }

    /// Run `query` with `variables`, retrying transient faults and waiting
    /// out rate limits. Returns the response's `data` member.
    ///
    /// Safe to call repeatedly: every query issued through here is a read.
    pub async fn execute(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<serde_json::Value, QueryFailure> {
        let request = GraphqlRequest {
            query: query.to_string(),
            variables,
        };
        let mut state = RetryState::new(self.retry.clone());

        loop {
            let signal = match self.transport.post(&request).await {
                Ok(response) => match classify(response) {
                    Verdict::Done(result) => return result,
                    Verdict::Retry(signal) => signal,
                },
                Err(e) if e.is_transient() => Signal::Transient { reason: e.to_string() },
                Err(e) => {
                    error!(error = %e, "GraphQL request failed");
                    return Err(QueryFailure::Unexpected {
                        status: None,
                        message: e.to_string(),
                    });
                }
            };

            match state.on_signal(signal.clone()) {
                Step::Retry { delay } => {
                    match &signal {
                        Signal::RateLimited { .. } => warn!(
                            attempt = state.attempts(),
                            wait_secs = delay.as_secs_f64(),
                            "rate limit hit, waiting before retry"
                        ),
                        Signal::Transient { reason } => warn!(
                            attempt = state.attempts(),
                            wait_secs = delay.as_secs_f64(),
                            reason = %reason,
                            "transient failure, backing off"
                        ),
                    }
                    tokio::time::sleep(delay).await;
                }
                Step::GiveUp(failure) => {
                    error!(error = %failure, "giving up on GraphQL query");
                    return Err(failure);
                }
            }
        }
    }
}

fn classify(response: TransportResponse) -> Verdict {
    let status = response.status;
    match status {
        200 => Verdict::Done(parse_success(&response.body)),
        429 => Verdict::Retry(Signal::RateLimited {
            wait: response.rate_limit.wait_hint(Utc::now()),
        }),
        403 if response.rate_limit.signals_rate_limit() => {
            Verdict::Retry(Signal::RateLimited {
                wait: response.rate_limit.wait_hint(Utc::now()),
            })
        }
        500..=599 => Verdict::Retry(Signal::Transient {
            reason: format!("HTTP {status}"),
        }),
        _ => {
            warn!(status, body = %excerpt(&response.body), "unexpected HTTP status");
            Verdict::Done(Err(QueryFailure::Unexpected {
                status: Some(status),
                message: excerpt(&response.body),
            }))
        }
    }
}

fn parse_success(body: &str) -> Result<serde_json::Value, QueryFailure> {
    let envelope: GraphqlEnvelope =
        serde_json::from_str(body).map_err(|e| QueryFailure::Unexpected {
            status: Some(200),
            message: format!("invalid JSON body: {e}"),
        })?;

    if let Some(errors) = envelope.errors.filter(|errs| !errs.is_empty()) {
        warn!(count = errors.len(), first = %errors[0].message, "GraphQL errors in response");
        return Err(QueryFailure::Rejected(errors));
    }

    match envelope.data {
        Some(data) if !data.is_null() => {
            debug!("GraphQL query succeeded");
            Ok(data)
        }
        _ => Err(QueryFailure::Unexpected {
            status: Some(200),
            message: "response has neither data nor errors".to_string(),
        }),
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_LEN).collect()
}
