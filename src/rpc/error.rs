//! Typed errors for the RPC acquisition layer.

use thiserror::Error;

/// Outcome of a single transport attempt against a single endpoint.
///
/// Every variant is retryable across endpoints; the distinction matters to
/// the endpoint pool, which cools rate-limited endpoints down far more
/// aggressively than ones that merely dropped a connection.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("rate limited")]
    RateLimited,
    #[error("rpc error {code}: {message}")]
    Protocol { code: i64, message: String },
}

impl TransportError {
    /// True for HTTP 429 style push-back.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, TransportError::RateLimited)
    }
}

/// Errors surfaced by the unified query API.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    /// Every attempted endpoint failed within the attempt cap.
    #[error("no endpoint answered after {attempts} attempts, last error: {last}")]
    Unavailable { attempts: usize, last: String },
    /// The endpoint answered, but the payload did not have the expected shape.
    #[error("malformed {method} response: {reason}")]
    Malformed { method: &'static str, reason: String },
}
