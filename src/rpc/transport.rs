//! JSON-RPC 2.0 transport over HTTPS.
//!
//! This is the only component that performs network I/O. It makes exactly
//! one attempt against exactly one endpoint per call; retries, failover and
//! caching all live a layer up.

use crate::rpc::error::TransportError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// A single-attempt JSON-RPC transport.
///
/// Kept as a trait so tests can script endpoint behavior without a network.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Issue one request to one endpoint and translate the outcome.
    async fn send(&self, url: &str, method: &str, params: &Value)
        -> Result<Value, TransportError>;
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a Value,
}

#[derive(Deserialize)]
struct RpcEnvelope {
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// HTTPS transport backed by a pooled reqwest client.
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    /// Create a transport with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(
        &self,
        url: &str,
        method: &str,
        params: &Value,
    ) -> Result<Value, TransportError> {
        let request = RpcRequest { jsonrpc: "2.0", id: 1, method, params };

        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TransportError::RateLimited);
        }
        if !status.is_success() {
            return Err(TransportError::Network(format!("http status {status}")));
        }

        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| TransportError::Network(format!("invalid json-rpc envelope: {e}")))?;

        if let Some(error) = envelope.error {
            return Err(TransportError::Protocol { code: error.code, message: error.message });
        }

        debug!(method, url, "rpc call succeeded");
        envelope
            .result
            .ok_or_else(|| TransportError::Network("response carried neither result nor error".into()))
    }
}

fn classify_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(error.to_string())
    }
}
