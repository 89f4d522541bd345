//! HTTP JSON-RPC client backed by `reqwest`.
//!
//! Retries transient failures with exponential backoff up to the configured
//! budget, then surfaces the last error to the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;

use crate::error::RpcError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};
use crate::retry::{RetryConfig, RetryPolicy};

/// Configuration for `HttpRpcClient`.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub retry: RetryConfig,
    pub request_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP JSON-RPC client with built-in bounded retry.
pub struct HttpRpcClient {
    url: String,
    http: reqwest::Client,
    retry: RetryPolicy,
    req_id: AtomicU64,
}

impl HttpRpcClient {
    /// Create a new client for the given JSON-RPC endpoint URL.
    pub fn new(url: impl Into<String>, config: HttpClientConfig) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RpcError::Http(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            http,
            retry: RetryPolicy::new(config.retry),
            req_id: AtomicU64::new(1),
        })
    }

    /// Create with default configuration.
    pub fn default_for(url: impl Into<String>) -> Result<Self, RpcError> {
        Self::new(url, HttpClientConfig::default())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue a single JSON-RPC call, retrying transient failures.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let req = JsonRpcRequest::new(self.req_id.fetch_add(1, Ordering::Relaxed), method, params);

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.send_once(&req).await {
                Ok(resp) => return resp.into_result().map_err(RpcError::Rpc),
                Err(e) if e.is_retryable() => match self.retry.next_delay(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            method,
                            "retrying request"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        tracing::error!(attempt, error = %e, method, "max retries exceeded");
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, RpcError> {
        let resp = self
            .http
            .post(&self.url)
            .json(req)
            .send()
            .await
            .map_err(|e| RpcError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RpcError::Http(format!("HTTP {status}: {body}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| RpcError::Http(e.to_string()))?;
        Ok(serde_json::from_str::<JsonRpcResponse>(&body)?)
    }
}
