//! `EthWsListener` — concrete `LogListener` over an Ethereum JSON-RPC
//! WebSocket subscription (`eth_subscribe("logs", filter)`).
//!
//! Reconnection is the tracker's job: when this stream ends or yields an
//! error, the tracker backs off and calls `subscribe()` again, which
//! re-registers the filter on the fresh connection.

use async_trait::async_trait;
use futures::{channel::mpsc, SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use deposittrack_core::error::StreamError;
use deposittrack_core::types::{LogFilter, RawLog};

use crate::listener::{LogListener, RawLogStream};

/// Ethereum WebSocket log listener.
pub struct EthWsListener {
    ws_url: String,
}

impl EthWsListener {
    /// Create a listener for the given WebSocket URL (`ws://` or `wss://`).
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
        }
    }
}

#[async_trait]
impl LogListener for EthWsListener {
    async fn subscribe(&self, filter: &LogFilter) -> Result<RawLogStream, StreamError> {
        let (tx, rx) = mpsc::channel::<Result<Vec<RawLog>, StreamError>>(512);

        let ws_url = self.ws_url.clone();
        let filter = filter.clone();

        tokio::spawn(async move {
            run_ws_subscription(ws_url, filter, tx).await;
        });

        Ok(Box::pin(rx))
    }
}

// ─── Internal WebSocket loop ──────────────────────────────────────────────────

async fn run_ws_subscription(
    ws_url: String,
    filter: LogFilter,
    mut tx: mpsc::Sender<Result<Vec<RawLog>, StreamError>>,
) {
    info!(url = %ws_url, "connecting log subscription");

    let ws_stream = match connect_async(&ws_url).await {
        Ok((ws, _)) => ws,
        Err(e) => {
            error!(error = %e, "WebSocket connect failed");
            let _ = tx
                .send(Err(StreamError::ConnectionFailed {
                    url: ws_url.clone(),
                    reason: e.to_string(),
                }))
                .await;
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    let sub_msg = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "eth_subscribe",
        "params": ["logs", filter.to_params()]
    });

    if let Err(e) = write.send(Message::Text(sub_msg.to_string())).await {
        error!(error = %e, "failed to send eth_subscribe");
        let _ = tx.send(Err(StreamError::Closed)).await;
        return;
    }

    while let Some(msg_result) = read.next().await {
        match msg_result {
            Err(e) => {
                warn!(error = %e, "WebSocket error");
                let _ = tx.send(Err(StreamError::Closed)).await;
                break;
            }
            Ok(Message::Text(text)) => {
                debug!("WS message: {}", truncate_for_log(&text, 120));
                if let Some(logs) = parse_subscription_payload(&text) {
                    if !logs.is_empty() && tx.send(Ok(logs)).await.is_err() {
                        // Receiver dropped
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => {
                info!("WebSocket closed by server");
                let _ = tx.send(Err(StreamError::Closed)).await;
                break;
            }
            Ok(Message::Ping(data)) => {
                // Keep the connection alive
                let _ = write.send(Message::Pong(data)).await;
            }
            Ok(_) => {} // binary / pong — ignore
        }
    }

    info!("WebSocket subscription loop ended");
}

/// Clamp `text` to at most `max` bytes for logging, backing off to the
/// nearest char boundary so multibyte frames never panic the slice.
fn truncate_for_log(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

// ─── Message parsing ─────────────────────────────────────────────────────────

/// Parse an `eth_subscription` message into a batch of raw logs.
///
/// The provider may deliver a single log object or an array of them; both
/// normalize to `Vec<RawLog>`. Returns `None` for subscription
/// confirmations and unparseable payloads.
fn parse_subscription_payload(text: &str) -> Option<Vec<RawLog>> {
    let v: Value = serde_json::from_str(text).ok()?;

    // Skip the subscription-id confirmation and anything else that is not
    // an eth_subscription notification.
    if v.get("method")?.as_str()? != "eth_subscription" {
        return None;
    }

    let result = v.get("params")?.get("result")?;

    let raw_values: Vec<&Value> = match result {
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };

    let logs: Vec<RawLog> = raw_values
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(log) => Some(log),
            Err(e) => {
                warn!(error = %e, "skipping malformed log in delivery");
                None
            }
        })
        .collect();

    Some(logs)
}
