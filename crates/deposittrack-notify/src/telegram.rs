//! Telegram notification channel.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::info;

use deposittrack_core::config::TelegramConfig;
use deposittrack_core::error::NotifyError;
use deposittrack_core::types::EnrichedRecord;

/// Abstracts the notification channel so the pipeline can be tested with
/// an in-memory double.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text`, once. No retry loop: the caller treats a failure as
    /// a lost notification.
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Telegram notifier addressed by bot token + chat id.
pub struct TelegramNotifier {
    config: TelegramConfig,
    client: Client,
    api_base: String,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("configured", &self.is_configured())
            .field("api_base", &"<redacted>")
            .finish()
    }
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self, NotifyError> {
        let api_base = format!("https://api.telegram.org/bot{}", config.bot_token);
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| NotifyError::DeliveryFailure {
                reason: e.to_string(),
            })?;

        Ok(Self {
            config,
            client,
            api_base,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        if !self.is_configured() {
            info!(
                "Telegram not configured, would send: {}",
                truncate_for_log(text, 200)
            );
            return Ok(());
        }

        let resp = self
            .client
            .post(format!("{}/sendMessage", self.api_base))
            .json(&json!({
                "chat_id": self.config.chat_id,
                "text": text,
            }))
            .send()
            .await
            .map_err(|e| NotifyError::DeliveryFailure {
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(NotifyError::DeliveryFailure {
                reason: format!("HTTP {}", resp.status()),
            });
        }

        info!("Telegram notification sent");
        Ok(())
    }
}

/// Clamp `text` to at most `max` bytes, backing off to the nearest char
/// boundary so multibyte message text never panics the slice.
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

/// The human-readable summary of a committed deposit record.
pub fn deposit_message(record: &EnrichedRecord) -> String {
    format!(
        "Fee: {} Wei\nTransaction Hash: {}",
        record.fee_wei, record.transaction_hash
    )
}

/// The liveness message sent once at startup, before subscribing.
pub fn startup_message() -> String {
    "The deposit tracker is live and running".into()
}
