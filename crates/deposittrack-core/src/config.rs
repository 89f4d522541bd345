//! Tracker configuration.
//!
//! Loaded from the environment in the binary; components receive their
//! sections by value so tests can construct them directly.

use serde::{Deserialize, Serialize};

/// Mainnet beacon-chain deposit contract.
pub const DEFAULT_DEPOSIT_CONTRACT: &str = "0x00000000219ab540356cBB839Cbe05303d7705Fa";

/// Configuration for the chain-data provider connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// WebSocket endpoint for the log subscription, e.g.
    /// "wss://eth-mainnet.g.alchemy.com/v2/KEY".
    pub ws_url: String,
    /// HTTP endpoint for block/receipt lookups.
    pub http_url: String,
    /// Maximum retry attempts per lookup before surfacing a failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial reconnect/retry backoff in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_max_retries() -> u32 { 10 }
fn default_backoff_ms() -> u64 { 500 }

/// Telegram channel identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }
}

/// Top-level tracker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub provider: ProviderConfig,
    /// Deposit contract address to watch.
    #[serde(default = "default_contract")]
    pub contract_address: String,
    /// Path of the append-only ledger file.
    #[serde(default = "default_ledger_path")]
    pub ledger_path: String,
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Grace period for draining in-flight records on shutdown (ms).
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

fn default_contract() -> String { DEFAULT_DEPOSIT_CONTRACT.into() }
fn default_ledger_path() -> String { "data/deposits.jsonl".into() }
fn default_drain_timeout_ms() -> u64 { 10_000 }

impl TrackerConfig {
    /// Read configuration from the environment.
    ///
    /// `ETH_WS_URL` and `ETH_HTTP_URL` are required; everything else has a
    /// default. Telegram credentials come from `TELEGRAM_BOT_TOKEN` and
    /// `TELEGRAM_CHAT_ID` and may be absent (notifications are then logged
    /// instead of sent).
    pub fn from_env() -> Result<Self, String> {
        let ws_url = std::env::var("ETH_WS_URL")
            .map_err(|_| "ETH_WS_URL is not set".to_string())?;
        let http_url = std::env::var("ETH_HTTP_URL")
            .map_err(|_| "ETH_HTTP_URL is not set".to_string())?;

        Ok(Self {
            provider: ProviderConfig {
                ws_url,
                http_url,
                max_retries: env_or("PROVIDER_MAX_RETRIES", default_max_retries()),
                backoff_ms: env_or("PROVIDER_BACKOFF_MS", default_backoff_ms()),
            },
            contract_address: std::env::var("DEPOSIT_CONTRACT")
                .unwrap_or_else(|_| default_contract()),
            ledger_path: std::env::var("LEDGER_PATH").unwrap_or_else(|_| default_ledger_path()),
            telegram: TelegramConfig {
                bot_token: std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
                chat_id: std::env::var("TELEGRAM_CHAT_ID").unwrap_or_default(),
            },
            drain_timeout_ms: env_or("DRAIN_TIMEOUT_MS", default_drain_timeout_ms()),
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telegram_configured_requires_both() {
        let mut tg = TelegramConfig::default();
        assert!(!tg.is_configured());
        tg.bot_token = "123:abc".into();
        assert!(!tg.is_configured());
        tg.chat_id = "-100".into();
        assert!(tg.is_configured());
    }

    #[test]
    fn config_defaults_from_json() {
        let cfg: TrackerConfig = serde_json::from_str(
            r#"{"provider":{"ws_url":"wss://x","http_url":"https://x"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.contract_address, DEFAULT_DEPOSIT_CONTRACT);
        assert_eq!(cfg.provider.max_retries, 10);
        assert_eq!(cfg.ledger_path, "data/deposits.jsonl");
        assert!(!cfg.telegram.is_configured());
    }
}
