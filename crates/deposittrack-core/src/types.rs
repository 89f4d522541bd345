//! Shared types for the deposit tracking pipeline.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── RawLog ───────────────────────────────────────────────────────────────────

/// A raw EVM log as delivered by an `eth_subscribe("logs", …)` stream.
///
/// Quantities arrive as `0x`-prefixed hex strings and are kept that way;
/// accessors convert on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "transactionHash")]
    pub tx_hash: String,
    #[serde(rename = "logIndex")]
    pub log_index: String,
    #[serde(rename = "removed", default)]
    pub removed: Option<bool>,
}

impl RawLog {
    /// Block number as u64.
    pub fn block_number_u64(&self) -> u64 {
        parse_hex_u64(&self.block_number)
    }

    /// Log index within the block as u32.
    pub fn log_index_u32(&self) -> u32 {
        parse_hex_u64(&self.log_index) as u32
    }

    /// Returns `true` if this log was removed by a reorg.
    pub fn is_removed(&self) -> bool {
        self.removed.unwrap_or(false)
    }

    /// The event signature hash (`topics[0]`), if present.
    pub fn topic0(&self) -> Option<&str> {
        self.topics.first().map(String::as_str)
    }
}

/// Parse a hex-encoded quantity string (with or without `0x`) to u64.
pub fn parse_hex_u64(s: &str) -> u64 {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).unwrap_or(0)
}

// ─── LogFilter ────────────────────────────────────────────────────────────────

/// Filter registered with the provider: one contract address, one topic0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogFilter {
    /// Contract address to watch.
    pub address: String,
    /// Event signature hashes to match against `topics[0]`.
    pub topics: Vec<String>,
}

impl LogFilter {
    pub fn new(address: impl Into<String>, topic0: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            topics: vec![topic0.into()],
        }
    }

    /// The `eth_subscribe("logs", …)` parameter object.
    pub fn to_params(&self) -> Value {
        serde_json::json!({
            "address": self.address,
            "topics": self.topics,
        })
    }
}

// ─── DepositEvent ─────────────────────────────────────────────────────────────

/// A decoded `DepositEvent(bytes,bytes,bytes,bytes,bytes)` occurrence.
///
/// Fields in contract declaration order. `amount` is the raw little-endian
/// byte encoding used by the deposit contract; use [`DepositEvent::amount_gwei`]
/// for the integer value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositEvent {
    pub pubkey: Vec<u8>,
    pub withdrawal_credentials: Vec<u8>,
    pub amount: Vec<u8>,
    pub signature: Vec<u8>,
    pub index: Vec<u8>,
}

impl DepositEvent {
    /// Deposit amount in Gwei, decoded from little-endian bytes of arbitrary
    /// length. Widths beyond 64 bits are preserved exactly.
    pub fn amount_gwei(&self) -> BigUint {
        BigUint::from_bytes_le(&self.amount)
    }

    /// Validator pubkey as a `0x`-prefixed hex string.
    pub fn pubkey_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.pubkey))
    }
}

// ─── EnrichedRecord ───────────────────────────────────────────────────────────

/// The unit of durability and notification: a deposit merged with block and
/// receipt lookups. Serialized as one JSON object per ledger line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRecord {
    pub block_number: u64,
    /// Unix seconds.
    pub block_timestamp: u64,
    /// `gasUsed × effectiveGasPrice` in wei, as an exact decimal string.
    pub fee_wei: String,
    pub transaction_hash: String,
    pub pubkey: String,
}
