//! Error taxonomy for the deposit tracking pipeline.
//!
//! Decode and enrich failures are local to a single log and never escalate;
//! store failures are loud (they represent data loss); notify failures are
//! swallowed after logging. None of them terminate the stream loop.

use thiserror::Error;

/// Errors while decoding a raw log into a `DepositEvent`.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// `topics[0]` does not match the deposit event signature — this log
    /// belongs to some other schema and is discarded without alarm.
    #[error("Schema mismatch: topic0 {topic0} is not the deposit event signature")]
    SchemaMismatch { topic0: String },

    #[error("ABI decode failed: {reason}")]
    AbiDecodeFailed { reason: String },

    #[error("Invalid raw log: {reason}")]
    InvalidLog { reason: String },
}

/// Errors while enriching a decoded deposit with chain lookups.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// A block or receipt lookup failed after the provider exhausted its
    /// retry budget.
    #[error("Provider unavailable: {reason}")]
    ProviderUnavailable { reason: String },

    #[error("Missing field in provider response: {field}")]
    MissingField { field: String },
}

/// Errors while appending to the ledger.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Ledger write failed: {0}")]
    WriteFailure(#[from] std::io::Error),

    #[error("Record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors while delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification delivery failed: {reason}")]
    DeliveryFailure { reason: String },
}

/// Errors from the log subscription stream.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Connection failed: {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Stream closed unexpectedly")]
    Closed,

    #[error("{0}")]
    Other(String),
}
