//! # deposittrack-codec
//!
//! Decodes raw `eth_subscribe` logs into typed [`DepositEvent`] records.
//!
//! The schema is fixed: `DepositEvent(bytes,bytes,bytes,bytes,bytes)` with
//! all five fields non-indexed, so the whole payload lives in `log.data` as
//! an ABI params sequence of dynamic byte arrays.
//!
//! [`DepositEvent`]: deposittrack_core::DepositEvent

pub mod decoder;
pub mod signature;

pub use decoder::DepositDecoder;
pub use signature::{DEPOSIT_EVENT_SIGNATURE, DEPOSIT_EVENT_TOPIC};
