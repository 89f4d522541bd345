//! Deposit event signature.
//!
//! For a raw log, `topics[0]` IS the signature hash — decoding only proceeds
//! when it equals keccak256 of the canonical signature string.

use tiny_keccak::{Hasher, Keccak};

/// Canonical ABI signature of the beacon deposit event.
pub const DEPOSIT_EVENT_SIGNATURE: &str = "DepositEvent(bytes,bytes,bytes,bytes,bytes)";

/// keccak256 of [`DEPOSIT_EVENT_SIGNATURE`] — the expected `topics[0]`.
pub const DEPOSIT_EVENT_TOPIC: &str =
    "0x649bbc62d0e31342afea4e5cd82d4049e7e1ee912fc0889aa790803be39038c5";

/// Compute the keccak256 hash of an event signature string as `0x…` hex.
pub fn keccak256_signature(signature: &str) -> String {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(signature.as_bytes());
    hasher.finalize(&mut output);
    format!("0x{}", hex::encode(output))
}

/// Returns `true` if `topic0` equals the deposit event signature hash.
pub fn matches_deposit_event(topic0: &str) -> bool {
    topic0.eq_ignore_ascii_case(DEPOSIT_EVENT_TOPIC)
}
