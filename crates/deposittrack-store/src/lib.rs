//! # deposittrack-store
//!
//! The durability boundary: an append-only JSON-Lines ledger. Each committed
//! record is one self-delimited line, so a torn write at process death can
//! only damage the final line — every earlier record stays parseable.

pub mod ledger;

pub use ledger::Ledger;
