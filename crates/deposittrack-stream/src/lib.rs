//! # deposittrack-stream
//!
//! The subscription manager and per-record pipeline.
//!
//! ## Architecture
//! ```text
//! LogListener (WebSocket, eth_subscribe("logs", filter))
//!       │  Vec<RawLog> per delivery (single logs normalized to a batch of one)
//!       ▼
//! DepositTracker ── spawns one task per log ──► Pipeline
//!                                                 ├── DepositDecoder
//!                                                 ├── Enricher (block + receipt, concurrent)
//!                                                 ├── Ledger::append   ← durability boundary
//!                                                 └── Notifier (best-effort)
//! ```
//!
//! No ordering is guaranteed across records; within a record the stages run
//! strictly in order, and a notification is never sent for a record that
//! did not commit.

pub mod enrich;
pub mod listener;
pub mod tracker;
pub mod ws_listener;

pub use enrich::Enricher;
pub use listener::{LogListener, RawLogStream};
pub use tracker::{DepositTracker, Pipeline, TrackerMetrics, TrackerState};
pub use ws_listener::EthWsListener;
