//! deposittrack-core — foundation types for the deposit tracking pipeline.
//!
//! # Architecture
//!
//! ```text
//! DepositTracker (subscription manager)
//!       ├── DepositDecoder   (RawLog → DepositEvent)
//!       ├── Enricher         (DepositEvent + lookups → EnrichedRecord)
//!       ├── Ledger           (append-only durability boundary)
//!       └── TelegramNotifier (best-effort delivery)
//! ```

pub mod config;
pub mod error;
pub mod types;

pub use config::{ProviderConfig, TelegramConfig, TrackerConfig};
pub use error::{DecodeError, EnrichError, NotifyError, StoreError, StreamError};
pub use types::{DepositEvent, EnrichedRecord, LogFilter, RawLog};
