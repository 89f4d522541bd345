//! # deposittrack-notify
//!
//! Best-effort delivery of human-readable deposit summaries to a Telegram
//! channel. A failed delivery is a lost notification: the pipeline logs it
//! and moves on, and never re-sends for a record that is already in the
//! ledger.

pub mod telegram;

pub use telegram::{deposit_message, startup_message, Notifier, TelegramNotifier};
