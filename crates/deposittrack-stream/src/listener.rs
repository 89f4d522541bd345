//! `LogListener` trait — abstraction over the provider's log subscription.
//!
//! A delivery may carry a single log or a batch; implementations normalize
//! both to `Vec<RawLog>` so the tracker treats them uniformly.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use deposittrack_core::error::StreamError;
use deposittrack_core::types::{LogFilter, RawLog};

/// A stream of log deliveries from the provider.
pub type RawLogStream = Pin<Box<dyn Stream<Item = Result<Vec<RawLog>, StreamError>> + Send>>;

/// Abstracts the live subscription transport.
#[async_trait]
pub trait LogListener: Send + Sync {
    /// Register `filter` and start streaming matching logs.
    async fn subscribe(&self, filter: &LogFilter) -> Result<RawLogStream, StreamError>;
}
