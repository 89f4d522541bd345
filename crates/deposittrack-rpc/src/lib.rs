//! # deposittrack-rpc
//!
//! HTTP JSON-RPC transport for the auxiliary chain lookups (block and
//! receipt), with bounded retry and exponential backoff. The
//! [`ChainProvider`] trait is the seam the enricher depends on; tests
//! substitute in-memory doubles.

pub mod client;
pub mod error;
pub mod provider;
pub mod request;
pub mod retry;

pub use client::{HttpClientConfig, HttpRpcClient};
pub use error::RpcError;
pub use provider::{BlockInfo, ChainProvider, ReceiptInfo};
pub use retry::{RetryConfig, RetryPolicy};
