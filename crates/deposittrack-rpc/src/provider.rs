//! `ChainProvider` — the auxiliary-lookup capability the enricher needs.

use async_trait::async_trait;
use num_bigint::BigUint;
use serde_json::{json, Value};

use deposittrack_core::types::parse_hex_u64;

use crate::client::HttpRpcClient;
use crate::error::RpcError;

/// Block fields the pipeline cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub number: u64,
    /// Unix seconds.
    pub timestamp: u64,
}

/// Receipt fields the pipeline cares about. Both quantities are exact —
/// wei-denominated products can exceed 64-bit range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptInfo {
    pub gas_used: BigUint,
    pub effective_gas_price: BigUint,
}

impl ReceiptInfo {
    /// `gasUsed × effectiveGasPrice`, exact.
    pub fn fee_wei(&self) -> BigUint {
        &self.gas_used * &self.effective_gas_price
    }
}

/// Trait for fetching chain data from a JSON-RPC provider.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    async fn get_block(&self, number: u64) -> Result<BlockInfo, RpcError>;
    async fn get_receipt(&self, tx_hash: &str) -> Result<ReceiptInfo, RpcError>;
}

#[async_trait]
impl ChainProvider for HttpRpcClient {
    async fn get_block(&self, number: u64) -> Result<BlockInfo, RpcError> {
        let result = self
            .call(
                "eth_getBlockByNumber",
                vec![json!(format!("0x{number:x}")), json!(false)],
            )
            .await?;
        if result.is_null() {
            return Err(RpcError::MissingResult {
                what: format!("block {number}"),
            });
        }
        Ok(BlockInfo {
            number,
            timestamp: require_hex_u64(&result, "timestamp")?,
        })
    }

    async fn get_receipt(&self, tx_hash: &str) -> Result<ReceiptInfo, RpcError> {
        let result = self
            .call("eth_getTransactionReceipt", vec![json!(tx_hash)])
            .await?;
        if result.is_null() {
            return Err(RpcError::MissingResult {
                what: format!("receipt {tx_hash}"),
            });
        }
        Ok(ReceiptInfo {
            gas_used: require_hex_biguint(&result, "gasUsed")?,
            effective_gas_price: require_hex_biguint(&result, "effectiveGasPrice")?,
        })
    }
}

fn require_hex_u64(v: &Value, field: &str) -> Result<u64, RpcError> {
    v.get(field)
        .and_then(Value::as_str)
        .map(parse_hex_u64)
        .ok_or_else(|| RpcError::MalformedResponse {
            field: field.to_string(),
        })
}

fn require_hex_biguint(v: &Value, field: &str) -> Result<BigUint, RpcError> {
    let s = v
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::MalformedResponse {
            field: field.to_string(),
        })?;
    let hex = s.strip_prefix("0x").unwrap_or(s);
    BigUint::parse_bytes(hex.as_bytes(), 16).ok_or_else(|| RpcError::MalformedResponse {
        field: field.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_is_exact_beyond_u64() {
        let receipt = ReceiptInfo {
            gas_used: BigUint::from(21_000u64),
            effective_gas_price: BigUint::from(50_000_000_000_000u64),
        };
        assert_eq!(
            receipt.fee_wei().to_string(),
            "1050000000000000000" // exceeds what f64 could represent exactly
        );
    }

    #[test]
    fn hex_biguint_parses_wide_quantities() {
        let v = json!({ "gasUsed": "0xffffffffffffffffff" }); // 9 bytes
        let parsed = require_hex_biguint(&v, "gasUsed").unwrap();
        assert_eq!(parsed, (BigUint::from(1u8) << 72) - BigUint::from(1u8));
    }

    #[test]
    fn missing_field_is_malformed() {
        let v = json!({ "timestamp": 5 }); // not a hex string
        assert!(matches!(
            require_hex_u64(&v, "timestamp"),
            Err(RpcError::MalformedResponse { .. })
        ));
    }
}
