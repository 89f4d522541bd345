//! Enrichment stage: merge a decoded deposit with block and receipt lookups.

use std::sync::Arc;

use deposittrack_core::error::EnrichError;
use deposittrack_core::types::{DepositEvent, EnrichedRecord, RawLog};
use deposittrack_rpc::error::RpcError;
use deposittrack_rpc::provider::ChainProvider;

/// Enriches decoded deposits via the chain provider.
pub struct Enricher {
    provider: Arc<dyn ChainProvider>,
}

impl Enricher {
    pub fn new(provider: Arc<dyn ChainProvider>) -> Self {
        Self { provider }
    }

    /// Build the durable record for one deposit.
    ///
    /// The block and receipt lookups share no data dependency and are issued
    /// concurrently. If either fails after the provider's own retry budget,
    /// the whole enrichment fails and the caller discards this delivery.
    pub async fn enrich(
        &self,
        event: &DepositEvent,
        log: &RawLog,
    ) -> Result<EnrichedRecord, EnrichError> {
        let (block, receipt) = tokio::join!(
            self.provider.get_block(log.block_number_u64()),
            self.provider.get_receipt(&log.tx_hash),
        );
        let block = block.map_err(provider_unavailable)?;
        let receipt = receipt.map_err(provider_unavailable)?;

        Ok(EnrichedRecord {
            block_number: log.block_number_u64(),
            block_timestamp: block.timestamp,
            // Exact big-integer product; wei fees can exceed 64-bit range.
            fee_wei: receipt.fee_wei().to_string(),
            transaction_hash: log.tx_hash.clone(),
            pubkey: event.pubkey_hex(),
        })
    }
}

fn provider_unavailable(e: RpcError) -> EnrichError {
    EnrichError::ProviderUnavailable {
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use deposittrack_rpc::provider::{BlockInfo, ReceiptInfo};
    use num_bigint::BigUint;

    struct FixedProvider {
        timestamp: u64,
        gas_used: u64,
        effective_gas_price: u64,
        fail_block: bool,
    }

    #[async_trait]
    impl ChainProvider for FixedProvider {
        async fn get_block(&self, number: u64) -> Result<BlockInfo, RpcError> {
            if self.fail_block {
                return Err(RpcError::Http("connection refused".into()));
            }
            Ok(BlockInfo {
                number,
                timestamp: self.timestamp,
            })
        }

        async fn get_receipt(&self, _tx_hash: &str) -> Result<ReceiptInfo, RpcError> {
            Ok(ReceiptInfo {
                gas_used: BigUint::from(self.gas_used),
                effective_gas_price: BigUint::from(self.effective_gas_price),
            })
        }
    }

    fn deposit_log() -> RawLog {
        RawLog {
            address: "0x00000000219ab540356cbb839cbe05303d7705fa".into(),
            topics: vec![deposittrack_codec::DEPOSIT_EVENT_TOPIC.into()],
            data: "0x".into(),
            block_number: "0x112a880".into(), // 18_000_000
            tx_hash: "0xfeedbeef".into(),
            log_index: "0x0".into(),
            removed: None,
        }
    }

    fn deposit_event() -> DepositEvent {
        DepositEvent {
            pubkey: vec![0xab, 0xcd],
            withdrawal_credentials: vec![],
            amount: 32_000_000_000u64.to_le_bytes().to_vec(),
            signature: vec![],
            index: vec![],
        }
    }

    #[tokio::test]
    async fn enrich_merges_lookups() {
        let enricher = Enricher::new(Arc::new(FixedProvider {
            timestamp: 1_690_000_000,
            gas_used: 21_000,
            effective_gas_price: 30_000_000_000,
            fail_block: false,
        }));

        let record = enricher.enrich(&deposit_event(), &deposit_log()).await.unwrap();
        assert_eq!(record.block_number, 18_000_000);
        assert_eq!(record.block_timestamp, 1_690_000_000);
        assert_eq!(record.fee_wei, "630000000000000");
        assert_eq!(record.transaction_hash, "0xfeedbeef");
        assert_eq!(record.pubkey, "0xabcd");
    }

    #[tokio::test]
    async fn fee_exact_beyond_64_bits() {
        let enricher = Enricher::new(Arc::new(FixedProvider {
            timestamp: 0,
            gas_used: 21_000,
            effective_gas_price: 50_000_000_000_000,
            fail_block: false,
        }));

        let record = enricher.enrich(&deposit_event(), &deposit_log()).await.unwrap();
        assert_eq!(record.fee_wei, "1050000000000000000");
    }

    #[tokio::test]
    async fn lookup_failure_surfaces_provider_unavailable() {
        let enricher = Enricher::new(Arc::new(FixedProvider {
            timestamp: 0,
            gas_used: 1,
            effective_gas_price: 1,
            fail_block: true,
        }));

        let err = enricher
            .enrich(&deposit_event(), &deposit_log())
            .await
            .unwrap_err();
        assert!(matches!(err, EnrichError::ProviderUnavailable { .. }));
    }
}
