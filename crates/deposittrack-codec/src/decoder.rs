//! `DepositDecoder` — pure RawLog → DepositEvent conversion.

use alloy_core::dyn_abi::{DynSolType, DynSolValue};

use deposittrack_core::error::DecodeError;
use deposittrack_core::types::{DepositEvent, RawLog};

use crate::signature;

/// Decoder for the fixed deposit event schema.
/// Stateless, cheap to clone.
#[derive(Debug, Default, Clone)]
pub struct DepositDecoder;

impl DepositDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode a raw log into a `DepositEvent`.
    ///
    /// Fails with `SchemaMismatch` when `topics[0]` is absent or is not the
    /// deposit event signature hash, regardless of `data` contents.
    pub fn decode(&self, log: &RawLog) -> Result<DepositEvent, DecodeError> {
        let topic0 = log.topic0().ok_or_else(|| DecodeError::InvalidLog {
            reason: "log has no topics".into(),
        })?;
        if !signature::matches_deposit_event(topic0) {
            return Err(DecodeError::SchemaMismatch {
                topic0: topic0.to_string(),
            });
        }

        let data_hex = log.data.strip_prefix("0x").unwrap_or(&log.data);
        let data = hex::decode(data_hex).map_err(|e| DecodeError::InvalidLog {
            reason: format!("invalid data hex: {e}"),
        })?;

        // All five fields are non-indexed dynamic bytes: the payload is an
        // ABI params sequence (bytes,bytes,bytes,bytes,bytes).
        let tuple_type = DynSolType::Tuple(vec![DynSolType::Bytes; 5]);
        let decoded = tuple_type
            .abi_decode_params(&data)
            .map_err(|e| DecodeError::AbiDecodeFailed {
                reason: e.to_string(),
            })?;

        let values = match decoded {
            DynSolValue::Tuple(vals) => vals,
            other => {
                return Err(DecodeError::AbiDecodeFailed {
                    reason: format!("expected tuple, got {other:?}"),
                })
            }
        };

        let fields: Vec<Vec<u8>> = values
            .into_iter()
            .map(|v| match v {
                DynSolValue::Bytes(b) => Ok(b),
                other => Err(DecodeError::AbiDecodeFailed {
                    reason: format!("expected bytes field, got {other:?}"),
                }),
            })
            .collect::<Result<_, _>>()?;

        // Declaration order: pubkey, withdrawal_credentials, amount,
        // signature, index.
        let [pubkey, withdrawal_credentials, amount, signature, index]: [Vec<u8>; 5] =
            fields.try_into().map_err(|_| DecodeError::AbiDecodeFailed {
                reason: "expected five bytes fields".into(),
            })?;

        Ok(DepositEvent {
            pubkey,
            withdrawal_credentials,
            amount,
            signature,
            index,
        })
    }
}
