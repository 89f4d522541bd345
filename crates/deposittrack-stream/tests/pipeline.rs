//! End-to-end pipeline tests with in-memory doubles for the provider,
//! notifier, and listener. Only the ledger touches the real filesystem.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_core::dyn_abi::DynSolValue;
use async_trait::async_trait;
use futures::StreamExt as _;
use num_bigint::BigUint;
use tokio::sync::watch;

use deposittrack_codec::DEPOSIT_EVENT_TOPIC;
use deposittrack_core::error::{NotifyError, StreamError};
use deposittrack_core::types::{LogFilter, RawLog};
use deposittrack_notify::Notifier;
use deposittrack_rpc::error::RpcError;
use deposittrack_rpc::provider::{BlockInfo, ChainProvider, ReceiptInfo};
use deposittrack_store::Ledger;
use deposittrack_stream::{
    DepositTracker, Enricher, LogListener, Pipeline, RawLogStream, TrackerState,
};

// ─── Doubles ────────────────────────────────────────────────────────────────

struct FixedProvider {
    timestamp: u64,
    gas_used: u64,
    effective_gas_price: u64,
}

#[async_trait]
impl ChainProvider for FixedProvider {
    async fn get_block(&self, number: u64) -> Result<BlockInfo, RpcError> {
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

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _text: &str) -> Result<(), NotifyError> {
        Err(NotifyError::DeliveryFailure {
            reason: "HTTP 502".into(),
        })
    }
}

/// Delivers the canned batches once, then reports the stream closed.
struct ScriptedListener {
    batches: Mutex<Vec<Vec<RawLog>>>,
}

#[async_trait]
impl LogListener for ScriptedListener {
    async fn subscribe(&self, _filter: &LogFilter) -> Result<RawLogStream, StreamError> {
        let batches = std::mem::take(&mut *self.batches.lock().unwrap());
        let items: Vec<Result<Vec<RawLog>, StreamError>> =
            batches.into_iter().map(Ok).collect();
        Ok(Box::pin(futures::stream::iter(items).chain(futures::stream::pending())))
    }
}

/// First subscription delivers one batch and then ends, forcing the tracker
/// to re-subscribe; later subscriptions stay open.
struct DroppingListener {
    subscriptions: Mutex<u32>,
}

#[async_trait]
impl LogListener for DroppingListener {
    async fn subscribe(&self, _filter: &LogFilter) -> Result<RawLogStream, StreamError> {
        let mut calls = self.subscriptions.lock().unwrap();
        *calls += 1;
        if *calls == 1 {
            let items: Vec<Result<Vec<RawLog>, StreamError>> =
                vec![Ok(vec![deposit_log("0xaaaa", "0x0")])];
            Ok(Box::pin(futures::stream::iter(items)))
        } else {
            let items: Vec<Result<Vec<RawLog>, StreamError>> =
                vec![Ok(vec![deposit_log("0xbbbb", "0x1")])];
            Ok(Box::pin(
                futures::stream::iter(items).chain(futures::stream::pending()),
            ))
        }
    }
}

// ─── Fixtures ───────────────────────────────────────────────────────────────

fn encode_bytes_params(fields: &[&[u8]]) -> Vec<u8> {
    let values: Vec<DynSolValue> = fields
        .iter()
        .map(|f| DynSolValue::Bytes(f.to_vec()))
        .collect();
    DynSolValue::Tuple(values).abi_encode_params()
}

fn deposit_log(tx_hash: &str, log_index: &str) -> RawLog {
    let pubkey = [0xab, 0xcd];
    let wc = [0x22u8; 32];
    let amount = 32_000_000_000u64.to_le_bytes();
    let sig = [0x33u8; 96];
    let index = 0u64.to_le_bytes();
    let data = encode_bytes_params(&[&pubkey, &wc, &amount, &sig, &index]);

    RawLog {
        address: "0x00000000219ab540356cbb839cbe05303d7705fa".into(),
        topics: vec![DEPOSIT_EVENT_TOPIC.into()],
        data: format!("0x{}", hex::encode(data)),
        block_number: "0x112a880".into(), // 18_000_000
        tx_hash: tx_hash.into(),
        log_index: log_index.into(),
        removed: None,
    }
}

fn pipeline_with(
    notifier: Arc<dyn Notifier>,
    ledger_path: &std::path::Path,
) -> Arc<Pipeline> {
    let provider = Arc::new(FixedProvider {
        timestamp: 1_690_000_000,
        gas_used: 21_000,                   // 0x5208
        effective_gas_price: 30_000_000_000, // 30 Gwei
    });
    let ledger = Arc::new(Ledger::open(ledger_path).unwrap());
    Arc::new(Pipeline::new(Enricher::new(provider), ledger, notifier))
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn end_to_end_single_deposit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deposits.jsonl");
    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = pipeline_with(notifier.clone(), &path);

    pipeline.process(deposit_log("0xaaaa", "0x0")).await;

    let records = Ledger::read_all(&path).unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.block_number, 18_000_000);
    assert_eq!(record.block_timestamp, 1_690_000_000);
    assert_eq!(record.fee_wei, "630000000000000");
    assert_eq!(record.transaction_hash, "0xaaaa");
    assert_eq!(record.pubkey, "0xabcd");

    let sent = notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("630000000000000"));
    assert!(sent[0].contains("0xaaaa"));

    let metrics = pipeline.metrics();
    assert_eq!(metrics.deposits_recorded, 1);
    assert_eq!(metrics.notify_failures, 0);
}

#[tokio::test]
async fn notify_failure_keeps_committed_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deposits.jsonl");
    let pipeline = pipeline_with(Arc::new(FailingNotifier), &path);

    pipeline.process(deposit_log("0xbbbb", "0x0")).await;

    // The append happened before the (failed) notification and survives it.
    let records = Ledger::read_all(&path).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].transaction_hash, "0xbbbb");

    let metrics = pipeline.metrics();
    assert_eq!(metrics.deposits_recorded, 1);
    assert_eq!(metrics.notify_failures, 1);
}

#[tokio::test]
async fn foreign_event_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deposits.jsonl");
    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = pipeline_with(notifier.clone(), &path);

    let mut log = deposit_log("0xcccc", "0x0");
    log.topics =
        vec!["0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef".into()];
    pipeline.process(log).await;

    assert!(Ledger::read_all(&path).unwrap().is_empty());
    assert!(notifier.sent.lock().unwrap().is_empty());
    assert_eq!(pipeline.metrics().schema_mismatches, 1);
}

#[tokio::test]
async fn concurrent_deposits_yield_intact_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deposits.jsonl");
    let pipeline = pipeline_with(Arc::new(RecordingNotifier::default()), &path);

    let a = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.process(deposit_log("0xaaaa", "0x0")).await })
    };
    let b = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.process(deposit_log("0xbbbb", "0x1")).await })
    };
    a.await.unwrap();
    b.await.unwrap();

    // Both lines parse back cleanly in either order.
    let mut hashes: Vec<String> = Ledger::read_all(&path)
        .unwrap()
        .into_iter()
        .map(|r| r.transaction_hash)
        .collect();
    hashes.sort();
    assert_eq!(hashes, vec!["0xaaaa".to_string(), "0xbbbb".to_string()]);
}

#[tokio::test]
async fn broken_payload_counts_as_decode_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deposits.jsonl");
    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = pipeline_with(notifier.clone(), &path);

    // Deposit topic0, but the payload is not a five-bytes params sequence.
    let mut log = deposit_log("0xdddd", "0x0");
    log.data = "0xdeadbeef".into();
    pipeline.process(log).await;

    assert!(Ledger::read_all(&path).unwrap().is_empty());
    assert!(notifier.sent.lock().unwrap().is_empty());
    let metrics = pipeline.metrics();
    assert_eq!(metrics.decode_failures, 1);
    assert_eq!(metrics.schema_mismatches, 0);
}

#[tokio::test]
async fn tracker_resubscribes_after_stream_ends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deposits.jsonl");
    let pipeline = pipeline_with(Arc::new(RecordingNotifier::default()), &path);

    let listener = Arc::new(DroppingListener {
        subscriptions: Mutex::new(0),
    });

    let tracker = Arc::new(DepositTracker::new(
        listener.clone(),
        LogFilter::new(
            "0x00000000219ab540356cbb839cbe05303d7705fa",
            DEPOSIT_EVENT_TOPIC,
        ),
        pipeline,
        Duration::from_millis(10),
        Duration::from_secs(5),
    ));

    let (tx, rx) = watch::channel(false);
    let handle = {
        let tracker = tracker.clone();
        tokio::spawn(async move { tracker.run(rx).await })
    };

    // Long enough for the first stream to end, the backoff to elapse, and
    // the replacement subscription to deliver.
    tokio::time::sleep(Duration::from_millis(300)).await;
    tx.send(true).unwrap();
    handle.await.unwrap();

    assert!(*listener.subscriptions.lock().unwrap() >= 2);
    assert!(tracker.metrics().reconnections >= 1);

    let mut hashes: Vec<String> = Ledger::read_all(&path)
        .unwrap()
        .into_iter()
        .map(|r| r.transaction_hash)
        .collect();
    hashes.sort();
    // Deliveries from both the dropped and the replacement stream landed.
    assert_eq!(hashes, vec!["0xaaaa".to_string(), "0xbbbb".to_string()]);
}

#[tokio::test]
async fn tracker_processes_batch_and_stops_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deposits.jsonl");
    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = pipeline_with(notifier.clone(), &path);

    let listener = Arc::new(ScriptedListener {
        batches: Mutex::new(vec![
            vec![deposit_log("0xaaaa", "0x0")],
            vec![deposit_log("0xbbbb", "0x1"), {
                let mut removed = deposit_log("0xeeee", "0x2");
                removed.removed = Some(true);
                removed
            }],
        ]),
    });

    let tracker = Arc::new(DepositTracker::new(
        listener,
        LogFilter::new(
            "0x00000000219ab540356cbb839cbe05303d7705fa",
            DEPOSIT_EVENT_TOPIC,
        ),
        pipeline,
        Duration::from_millis(10),
        Duration::from_secs(5),
    ));

    let (tx, rx) = watch::channel(false);
    let handle = {
        let tracker = tracker.clone();
        tokio::spawn(async move { tracker.run(rx).await })
    };

    // Give the tracker time to consume both batches, then shut down.
    tokio::time::sleep(Duration::from_millis(200)).await;
    tx.send(true).unwrap();
    handle.await.unwrap();

    assert_eq!(tracker.state(), TrackerState::Stopped);

    let mut hashes: Vec<String> = Ledger::read_all(&path)
        .unwrap()
        .into_iter()
        .map(|r| r.transaction_hash)
        .collect();
    hashes.sort();
    // The reorg-removed delivery never reaches the ledger.
    assert_eq!(hashes, vec!["0xaaaa".to_string(), "0xbbbb".to_string()]);
    assert_eq!(notifier.sent.lock().unwrap().len(), 2);
    assert_eq!(tracker.metrics().deposits_recorded, 2);
}
