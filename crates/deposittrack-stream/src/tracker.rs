//! `DepositTracker` — the subscription manager.
//!
//! Owns the live log stream and drives every delivered log through the
//! pipeline in its own task, so one slow enrichment never stalls ingestion
//! of the next log. No record-level failure terminates the stream loop.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use deposittrack_codec::DepositDecoder;
use deposittrack_core::error::DecodeError;
use deposittrack_core::types::{LogFilter, RawLog};
use deposittrack_notify::{deposit_message, Notifier};
use deposittrack_store::Ledger;

use crate::enrich::Enricher;
use crate::listener::LogListener;

/// Lifecycle of the subscription connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// Not yet connected.
    Disconnected,
    /// Registering the log filter with the provider.
    Subscribing,
    /// Receiving live deliveries.
    Streaming,
    /// Lost the stream; backing off before re-subscribing.
    Reconnecting,
    /// Shut down; no further deliveries are accepted.
    Stopped,
}

impl std::fmt::Display for TrackerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Subscribing => write!(f, "subscribing"),
            Self::Streaming => write!(f, "streaming"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Counters snapshot for observability.
#[derive(Debug, Clone, Default)]
pub struct TrackerMetrics {
    pub deposits_recorded: u64,
    pub schema_mismatches: u64,
    pub decode_failures: u64,
    pub enrich_failures: u64,
    pub store_failures: u64,
    pub notify_failures: u64,
    pub reconnections: u64,
}

/// The per-record pipeline: Codec → Enricher → Store → Notifier.
///
/// Stages run strictly in that order. The ledger append is the durability
/// boundary: notification only happens for committed records, and its
/// failure is swallowed after logging.
pub struct Pipeline {
    decoder: DepositDecoder,
    enricher: Enricher,
    ledger: Arc<Ledger>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<Mutex<TrackerMetrics>>,
}

impl Pipeline {
    pub fn new(
        enricher: Enricher,
        ledger: Arc<Ledger>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            decoder: DepositDecoder::new(),
            enricher,
            ledger,
            notifier,
            metrics: Arc::new(Mutex::new(TrackerMetrics::default())),
        }
    }

    /// Snapshot of the pipeline counters.
    pub fn metrics(&self) -> TrackerMetrics {
        self.metrics.lock().unwrap().clone()
    }

    /// Drive one raw log through all stages.
    pub async fn process(&self, log: RawLog) {
        let event = match self.decoder.decode(&log) {
            Ok(event) => event,
            Err(DecodeError::SchemaMismatch { topic0 }) => {
                // Not this contract's event — discard quietly.
                debug!(%topic0, tx_hash = %log.tx_hash, "schema mismatch, discarding log");
                self.metrics.lock().unwrap().schema_mismatches += 1;
                return;
            }
            Err(e) => {
                // Right event signature, broken payload — worth a louder
                // count than a foreign event.
                warn!(error = %e, tx_hash = %log.tx_hash, "undecodable log, discarding");
                self.metrics.lock().unwrap().decode_failures += 1;
                return;
            }
        };

        let record = match self.enricher.enrich(&event, &log).await {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    error = %e,
                    tx_hash = %log.tx_hash,
                    block = log.block_number_u64(),
                    "enrichment failed, discarding this delivery"
                );
                self.metrics.lock().unwrap().enrich_failures += 1;
                return;
            }
        };

        if let Err(e) = self.ledger.append(&record) {
            // Data loss for this record: log loudly with enough context for
            // manual backfill. The stream loop keeps running.
            error!(
                error = %e,
                tx_hash = %record.transaction_hash,
                block = record.block_number,
                "ledger append failed, record lost"
            );
            self.metrics.lock().unwrap().store_failures += 1;
            return;
        }
        self.metrics.lock().unwrap().deposits_recorded += 1;

        info!(
            block = record.block_number,
            tx_hash = %record.transaction_hash,
            fee_wei = %record.fee_wei,
            pubkey = %record.pubkey,
            "new deposit recorded"
        );

        // Best-effort: the record is already durable, a failed notification
        // is simply lost.
        if let Err(e) = self.notifier.send(&deposit_message(&record)).await {
            warn!(error = %e, tx_hash = %record.transaction_hash, "notification failed");
            self.metrics.lock().unwrap().notify_failures += 1;
        }
    }
}

/// Subscription manager: connects, re-subscribes after disconnects, and
/// fans deliveries out to pipeline tasks.
pub struct DepositTracker {
    listener: Arc<dyn LogListener>,
    filter: LogFilter,
    pipeline: Arc<Pipeline>,
    initial_backoff: Duration,
    drain_timeout: Duration,
    state: Mutex<TrackerState>,
    reconnections: Mutex<u64>,
}

impl DepositTracker {
    pub fn new(
        listener: Arc<dyn LogListener>,
        filter: LogFilter,
        pipeline: Arc<Pipeline>,
        initial_backoff: Duration,
        drain_timeout: Duration,
    ) -> Self {
        Self {
            listener,
            filter,
            pipeline,
            initial_backoff,
            drain_timeout,
            state: Mutex::new(TrackerState::Disconnected),
            reconnections: Mutex::new(0),
        }
    }

    pub fn state(&self) -> TrackerState {
        *self.state.lock().unwrap()
    }

    /// Pipeline counters plus reconnection count.
    pub fn metrics(&self) -> TrackerMetrics {
        let mut m = self.pipeline.metrics();
        m.reconnections = *self.reconnections.lock().unwrap();
        m
    }

    fn set_state(&self, state: TrackerState) {
        *self.state.lock().unwrap() = state;
        debug!(%state, "tracker state change");
    }

    fn note_reconnection(&self) {
        *self.reconnections.lock().unwrap() += 1;
    }

    /// Run until `shutdown` fires. Reconnects with exponential backoff on
    /// stream loss; on shutdown, stops accepting deliveries and drains
    /// in-flight records for at most the configured grace period.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let max_backoff = Duration::from_secs(60);
        let mut backoff = self.initial_backoff;
        let mut tasks: JoinSet<()> = JoinSet::new();

        'outer: loop {
            self.set_state(TrackerState::Subscribing);
            let stream = tokio::select! {
                _ = shutdown.changed() => break 'outer,
                result = self.listener.subscribe(&self.filter) => result,
            };

            let mut stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    error!(error = %e, "subscribe failed");
                    self.note_reconnection();
                    self.set_state(TrackerState::Reconnecting);
                    tokio::select! {
                        _ = shutdown.changed() => break 'outer,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(max_backoff);
                    continue;
                }
            };

            self.set_state(TrackerState::Streaming);
            info!(address = %self.filter.address, "subscribed to deposit events");
            backoff = self.initial_backoff;

            loop {
                tokio::select! {
                    _ = shutdown.changed() => break 'outer,
                    delivery = stream.next() => match delivery {
                        None => {
                            warn!("subscription stream ended");
                            break;
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "subscription stream error");
                            break;
                        }
                        Some(Ok(logs)) => {
                            for log in logs {
                                if log.is_removed() {
                                    debug!(tx_hash = %log.tx_hash, "skipping removed log");
                                    continue;
                                }
                                let pipeline = Arc::clone(&self.pipeline);
                                tasks.spawn(async move { pipeline.process(log).await });
                            }
                            // Reap whatever already finished.
                            while tasks.try_join_next().is_some() {}
                        }
                    }
                }
            }

            self.note_reconnection();
            self.set_state(TrackerState::Reconnecting);
            tokio::select! {
                _ = shutdown.changed() => break 'outer,
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(max_backoff);
        }

        // Drain in-flight records so decoded-and-enriched deposits reach the
        // ledger before exit; give up after the grace period.
        info!(in_flight = tasks.len(), "shutting down, draining pipeline tasks");
        let drain = async {
            while tasks.join_next().await.is_some() {}
        };
        if tokio::time::timeout(self.drain_timeout, drain).await.is_err() {
            warn!("drain timed out, aborting remaining pipeline tasks");
        }
        self.set_state(TrackerState::Stopped);
    }
}
