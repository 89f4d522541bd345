//! Append-only deposit ledger.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use deposittrack_core::error::StoreError;
use deposittrack_core::types::EnrichedRecord;

/// Append-only JSON-Lines ledger of enriched deposit records.
///
/// Appends are serialized through an internal mutex: one full line per
/// record, written with a single `write_all` and flushed, so concurrent
/// pipeline tasks never interleave bytes of two records.
///
/// The ledger does not deduplicate: if the subscription redelivers a log
/// after a reconnect, the record appears twice. Readers that need
/// uniqueness should key by `(transactionHash, logIndex)`.
pub struct Ledger {
    path: PathBuf,
    file: Mutex<File>,
}

impl Ledger {
    /// Open (or create) the ledger at `path`, creating parent directories
    /// as needed. Existing records are preserved; new records append.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically append one record as a single ledger line.
    ///
    /// Disk-full and permission errors propagate as `StoreError`; the caller
    /// decides whether to abort this record. A failed append never corrupts
    /// previously committed lines.
    pub fn append(&self, record: &EnrichedRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = self.file.lock().unwrap();
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Read back every committed record.
    ///
    /// Tolerant of a torn tail: a final line that fails to parse (interrupted
    /// write) is skipped with a warning rather than invalidating the ledger.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<EnrichedRecord>, StoreError> {
        let file = match File::open(path.as_ref()) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<EnrichedRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unparseable ledger line");
                }
            }
        }
        Ok(records)
    }
}
