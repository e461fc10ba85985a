//! Durable single-slot ledger storage.
//!
//! The ledger lives under one fixed key as a JSON array of epoch-millisecond
//! timestamps. Reads are tolerant: a missing, unreadable, or non-parseable
//! slot is treated as an empty ledger, never as a failure — losing the quota
//! history is recoverable, refusing admissions because of a corrupt file is
//! not.

use std::path::{Path, PathBuf};

use medialink_core::errors::StorageError;
use parking_lot::Mutex;

/// File name of the ledger slot under the data directory.
const LEDGER_FILE_NAME: &str = "request_ledger.json";

/// Get the ledger file path under the given data directory.
#[must_use]
pub fn ledger_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(LEDGER_FILE_NAME)
}

/// One durable slot holding the admission-timestamp ledger.
///
/// Reads and writes are synchronous from the caller's perspective.
pub trait LedgerStore: Send + Sync {
    /// Load the ledger. Missing or corrupt content loads as empty.
    fn load(&self) -> Vec<i64>;

    /// Persist the ledger, replacing the previous contents.
    fn save(&self, ledger: &[i64]) -> Result<(), StorageError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// JsonFileStore
// ─────────────────────────────────────────────────────────────────────────────

/// File-backed ledger slot.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store at an explicit file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store at the default slot under `data_dir`.
    #[must_use]
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(ledger_file_path(data_dir))
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Vec<i64> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!("failed to read ledger file: {e}");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<i64>>(&data) {
            Ok(ledger) => ledger,
            Err(e) => {
                tracing::warn!("failed to parse ledger file, treating as empty: {e}");
                Vec::new()
            }
        }
    }

    fn save(&self, ledger: &[i64]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(ledger)?;
        std::fs::write(&self.path, &json)?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MemoryStore
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory ledger slot for tests and ephemeral setups.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ledger: Mutex<Vec<i64>>,
}

impl MemoryStore {
    /// Create an empty in-memory slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Vec<i64> {
        self.ledger.lock().clone()
    }

    fn save(&self, ledger: &[i64]) -> Result<(), StorageError> {
        *self.ledger.lock() = ledger.to_vec();
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
