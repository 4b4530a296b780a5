//! Meta record persistence
//!
//! Features:
//! - `{ "meta": MetaSave }` JSON payload
//! - Pluggable storage: file (native), memory (tests), LocalStorage (wasm32)
//! - Missing or corrupt records load as a zeroed default
//! - Best-effort saves; failures are logged and swallowed

pub mod snapshot;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::balance::StartStats;
use crate::meta::{MetaSave, RefundState, build_start_stats};
use crate::sim::RunSummary;

/// LocalStorage key for the meta record
pub const STORAGE_KEY: &str = "survivors_meta_v1";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("storage unavailable")]
    Unavailable,
}

/// Raw string storage for the persisted payload
pub trait MetaStorage {
    /// Stored payload, or `None` when nothing was saved yet
    fn read(&self) -> Result<Option<String>, StorageError>;
    fn write(&mut self, data: &str) -> Result<(), StorageError>;
}

/// On-disk shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistPayload {
    pub meta: MetaSave,
}

/// JSON file on disk; writes go through a temp file and a rename
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetaStorage for FileStorage {
    fn read(&self) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, data: &str) -> Result<(), StorageError> {
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory storage
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: Option<String>,
    /// Simulate an unavailable backend
    pub fail_writes: bool,
}

impl MemoryStorage {
    pub fn with_contents(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            fail_writes: false,
        }
    }

    pub fn contents(&self) -> Option<&str> {
        self.data.as_deref()
    }
}

impl MetaStorage for MemoryStorage {
    fn read(&self) -> Result<Option<String>, StorageError> {
        Ok(self.data.clone())
    }

    fn write(&mut self, data: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Unavailable);
        }
        self.data = Some(data.to_string());
        Ok(())
    }
}

/// Browser LocalStorage
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Default)]
pub struct LocalStorage;

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    fn storage() -> Result<web_sys::Storage, StorageError> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or(StorageError::Unavailable)
    }
}

#[cfg(target_arch = "wasm32")]
impl MetaStorage for LocalStorage {
    fn read(&self) -> Result<Option<String>, StorageError> {
        Self::storage()?
            .get_item(STORAGE_KEY)
            .map_err(|_| StorageError::Unavailable)
    }

    fn write(&mut self, data: &str) -> Result<(), StorageError> {
        Self::storage()?
            .set_item(STORAGE_KEY, data)
            .map_err(|_| StorageError::Unavailable)
    }
}

fn try_load_meta(storage: &dyn MetaStorage) -> Result<Option<MetaSave>, StorageError> {
    let Some(raw) = storage.read()? else {
        return Ok(None);
    };
    let mut payload: PersistPayload = serde_json::from_str(&raw)?;
    payload.meta.normalize();
    Ok(Some(payload.meta))
}

/// Load the meta record; never fails
pub fn load_meta(storage: &dyn MetaStorage) -> MetaSave {
    match try_load_meta(storage) {
        Ok(Some(meta)) => {
            log::info!(
                "Loaded meta ({} shards, {} runs)",
                meta.shards,
                meta.stats.runs
            );
            meta
        }
        Ok(None) => {
            log::info!("No meta record found, starting fresh");
            MetaSave::default()
        }
        Err(e) => {
            log::warn!("Discarding unreadable meta record: {e}");
            MetaSave::default()
        }
    }
}

/// Persist the meta record; failures are logged and swallowed
pub fn save_meta(storage: &mut dyn MetaStorage, meta: &MetaSave) {
    let payload = PersistPayload { meta: meta.clone() };
    let result = serde_json::to_string(&payload)
        .map_err(StorageError::from)
        .and_then(|json| storage.write(&json));
    match result {
        Ok(()) => log::debug!("Meta saved ({} shards)", meta.shards),
        Err(e) => log::warn!("Failed to save meta: {e}"),
    }
}

/// The meta record plus the storage it persists to. Every mutation that
/// changes the record is saved immediately.
#[derive(Debug)]
pub struct MetaLedger<S: MetaStorage> {
    storage: S,
    meta: MetaSave,
}

impl<S: MetaStorage> MetaLedger<S> {
    /// Load from `storage`, falling back to a fresh record
    pub fn open(storage: S) -> Self {
        let meta = load_meta(&storage);
        Self { storage, meta }
    }

    pub fn meta(&self) -> &MetaSave {
        &self.meta
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn start_stats(&self) -> StartStats {
        build_start_stats(&self.meta)
    }

    pub fn save(&mut self) {
        save_meta(&mut self.storage, &self.meta);
    }

    /// Replace the record (e.g. with the copy a finished run merged into)
    pub fn replace(&mut self, meta: MetaSave) {
        self.meta = meta;
        self.save();
    }

    pub fn purchase(&mut self, id: &str) -> bool {
        let ok = self.meta.purchase(id);
        if ok {
            self.save();
        }
        ok
    }

    pub fn refund_all(&mut self) -> u64 {
        let refunded = self.meta.refund_all();
        self.save();
        refunded
    }

    pub fn refund_state(&self) -> RefundState {
        self.meta.refund_state()
    }

    pub fn reset(&mut self) {
        self.meta.reset();
        self.save();
    }

    pub fn record_run(&mut self, summary: &RunSummary) {
        self.meta.record_run(summary);
        self.save();
    }
}
