//! # Processed Matches Ledger
//!
//! Set of match ids whose result has been confirmed on-chain. A match id enters
//! the ledger only after a confirmed submission and never leaves it, which is
//! what keeps the oracle from settling the same match twice.
//!
//! The in-memory set is authoritative for the running process. An optional
//! [`LedgerStore`] makes it survive restarts:
//!
//! - `memory`: nothing persisted (default)
//! - `file`: JSON file rewritten atomically on every insert ([`JsonFileStore`])
//! - `postgres`: `oracle.processed_matches` table ([`crate::database::PgLedgerStore`])

use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

use crate::error::LedgerError;
use crate::match_result::{MatchId, SubmissionReceipt};
use crate::settings::{Ledger as LedgerSettings, LedgerBackend};

/// Durable backing for the ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn load(&self) -> Result<HashSet<MatchId>, LedgerError>;
    async fn record(&self, receipt: &SubmissionReceipt) -> Result<(), LedgerError>;
}

pub struct ProcessedMatchesLedger {
    processed: RwLock<HashSet<MatchId>>,
    store: Option<Arc<dyn LedgerStore>>,
}

impl Default for ProcessedMatchesLedger {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl ProcessedMatchesLedger {
    pub fn in_memory() -> Self {
        Self {
            processed: RwLock::new(HashSet::new()),
            store: None,
        }
    }

    /// Loads previously processed ids from `store`.
    pub async fn with_store(store: Arc<dyn LedgerStore>) -> Result<Self, LedgerError> {
        let processed = store.load().await?;
        info!("📒 Ledger loaded with {} processed match(es)", processed.len());
        crate::metrics::set_ledger_size(processed.len());
        Ok(Self {
            processed: RwLock::new(processed),
            store: Some(store),
        })
    }

    /// Builds the ledger for the configured backend.
    pub async fn from_settings(settings: &LedgerSettings) -> anyhow::Result<Self> {
        match settings.backend {
            LedgerBackend::Memory => Ok(Self::in_memory()),
            LedgerBackend::File => {
                let store = JsonFileStore::new(&settings.path);
                Ok(Self::with_store(Arc::new(store)).await?)
            }
            LedgerBackend::Postgres => {
                let pool = crate::database::connect().await?;
                let store = crate::database::PgLedgerStore::new(pool);
                Ok(Self::with_store(Arc::new(store)).await?)
            }
        }
    }

    pub fn contains(&self, match_id: MatchId) -> bool {
        self.read().contains(&match_id)
    }

    /// Marks a confirmed submission as processed. Returns `Ok(false)` if the
    /// match was already in the ledger.
    ///
    /// The in-memory mark happens even if the store write fails, so the
    /// running process never resubmits a confirmed match.
    pub async fn mark_submitted(&self, receipt: &SubmissionReceipt) -> Result<bool, LedgerError> {
        let (inserted, size) = {
            let mut processed = self
                .processed
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            (processed.insert(receipt.match_id), processed.len())
        };
        if !inserted {
            return Ok(false);
        }
        crate::metrics::set_ledger_size(size);

        if let Some(store) = &self.store {
            store.record(receipt).await?;
        }
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Processed ids in ascending order.
    pub fn snapshot(&self) -> Vec<MatchId> {
        let mut ids: Vec<MatchId> = self.read().iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashSet<MatchId>> {
        self.processed
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub match_id: MatchId,
    pub transaction_id: String,
    pub block_number: Option<u64>,
    /// Unix seconds.
    pub recorded_at: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    processed: Vec<LedgerEntry>,
}

/// JSON file store. Each insert rewrites the whole file through a temp file
/// and a rename, so a crash leaves either the old or the new contents.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<Option<Vec<LedgerEntry>>>,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            entries: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice::<LedgerFile>(&bytes)?.processed),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_entries(&self, entries: &[LedgerEntry]) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(&LedgerFileRef { processed: entries })?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct LedgerFileRef<'a> {
    processed: &'a [LedgerEntry],
}

#[async_trait]
impl LedgerStore for JsonFileStore {
    async fn load(&self) -> Result<HashSet<MatchId>, LedgerError> {
        let entries = self.read_entries().await?;
        let ids = entries.iter().map(|e| e.match_id).collect();
        *self.entries.lock().await = Some(entries);
        Ok(ids)
    }

    async fn record(&self, receipt: &SubmissionReceipt) -> Result<(), LedgerError> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_entries().await?);
        }
        let entries = guard.get_or_insert_with(Vec::new);
        if entries.iter().any(|e| e.match_id == receipt.match_id) {
            return Ok(());
        }
        entries.push(LedgerEntry {
            match_id: receipt.match_id,
            transaction_id: receipt.transaction_id.clone(),
            block_number: receipt.block_number,
            recorded_at: Utc::now().timestamp(),
        });
        if let Err(e) = self.write_entries(entries).await {
            warn!("⚠️ Failed to persist ledger to {}: {}", self.path.display(), e);
            return Err(e);
        }
        Ok(())
    }
}
