use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::LedgerError;
use crate::ledger::{Address, Campaign, LedgerEvent, WithdrawalRequest};
use crate::transaction::TransactionRecord;

/// Point-in-time serialization of the whole ledger.
///
/// The `campaigns`, `transactions`, and `connectedWallet` keys keep the
/// names of the original persisted layout; `withdrawals`, `events`, and
/// `checksum` extend it. Session fields (wallet, events) stay outside the
/// integrity digest.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerSnapshot {
    pub campaigns: Vec<Campaign>,
    pub transactions: Vec<TransactionRecord>,
    pub withdrawals: Vec<WithdrawalRequest>,
    pub events: Vec<LedgerEvent>,
    pub connected_wallet: Option<Address>,
    pub checksum: Option<String>,
}

impl LedgerSnapshot {
    /// Chained SHA-256 over the entity collections, hex encoded.
    pub fn digest(&self) -> Result<String, LedgerError> {
        let mut hasher = Sha256::new();
        hasher.update(b"campaigns");
        hasher.update(serde_json::to_vec(&self.campaigns)?);
        hasher.update(b"transactions");
        hasher.update(serde_json::to_vec(&self.transactions)?);
        hasher.update(b"withdrawals");
        hasher.update(serde_json::to_vec(&self.withdrawals)?);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Verify the stored checksum, if one is present.
    pub fn verify_checksum(&self) -> Result<(), LedgerError> {
        if let Some(stored) = &self.checksum {
            if *stored != self.digest()? {
                return Err(LedgerError::CorruptSnapshot);
            }
        }
        Ok(())
    }
}

/// Pluggable persistence behind the ledger, so handlers receive a store
/// instead of reaching for process-wide state.
pub trait SnapshotStore {
    fn load(&self) -> Result<LedgerSnapshot, LedgerError>;
    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), LedgerError>;
}

/// File-backed JSON store.
///
/// A missing file loads as the empty snapshot; the file is created on
/// first save and never explicitly torn down.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<LedgerSnapshot, LedgerError> {
        if !self.path.exists() {
            return Ok(LedgerSnapshot::default());
        }
        let bytes = fs::read(&self.path)?;
        let snapshot: LedgerSnapshot = serde_json::from_slice(&bytes)?;
        snapshot.verify_checksum()?;
        Ok(snapshot)
    }

    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), LedgerError> {
        let mut stamped = snapshot.clone();
        stamped.checksum = Some(stamped.digest()?);
        let json = serde_json::to_vec_pretty(&stamped)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// In-memory store double for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStore {
    inner: RefCell<LedgerSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<LedgerSnapshot, LedgerError> {
        Ok(self.inner.borrow().clone())
    }

    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), LedgerError> {
        *self.inner.borrow_mut() = snapshot.clone();
        Ok(())
    }
}
