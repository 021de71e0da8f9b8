use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ledger::Amount;
use crate::netsim::SettlementReceipt;

/// Derive the content hash identifying a transaction.
///
/// The four fields are joined with `:` into a single pre-image and hashed
/// with SHA-256; the digest is returned as lowercase hex. Identical inputs
/// (including the timestamp) always yield the identical digest. This is a
/// deterministic identifier, not a cryptographic commitment: every input
/// is guessable.
pub fn transaction_hash(
    sender: &str,
    recipient: &str,
    amount: Amount,
    timestamp_ms: u64,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{sender}:{recipient}:{amount}:{timestamp_ms}").as_bytes());
    hex::encode(hasher.finalize())
}

/// Recompute the digest from the supplied fields and compare for exact
/// equality with `hash`.
pub fn verify_transaction_hash(
    hash: &str,
    sender: &str,
    recipient: &str,
    amount: Amount,
    timestamp_ms: u64,
) -> bool {
    transaction_hash(sender, recipient, amount, timestamp_ms) == hash
}

/// Settlement status of a transaction record.
///
/// The mock layer models no pending or failed state: a record is confirmed
/// by construction.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Confirmed,
}

/// A recorded donation or withdrawal event, keyed by its derived hash.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub hash: String,
    pub sender: String,
    pub recipient: String,
    pub amount: Amount,
    pub campaign_id: String,
    pub timestamp_ms: u64,
    pub status: TxStatus,
    /// Synthetic, assigned once at submission; never changes after.
    pub block_number: u64,
    pub confirmations: u32,
}

impl TransactionRecord {
    /// Stamp the supplied time, compute the hash, and package the record.
    ///
    /// `block_number` and `confirmations` stay zero until the record is
    /// sealed with a settlement receipt.
    pub fn build(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: Amount,
        campaign_id: impl Into<String>,
        timestamp_ms: u64,
    ) -> Self {
        let sender = sender.into();
        let recipient = recipient.into();
        let hash = transaction_hash(&sender, &recipient, amount, timestamp_ms);
        Self {
            hash,
            sender,
            recipient,
            amount,
            campaign_id: campaign_id.into(),
            timestamp_ms,
            status: TxStatus::Confirmed,
            block_number: 0,
            confirmations: 0,
        }
    }

    /// Copy the synthetic settlement fields onto the record.
    pub fn seal(&mut self, receipt: &SettlementReceipt) {
        self.block_number = receipt.block_number;
        self.confirmations = receipt.confirmations;
    }

    /// Recompute the hash from the record's own fields and compare.
    pub fn hash_matches(&self) -> bool {
        verify_transaction_hash(
            &self.hash,
            &self.sender,
            &self.recipient,
            self.amount,
            self.timestamp_ms,
        )
    }
}
