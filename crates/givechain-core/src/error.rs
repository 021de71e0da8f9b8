use thiserror::Error;

use crate::ledger::Amount;

/// Canonical error type exposed by the ledger core.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A required field is missing or carries an out-of-range value.
    #[error("validation failure: {0}")]
    Validation(String),

    /// The referenced entity does not exist in the ledger.
    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: String },

    /// The acting address is not allowed to perform the operation.
    #[error("address {actor} is not authorized for this operation")]
    Unauthorized { actor: String },

    /// The campaign no longer accepts donations.
    #[error("campaign {id} is closed to donations")]
    CampaignClosed { id: String },

    /// The donation is below the campaign's minimum.
    #[error("donation is below the campaign minimum of {minimum} base units")]
    BelowMinimum { minimum: Amount },

    /// A withdrawal would exceed the funds still held by the campaign.
    #[error("only {available} base units are available for withdrawal")]
    InsufficientFunds { available: Amount },

    /// The entity is not in a status that permits the transition.
    #[error("illegal transition from status {from}")]
    InvalidStatus { from: &'static str },

    /// Snapshot file I/O failure.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Snapshot encode/decode failure.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The persisted snapshot does not match its integrity checksum.
    #[error("snapshot checksum mismatch")]
    CorruptSnapshot,
}
