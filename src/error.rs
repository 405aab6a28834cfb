use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error kinds surfaced by the ledger core.
///
/// Callers map these to their transport of choice; the split between
/// "resource missing", "rule violated" and "insufficient funds" is part of the
/// API contract. Unclassified failures are wrapped in `Internal` rather than
/// propagated raw.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("owner not found: id {0}")]
    OwnerNotFound(u64),
    #[error("card not found: {0}")]
    CardNotFound(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("{0}")]
    BusinessRule(String),
    #[error("{0}")]
    TransferRule(String),
    #[error("insufficient funds on card {0}")]
    InsufficientFunds(u64),
    #[error("card number crypto failure: {0}")]
    Crypto(String),
    #[error("storage conflict: {0}")]
    Conflict(String),
    #[error("malformed operation: {0}")]
    Malformed(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(err: rocksdb::Error) -> Self {
        LedgerError::Internal(Box::new(err))
    }
}
