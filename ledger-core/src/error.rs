//! Error types for the economy core

use thiserror::Error;

/// Result type for economy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Economy core errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or out-of-range input, rejected before any write
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced account, item, listing, or copy does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The resource changed between validation and commit
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Primary stock exhausted at commit time
    #[error("Out of stock: {0}")]
    OutOfStock(String),

    /// Declared price no longer matches the authoritative price
    #[error("Price mismatch: {0}")]
    PriceMismatch(String),

    /// Item is not currently purchasable
    #[error("Not for sale: {0}")]
    NotForSale(String),

    /// Ticket balance check failed at commit time
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Bit balance check failed at commit time
    #[error("Insufficient bits: {0}")]
    InsufficientBits(String),

    /// Caller does not own the copy or listing being acted on
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Duplicate purchase of a non-limited item already owned
    #[error("Already owned: {0}")]
    AlreadyOwned(String),

    /// Copy is not owned by the claimed seller
    #[error("Not owned: {0}")]
    NotOwned(String),

    /// A concurrent transfer already moved the copy
    #[error("Already transferred: {0}")]
    AlreadyTransferred(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
