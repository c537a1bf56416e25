//! Error types for the badge awarder

use thiserror::Error;

/// Badge awarder error
#[derive(Debug, Error)]
pub enum Error {
    /// Ledger error
    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger_core::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
