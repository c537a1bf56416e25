//! Error types for the marketplace engine

use thiserror::Error;

/// Result type for marketplace operations
pub type Result<T> = std::result::Result<T, Error>;

/// Marketplace errors
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger error (conflicts, balance failures, missing rows)
    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger_core::Error),

    /// Pricing error
    #[error("Pricing error: {0}")]
    Pricing(#[from] pricing_engine::Error),

    /// Malformed or out-of-range request input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}
