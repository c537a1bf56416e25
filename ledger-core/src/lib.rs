//! Plaza Economy Core
//!
//! Double-entry virtual-currency ledger and serialized-item inventory for the
//! platform marketplace.
//!
//! # Architecture
//!
//! - **Single Writer**: one actor task serializes every mutating command
//! - **Atomic Commits**: each command stages all row changes into one
//!   RocksDB `WriteBatch`
//! - **Re-validation**: contested state (stock, listings, balances) is
//!   re-checked inside the command, so races resolve to at most one winner
//!
//! # Invariants
//!
//! - Currency conservation: every transfer writes a balanced debit/credit pair
//! - Balances never go negative (checked debit on unsigned integers)
//! - `stock + quantity_sold == original_stock` for every limited item
//! - Transaction rows are append-only, never modified or deleted

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod actor;
pub mod config;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod metrics;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use inventory::Inventory;
pub use ledger::Ledger;
pub use storage::Storage;
pub use types::{
    Account, AccountId, BadgeGrant, BadgeKind, CatalogItem, ConversionOutcome, Currency,
    DonationOutcome, Item, LimitedItem, OwnedStack, OwnershipCopy, PurchaseOutcome, ResaleListing,
    SaleSample, Transaction, TransferDirection, TransferKind,
};
