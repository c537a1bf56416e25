//! Marketplace Engine
//!
//! Orchestrates buy, sell, cancel, and donate requests over the economy core.
//!
//! # Flow
//!
//! 1. **Validate**: malformed input is rejected before anything is written
//! 2. **Price**: the pricing engine derives the authoritative price from
//!    committed state; the client's declared price only guards staleness
//! 3. **Commit**: one atomic command into the ledger's single-writer actor
//!    moves stock, ownership, listings, and balances together or not at all
//! 4. **Notify**: completion events go to the badge awarder fire-and-forget
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use marketplace::{MarketConfig, MarketplaceEngine};
//!
//! #[tokio::main]
//! async fn main() -> marketplace::Result<()> {
//!     let ledger = Arc::new(ledger_core::Ledger::open(ledger_core::Config::default()).await?);
//!     let (events, _stream) = badge_awarder::channel(256);
//!     let market = MarketplaceEngine::new(ledger, MarketConfig::default(), events)?;
//!
//!     let price = market.current_price(uuid::Uuid::new_v4())?;
//!     println!("current price: {:?}", price);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod engine;
pub mod error;
pub mod types;

// Re-exports
pub use config::MarketConfig;
pub use engine::MarketplaceEngine;
pub use error::{Error, Result};
pub use types::{DonationReceipt, ListingReceipt, PurchaseReceipt};
