//! Main ledger orchestration layer
//!
//! This module ties together storage, metrics, and actor components into a
//! high-level API for the platform economy: account registration, double-entry
//! transfers, bits conversion, item publication, and the atomic purchase /
//! listing / donation primitives the marketplace engine drives.
//!
//! # Example
//!
//! ```no_run
//! use ledger_core::{Config, Ledger};
//!
//! #[tokio::main]
//! async fn main() -> ledger_core::Result<()> {
//!     let config = Config::default();
//!     let ledger = Ledger::open(config).await?;
//!
//!     let alice = ledger.create_account("alice", 500, 0).await?;
//!     println!("opened account {} with {} tickets", alice.id, alice.ticket_balance);
//!
//!     ledger.shutdown().await?;
//!     Ok(())
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    inventory::Inventory,
    metrics::Metrics,
    storage::StorageStats,
    types::{
        Account, AccountId, BadgeGrant, BadgeKind, ConversionOutcome, Currency, DonationOutcome,
        Item, PurchaseOutcome, ResaleListing, SaleSample, Transaction, TransferKind,
    },
    Config, Error, Result, Storage,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Main economy ledger interface
pub struct Ledger {
    /// Actor handle for mutations
    handle: LedgerHandle,

    /// Direct storage access (for reads)
    storage: Arc<Storage>,

    /// Metrics recorder shared with the actor
    metrics: Metrics,
}

impl Ledger {
    /// Open ledger with configuration
    pub async fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);
        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("failed to build metrics: {}", e)))?;

        let handle = spawn_ledger_actor(storage.clone(), config.mailbox_capacity, metrics.clone());

        Ok(Self {
            handle,
            storage,
            metrics,
        })
    }

    /// Inventory view over the same store and writer
    pub fn inventory(&self) -> Inventory {
        Inventory::new(self.handle.clone(), self.storage.clone())
    }

    // Mutations. Input validation happens here, before dispatch; the actor
    // re-validates contested state inside the atomic unit.

    /// Register a new account with initial balances
    pub async fn create_account(
        &self,
        id: impl Into<String>,
        tickets: u64,
        bits: u64,
    ) -> Result<Account> {
        let account = Account::new(AccountId::new(id), tickets, bits);
        self.handle.create_account(account.clone()).await?;
        Ok(account)
    }

    /// Publish a catalog or limited item
    pub async fn publish_item(&self, item: Item) -> Result<()> {
        self.handle.publish_item(item).await
    }

    /// Move currency between two accounts with double-entry bookkeeping
    #[allow(clippy::too_many_arguments)]
    pub async fn transfer(
        &self,
        amount: u64,
        currency: Currency,
        from: AccountId,
        to: AccountId,
        kind: TransferKind,
        item_id: Option<Uuid>,
        description: impl Into<String>,
    ) -> Result<Uuid> {
        if amount == 0 {
            return Err(Error::Validation("transfer amount must be positive".to_string()));
        }
        if from == to {
            return Err(Error::Validation("self-transfer is not allowed".to_string()));
        }

        self.handle
            .transfer(amount, currency, from, to, kind, item_id, description.into())
            .await
    }

    /// Convert an account's full bit balance to tickets at the fixed block rate
    pub async fn convert_bits_to_tickets(&self, account: AccountId) -> Result<ConversionOutcome> {
        self.handle.convert_bits(account).await
    }

    /// Donate tickets; bumps the donor's donation count atomically
    pub async fn donate(
        &self,
        from: AccountId,
        to: AccountId,
        amount: u64,
    ) -> Result<DonationOutcome> {
        if amount == 0 {
            return Err(Error::Validation("donation amount must be positive".to_string()));
        }
        if from == to {
            return Err(Error::Validation("self-donation is not allowed".to_string()));
        }

        self.handle.donate(from, to, amount).await
    }

    /// Primary-market purchase (limited stock path or catalog path)
    pub async fn purchase(
        &self,
        buyer: AccountId,
        item_id: Uuid,
        declared_price: u64,
    ) -> Result<PurchaseOutcome> {
        self.handle.purchase(buyer, item_id, declared_price).await
    }

    /// Purchase of an active resale listing
    pub async fn resale_purchase(
        &self,
        buyer: AccountId,
        listing_id: Uuid,
        declared_price: u64,
    ) -> Result<PurchaseOutcome> {
        self.handle
            .resale_purchase(buyer, listing_id, declared_price)
            .await
    }

    /// Create a resale listing for an owned serial
    pub async fn create_listing(
        &self,
        seller: AccountId,
        item_id: Uuid,
        serial: u64,
        price: u64,
    ) -> Result<ResaleListing> {
        self.handle.create_listing(seller, item_id, serial, price).await
    }

    /// Cancel an active resale listing
    pub async fn cancel_listing(&self, seller: AccountId, listing_id: Uuid) -> Result<()> {
        self.handle.cancel_listing(seller, listing_id).await
    }

    /// Grant a one-time badge; returns true when newly granted
    pub async fn grant_badge(&self, account: AccountId, kind: BadgeKind) -> Result<bool> {
        self.handle.grant_badge(account, kind).await
    }

    // Reads. These go straight to storage and observe only committed state.

    /// Get account by ID
    pub fn account(&self, id: &AccountId) -> Result<Account> {
        self.storage.get_account(id)
    }

    /// Get item by ID
    pub fn item(&self, id: Uuid) -> Result<Item> {
        self.storage.get_item(id)
    }

    /// Get listing by ID
    pub fn listing(&self, id: Uuid) -> Result<ResaleListing> {
        self.storage.get_listing(id)
    }

    /// Active listings for an item, cheapest first
    pub fn listings_for_item(&self, item_id: Uuid) -> Result<Vec<ResaleListing>> {
        self.storage.listings_for_item(item_id)
    }

    /// Completed sales of an item at or after `since`, oldest first
    pub fn sale_history(&self, item_id: Uuid, since: DateTime<Utc>) -> Result<Vec<SaleSample>> {
        self.storage.sales_for_item_since(item_id, since)
    }

    /// Transaction legs recorded for an account, oldest first
    pub fn transactions_for_account(&self, account: &AccountId) -> Result<Vec<Transaction>> {
        self.storage.transactions_for_account(account)
    }

    /// Get badge grant, if present
    pub fn badge(&self, account: &AccountId, kind: BadgeKind) -> Result<Option<BadgeGrant>> {
        self.storage.get_badge(account, kind)
    }

    /// Sum of all ticket and bit balances across every account.
    ///
    /// Transfers conserve currency, so the ticket total is invariant across
    /// any sequence of transfers; only conversions move value between the
    /// two totals, and only at the fixed block rate.
    pub fn total_balances(&self) -> Result<(u64, u64)> {
        let mut tickets = 0u64;
        let mut bits = 0u64;
        for account in self.storage.scan_accounts()? {
            tickets += account.ticket_balance;
            bits += account.bit_balance;
        }
        Ok((tickets, bits))
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.get_stats()
    }

    /// Metrics recorder
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Shutdown ledger
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}
