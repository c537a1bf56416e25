//! Actor-based concurrency for the economy core
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One logical writer task serializes every mutating command
//! - Each command re-validates contested state (stock, listings, balances)
//!   at execution time, stages all row changes into one `WriteBatch`, and
//!   commits atomically
//! - Async message passing with backpressure via a bounded mailbox
//!
//! Racing callers are therefore resolved to at most one winner per contested
//! resource: the loser's command runs after the winner's commit, observes the
//! new state, and fails with `Conflict`/`OutOfStock` before staging anything.

use crate::{
    metrics::Metrics,
    types::{
        Account, AccountId, BadgeGrant, BadgeKind, ConversionOutcome, Currency, DonationOutcome,
        Item, OwnershipCopy, PurchaseOutcome, ResaleListing, SaleSample, Transaction,
        TransferDirection, TransferKind, BITS_PER_BLOCK,
    },
    Error, Result, Storage,
};
use chrono::Utc;
use rocksdb::WriteBatch;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Message sent to the economy actor
pub enum LedgerMessage {
    /// Register a new account
    CreateAccount {
        /// Account to insert
        account: Account,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Publish a catalog or limited item
    PublishItem {
        /// Item to insert
        item: Item,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Move currency between two accounts
    Transfer {
        /// Amount to move, must be positive
        amount: u64,
        /// Currency to settle in
        currency: Currency,
        /// Paying account
        from: AccountId,
        /// Receiving account
        to: AccountId,
        /// Movement kind
        kind: TransferKind,
        /// Item sold, for sale transfers
        item_id: Option<Uuid>,
        /// Human-readable description
        description: String,
        /// Response channel
        response: oneshot::Sender<Result<Uuid>>,
    },

    /// Convert an account's full bit balance to tickets
    ConvertBits {
        /// Converting account
        account: AccountId,
        /// Response channel
        response: oneshot::Sender<Result<ConversionOutcome>>,
    },

    /// Primary-market purchase (limited stock path or catalog path)
    Purchase {
        /// Buying account
        buyer: AccountId,
        /// Item to buy
        item_id: Uuid,
        /// Price the client saw; must match the authoritative price
        declared_price: u64,
        /// Response channel
        response: oneshot::Sender<Result<PurchaseOutcome>>,
    },

    /// Purchase of an active resale listing
    ResalePurchase {
        /// Buying account
        buyer: AccountId,
        /// Listing to consume
        listing_id: Uuid,
        /// Price the client saw; must still match the listing price
        declared_price: u64,
        /// Response channel
        response: oneshot::Sender<Result<PurchaseOutcome>>,
    },

    /// Create a resale listing for an owned serial
    CreateListing {
        /// Selling account
        seller: AccountId,
        /// Item the copy belongs to
        item_id: Uuid,
        /// Owned copy serial
        serial: u64,
        /// Asking price in tickets
        price: u64,
        /// Response channel
        response: oneshot::Sender<Result<ResaleListing>>,
    },

    /// Cancel an active resale listing
    CancelListing {
        /// Cancelling account; must own the listing
        seller: AccountId,
        /// Listing to delete
        listing_id: Uuid,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Donate tickets and bump the donor's donation count
    Donate {
        /// Donating account
        from: AccountId,
        /// Receiving account
        to: AccountId,
        /// Amount in tickets
        amount: u64,
        /// Response channel
        response: oneshot::Sender<Result<DonationOutcome>>,
    },

    /// Grant a serialized copy outside the purchase path
    GrantCopy {
        /// Receiving account
        owner: AccountId,
        /// Item the copy belongs to
        item_id: Uuid,
        /// Copy serial
        serial: u64,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Reassign a serialized copy between accounts
    TransferCopy {
        /// Item the copy belongs to
        item_id: Uuid,
        /// Copy serial
        serial: u64,
        /// Claimed current owner
        from: AccountId,
        /// New owner
        to: AccountId,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Grant a one-time badge; no-op if already granted
    GrantBadge {
        /// Recognized account
        account: AccountId,
        /// Badge kind
        kind: BadgeKind,
        /// Response channel; true when the grant was newly inserted
        response: oneshot::Sender<Result<bool>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes economy commands
pub struct LedgerActor {
    /// Storage backend
    storage: Arc<Storage>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,

    /// Metrics recorder
    metrics: Metrics,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        mailbox: mpsc::Receiver<LedgerMessage>,
        metrics: Metrics,
    ) -> Self {
        Self {
            storage,
            mailbox,
            metrics,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Shutdown => break,
                msg => self.handle_message(msg),
            }
        }
        tracing::debug!("Economy actor stopped");
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: LedgerMessage) {
        let timer = self.metrics.commit_duration.start_timer();

        match msg {
            LedgerMessage::CreateAccount { account, response } => {
                let _ = response.send(self.handle_create_account(account));
            }
            LedgerMessage::PublishItem { item, response } => {
                let _ = response.send(self.handle_publish_item(item));
            }
            LedgerMessage::Transfer {
                amount,
                currency,
                from,
                to,
                kind,
                item_id,
                description,
                response,
            } => {
                let result =
                    self.handle_transfer(amount, currency, from, to, kind, item_id, description);
                self.observe(&result);
                let _ = response.send(result);
            }
            LedgerMessage::ConvertBits { account, response } => {
                let _ = response.send(self.handle_convert_bits(account));
            }
            LedgerMessage::Purchase {
                buyer,
                item_id,
                declared_price,
                response,
            } => {
                let result = self.handle_purchase(buyer, item_id, declared_price);
                self.observe(&result);
                let _ = response.send(result);
            }
            LedgerMessage::ResalePurchase {
                buyer,
                listing_id,
                declared_price,
                response,
            } => {
                let result = self.handle_resale_purchase(buyer, listing_id, declared_price);
                self.observe(&result);
                let _ = response.send(result);
            }
            LedgerMessage::CreateListing {
                seller,
                item_id,
                serial,
                price,
                response,
            } => {
                let result = self.handle_create_listing(seller, item_id, serial, price);
                self.observe(&result);
                let _ = response.send(result);
            }
            LedgerMessage::CancelListing {
                seller,
                listing_id,
                response,
            } => {
                let result = self.handle_cancel_listing(seller, listing_id);
                self.observe(&result);
                let _ = response.send(result);
            }
            LedgerMessage::Donate {
                from,
                to,
                amount,
                response,
            } => {
                let result = self.handle_donate(from, to, amount);
                self.observe(&result);
                let _ = response.send(result);
            }
            LedgerMessage::GrantCopy {
                owner,
                item_id,
                serial,
                response,
            } => {
                let _ = response.send(self.handle_grant_copy(owner, item_id, serial));
            }
            LedgerMessage::TransferCopy {
                item_id,
                serial,
                from,
                to,
                response,
            } => {
                let result = self.handle_transfer_copy(item_id, serial, from, to);
                self.observe(&result);
                let _ = response.send(result);
            }
            LedgerMessage::GrantBadge {
                account,
                kind,
                response,
            } => {
                let _ = response.send(self.handle_grant_badge(account, kind));
            }
            LedgerMessage::Shutdown => {
                // Handled in main loop
            }
        }

        timer.observe_duration();
    }

    /// Count conflict-class outcomes
    fn observe<T>(&self, result: &Result<T>) {
        if let Err(Error::Conflict(_) | Error::OutOfStock(_) | Error::AlreadyTransferred(_)) = result
        {
            self.metrics.conflicts_total.inc();
        }
    }

    // Command handlers. Each one re-validates against committed state, stages
    // every row change into one WriteBatch, and commits it atomically; an
    // early return leaves the store untouched.

    fn handle_create_account(&self, account: Account) -> Result<()> {
        if self.storage.has_account(&account.id)? {
            return Err(Error::Conflict(format!("account {} already exists", account.id)));
        }

        let mut batch = WriteBatch::default();
        self.storage.stage_account(&mut batch, &account)?;
        self.storage.commit(batch)?;

        tracing::info!(account = %account.id, "Account created");
        Ok(())
    }

    fn handle_publish_item(&self, item: Item) -> Result<()> {
        if self.storage.has_item(item.id())? {
            return Err(Error::Conflict(format!("item {} already exists", item.id())));
        }

        if let Item::Limited(limited) = &item {
            if limited.stock != limited.original_stock || limited.quantity_sold != 0 {
                return Err(Error::Validation(
                    "limited item must be published with full stock".to_string(),
                ));
            }
        }

        let mut batch = WriteBatch::default();
        self.storage.stage_item(&mut batch, &item)?;
        self.storage.commit(batch)?;

        tracing::info!(item = %item.id(), name = item.name(), "Item published");
        Ok(())
    }

    fn handle_transfer(
        &self,
        amount: u64,
        currency: Currency,
        from: AccountId,
        to: AccountId,
        kind: TransferKind,
        item_id: Option<Uuid>,
        description: String,
    ) -> Result<Uuid> {
        if from == to {
            return Err(Error::Validation("self-transfer is not allowed".to_string()));
        }

        let mut payer = self.storage.get_account(&from)?;
        let mut payee = self.storage.get_account(&to)?;

        let mut batch = WriteBatch::default();
        let transfer_id = self.stage_transfer_pair(
            &mut batch,
            &mut payer,
            &mut payee,
            amount,
            currency,
            kind,
            item_id,
            &description,
        )?;
        self.storage.stage_account(&mut batch, &payer)?;
        self.storage.stage_account(&mut batch, &payee)?;
        self.storage.commit(batch)?;

        self.metrics.transfers_total.inc();
        tracing::debug!(
            transfer_id = %transfer_id,
            amount,
            currency = %currency,
            from = %from,
            to = %to,
            "Transfer committed"
        );

        Ok(transfer_id)
    }

    fn handle_convert_bits(&self, account_id: AccountId) -> Result<ConversionOutcome> {
        let mut account = self.storage.get_account(&account_id)?;

        let bits = account.bit_balance;
        if bits < BITS_PER_BLOCK {
            return Err(Error::InsufficientBits(format!(
                "account {} has {} bits, conversion requires at least {}",
                account_id, bits, BITS_PER_BLOCK
            )));
        }

        let tickets = crate::types::tickets_for_bits(bits);
        account.debit(Currency::Bits, bits)?;
        account.credit(Currency::Tickets, tickets);

        let mut batch = WriteBatch::default();
        self.storage.stage_account(&mut batch, &account)?;
        self.storage.commit(batch)?;

        tracing::info!(
            account = %account_id,
            bits_spent = bits,
            tickets_minted = tickets,
            "Bits converted to tickets"
        );

        Ok(ConversionOutcome {
            bits_spent: bits,
            tickets_minted: tickets,
            ticket_balance: account.ticket_balance,
            bit_balance: account.bit_balance,
        })
    }

    fn handle_purchase(
        &self,
        buyer_id: AccountId,
        item_id: Uuid,
        declared_price: u64,
    ) -> Result<PurchaseOutcome> {
        let item = self.storage.get_item(item_id)?;
        if !item.on_sale() {
            return Err(Error::NotForSale(format!("item {} is not on sale", item_id)));
        }

        let author_id = item.author().clone();
        if buyer_id == author_id {
            return Err(Error::Validation(
                "authors cannot purchase their own items".to_string(),
            ));
        }

        let mut buyer = self.storage.get_account(&buyer_id)?;
        let mut author = self.storage.get_account(&author_id)?;

        // Re-derive price, stock, and serial from committed state; the
        // declared price only guards against a stale client.
        let (serial, price, updated_item) = match item {
            Item::Limited(mut limited) => {
                if declared_price != limited.fixed_price {
                    return Err(Error::PriceMismatch(format!(
                        "declared {} but primary price is {}",
                        declared_price, limited.fixed_price
                    )));
                }
                let serial = limited.take_unit()?;
                let price = limited.fixed_price;
                (serial, price, Item::Limited(limited))
            }
            Item::Catalog(mut catalog) => {
                if declared_price != catalog.price {
                    return Err(Error::PriceMismatch(format!(
                        "declared {} but catalog price is {}",
                        declared_price, catalog.price
                    )));
                }
                if !self.storage.copies_owned(&buyer_id, item_id)?.is_empty() {
                    return Err(Error::AlreadyOwned(format!(
                        "account {} already owns item {}",
                        buyer_id, item_id
                    )));
                }
                catalog.quantity_sold += 1;
                let serial = catalog.quantity_sold as u64;
                let price = catalog.price;
                (serial, price, Item::Catalog(catalog))
            }
        };

        let mut batch = WriteBatch::default();
        let transfer_id = self.stage_transfer_pair(
            &mut batch,
            &mut buyer,
            &mut author,
            price,
            Currency::Tickets,
            TransferKind::PrimarySale,
            Some(item_id),
            "primary purchase",
        )?;

        let copy = OwnershipCopy {
            item_id,
            serial,
            owner: buyer_id.clone(),
            count: 1,
        };
        self.storage.stage_copy(&mut batch, &copy)?;
        self.storage.stage_item(&mut batch, &updated_item)?;
        self.storage.stage_account(&mut batch, &buyer)?;
        self.storage.stage_account(&mut batch, &author)?;
        self.storage.commit(batch)?;

        self.metrics.transfers_total.inc();
        self.metrics.purchases_total.inc();
        tracing::info!(
            buyer = %buyer_id,
            item = %item_id,
            serial,
            price,
            "Primary purchase committed"
        );

        Ok(PurchaseOutcome {
            transfer_id,
            item_id,
            serial,
            price,
            seller: author_id,
            buyer_ticket_balance: buyer.ticket_balance,
        })
    }

    fn handle_resale_purchase(
        &self,
        buyer_id: AccountId,
        listing_id: Uuid,
        declared_price: u64,
    ) -> Result<PurchaseOutcome> {
        // A listing that was visible at validation time but is gone now was
        // consumed or cancelled by a concurrent request.
        let listing = self.storage.maybe_listing(listing_id)?.ok_or_else(|| {
            Error::Conflict(format!("listing {} no longer exists", listing_id))
        })?;

        if listing.price != declared_price {
            return Err(Error::Conflict(format!(
                "listing {} price is {} but {} was declared",
                listing_id, listing.price, declared_price
            )));
        }

        if buyer_id == listing.seller {
            return Err(Error::Validation(
                "sellers cannot purchase their own listings".to_string(),
            ));
        }

        let mut buyer = self.storage.get_account(&buyer_id)?;
        let mut seller = self.storage.get_account(&listing.seller)?;

        let mut copy = self.storage.get_copy(listing.item_id, listing.serial)?;
        if copy.owner != listing.seller || copy.count == 0 {
            return Err(Error::Conflict(format!(
                "listed copy {}#{} is no longer held by the seller",
                listing.item_id, listing.serial
            )));
        }

        let previous_owner = copy.owner.clone();
        copy.owner = buyer_id.clone();

        let mut batch = WriteBatch::default();
        let transfer_id = self.stage_transfer_pair(
            &mut batch,
            &mut buyer,
            &mut seller,
            listing.price,
            Currency::Tickets,
            TransferKind::ResaleSale,
            Some(listing.item_id),
            "resale purchase",
        )?;
        self.storage
            .stage_copy_owner_change(&mut batch, &copy, &previous_owner)?;
        self.storage.stage_delete_listing(&mut batch, &listing)?;
        self.storage.stage_account(&mut batch, &buyer)?;
        self.storage.stage_account(&mut batch, &seller)?;
        self.storage.commit(batch)?;

        self.metrics.transfers_total.inc();
        self.metrics.purchases_total.inc();
        self.metrics.listings_active.dec();
        tracing::info!(
            buyer = %buyer_id,
            seller = %listing.seller,
            item = %listing.item_id,
            serial = listing.serial,
            price = listing.price,
            "Resale purchase committed"
        );

        Ok(PurchaseOutcome {
            transfer_id,
            item_id: listing.item_id,
            serial: listing.serial,
            price: listing.price,
            seller: listing.seller,
            buyer_ticket_balance: buyer.ticket_balance,
        })
    }

    fn handle_create_listing(
        &self,
        seller: AccountId,
        item_id: Uuid,
        serial: u64,
        price: u64,
    ) -> Result<ResaleListing> {
        if price < 1 {
            return Err(Error::Validation(
                "listing price must be at least 1 ticket".to_string(),
            ));
        }

        let item = self.storage.get_item(item_id)?;
        if !matches!(item, Item::Limited(_)) {
            return Err(Error::Validation(
                "only limited items can be resold".to_string(),
            ));
        }

        let copy = self
            .storage
            .maybe_copy(item_id, serial)?
            .ok_or_else(|| Error::NotFound(format!("copy {}#{}", item_id, serial)))?;
        if copy.owner != seller || copy.count == 0 {
            return Err(Error::NotOwned(format!(
                "account {} does not hold copy {}#{}",
                seller, item_id, serial
            )));
        }

        if self.storage.listing_id_for_serial(item_id, serial)?.is_some() {
            return Err(Error::Conflict(format!(
                "copy {}#{} is already listed",
                item_id, serial
            )));
        }

        let listing = ResaleListing {
            id: Uuid::now_v7(),
            seller: seller.clone(),
            item_id,
            serial,
            price,
            created_at: Utc::now(),
        };

        let mut batch = WriteBatch::default();
        self.storage.stage_listing(&mut batch, &listing)?;
        self.storage.commit(batch)?;

        self.metrics.listings_active.inc();
        tracing::info!(
            listing = %listing.id,
            seller = %seller,
            item = %item_id,
            serial,
            price,
            "Listing created"
        );

        Ok(listing)
    }

    fn handle_cancel_listing(&self, seller: AccountId, listing_id: Uuid) -> Result<()> {
        let listing = self
            .storage
            .maybe_listing(listing_id)?
            .ok_or_else(|| Error::NotFound(format!("listing {}", listing_id)))?;

        if listing.seller != seller {
            return Err(Error::Unauthorized(format!(
                "listing {} belongs to {}",
                listing_id, listing.seller
            )));
        }

        let mut batch = WriteBatch::default();
        self.storage.stage_delete_listing(&mut batch, &listing)?;
        self.storage.commit(batch)?;

        self.metrics.listings_active.dec();
        tracing::info!(listing = %listing_id, seller = %seller, "Listing cancelled");
        Ok(())
    }

    fn handle_donate(
        &self,
        from: AccountId,
        to: AccountId,
        amount: u64,
    ) -> Result<DonationOutcome> {
        if from == to {
            return Err(Error::Validation("self-donation is not allowed".to_string()));
        }

        let mut donor = self.storage.get_account(&from)?;
        let mut recipient = self.storage.get_account(&to)?;

        let mut batch = WriteBatch::default();
        let transfer_id = self.stage_transfer_pair(
            &mut batch,
            &mut donor,
            &mut recipient,
            amount,
            Currency::Tickets,
            TransferKind::Donation,
            None,
            "donation",
        )?;

        donor.donation_count += 1;
        self.storage.stage_account(&mut batch, &donor)?;
        self.storage.stage_account(&mut batch, &recipient)?;
        self.storage.commit(batch)?;

        self.metrics.transfers_total.inc();
        tracing::info!(
            from = %from,
            to = %to,
            amount,
            donation_count = donor.donation_count,
            "Donation committed"
        );

        Ok(DonationOutcome {
            transfer_id,
            donation_count: donor.donation_count,
        })
    }

    fn handle_grant_copy(&self, owner: AccountId, item_id: Uuid, serial: u64) -> Result<()> {
        if !self.storage.has_account(&owner)? {
            return Err(Error::NotFound(format!("account {}", owner)));
        }
        if !self.storage.has_item(item_id)? {
            return Err(Error::NotFound(format!("item {}", item_id)));
        }

        let copy = match self.storage.maybe_copy(item_id, serial)? {
            Some(mut existing) if existing.owner == owner => {
                // Stacked identical serial
                existing.count += 1;
                existing
            }
            Some(existing) => {
                return Err(Error::Conflict(format!(
                    "serial {}#{} already minted to {}",
                    item_id, serial, existing.owner
                )));
            }
            None => OwnershipCopy {
                item_id,
                serial,
                owner: owner.clone(),
                count: 1,
            },
        };

        let mut batch = WriteBatch::default();
        self.storage.stage_copy(&mut batch, &copy)?;
        self.storage.commit(batch)?;

        tracing::debug!(owner = %owner, item = %item_id, serial, "Copy granted");
        Ok(())
    }

    fn handle_transfer_copy(
        &self,
        item_id: Uuid,
        serial: u64,
        from: AccountId,
        to: AccountId,
    ) -> Result<()> {
        if !self.storage.has_account(&to)? {
            return Err(Error::NotFound(format!("account {}", to)));
        }

        let mut copy = self
            .storage
            .maybe_copy(item_id, serial)?
            .ok_or_else(|| Error::NotFound(format!("copy {}#{}", item_id, serial)))?;

        if copy.owner == to {
            return Err(Error::AlreadyTransferred(format!(
                "copy {}#{} already belongs to {}",
                item_id, serial, to
            )));
        }
        if copy.owner != from {
            return Err(Error::NotOwned(format!(
                "copy {}#{} is held by {}, not {}",
                item_id, serial, copy.owner, from
            )));
        }

        let previous_owner = copy.owner.clone();
        copy.owner = to.clone();

        let mut batch = WriteBatch::default();

        // A listing backed by this serial belonged to the departing owner;
        // drop it so the new owner can list freely.
        if let Some(listing_id) = self.storage.listing_id_for_serial(item_id, serial)? {
            let listing = self.storage.get_listing(listing_id)?;
            self.storage.stage_delete_listing(&mut batch, &listing)?;
            self.metrics.listings_active.dec();
            tracing::info!(listing = %listing_id, "Listing dropped with copy transfer");
        }

        self.storage
            .stage_copy_owner_change(&mut batch, &copy, &previous_owner)?;
        self.storage.commit(batch)?;

        tracing::debug!(item = %item_id, serial, from = %from, to = %to, "Copy transferred");
        Ok(())
    }

    fn handle_grant_badge(&self, account: AccountId, kind: BadgeKind) -> Result<bool> {
        if !self.storage.has_account(&account)? {
            return Err(Error::NotFound(format!("account {}", account)));
        }

        // Check-and-insert runs inside the single writer, so a duplicate
        // grant attempt observes the first insert and becomes a no-op.
        if self.storage.get_badge(&account, kind)?.is_some() {
            return Ok(false);
        }

        let grant = BadgeGrant {
            account: account.clone(),
            kind,
            granted_at: Utc::now(),
        };

        let mut batch = WriteBatch::default();
        self.storage.stage_badge(&mut batch, &grant)?;
        self.storage.commit(batch)?;

        tracing::info!(account = %account, badge = %kind, "Badge granted");
        Ok(true)
    }

    /// Stage a double-entry transfer: debit and credit the in-memory account
    /// rows and stage both transaction legs (plus the sale index entry for
    /// sale kinds). The caller stages the account rows after any further
    /// mutation and commits the whole batch.
    #[allow(clippy::too_many_arguments)]
    fn stage_transfer_pair(
        &self,
        batch: &mut WriteBatch,
        from: &mut Account,
        to: &mut Account,
        amount: u64,
        currency: Currency,
        kind: TransferKind,
        item_id: Option<Uuid>,
        description: &str,
    ) -> Result<Uuid> {
        if amount == 0 {
            return Err(Error::Validation("transfer amount must be positive".to_string()));
        }
        if from.id == to.id {
            return Err(Error::Validation("self-transfer is not allowed".to_string()));
        }

        from.debit(currency, amount)?;
        to.credit(currency, amount);

        let transfer_id = Uuid::now_v7();
        let now = Utc::now();

        let outbound = Transaction {
            id: Uuid::now_v7(),
            transfer_id,
            amount,
            currency,
            from: from.id.clone(),
            to: to.id.clone(),
            direction: TransferDirection::Outbound,
            kind,
            item_id,
            description: description.to_string(),
            created_at: now,
        };
        let inbound = Transaction {
            id: Uuid::now_v7(),
            direction: TransferDirection::Inbound,
            ..outbound.clone()
        };

        self.storage.stage_transaction(batch, &outbound)?;
        self.storage.stage_transaction(batch, &inbound)?;

        if kind.is_sale() {
            if let Some(item_id) = item_id {
                let sample = SaleSample {
                    amount,
                    occurred_at: now,
                };
                self.storage
                    .stage_sale_index(batch, item_id, transfer_id, &sample)?;
            }
        }

        Ok(transfer_id)
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Register a new account
    pub async fn create_account(&self, account: Account) -> Result<()> {
        self.request(|response| LedgerMessage::CreateAccount { account, response })
            .await
    }

    /// Publish an item
    pub async fn publish_item(&self, item: Item) -> Result<()> {
        self.request(|response| LedgerMessage::PublishItem { item, response })
            .await
    }

    /// Move currency between two accounts
    #[allow(clippy::too_many_arguments)]
    pub async fn transfer(
        &self,
        amount: u64,
        currency: Currency,
        from: AccountId,
        to: AccountId,
        kind: TransferKind,
        item_id: Option<Uuid>,
        description: String,
    ) -> Result<Uuid> {
        self.request(|response| LedgerMessage::Transfer {
            amount,
            currency,
            from,
            to,
            kind,
            item_id,
            description,
            response,
        })
        .await
    }

    /// Convert an account's full bit balance to tickets
    pub async fn convert_bits(&self, account: AccountId) -> Result<ConversionOutcome> {
        self.request(|response| LedgerMessage::ConvertBits { account, response })
            .await
    }

    /// Primary-market purchase
    pub async fn purchase(
        &self,
        buyer: AccountId,
        item_id: Uuid,
        declared_price: u64,
    ) -> Result<PurchaseOutcome> {
        self.request(|response| LedgerMessage::Purchase {
            buyer,
            item_id,
            declared_price,
            response,
        })
        .await
    }

    /// Purchase of an active resale listing
    pub async fn resale_purchase(
        &self,
        buyer: AccountId,
        listing_id: Uuid,
        declared_price: u64,
    ) -> Result<PurchaseOutcome> {
        self.request(|response| LedgerMessage::ResalePurchase {
            buyer,
            listing_id,
            declared_price,
            response,
        })
        .await
    }

    /// Create a resale listing
    pub async fn create_listing(
        &self,
        seller: AccountId,
        item_id: Uuid,
        serial: u64,
        price: u64,
    ) -> Result<ResaleListing> {
        self.request(|response| LedgerMessage::CreateListing {
            seller,
            item_id,
            serial,
            price,
            response,
        })
        .await
    }

    /// Cancel an active resale listing
    pub async fn cancel_listing(&self, seller: AccountId, listing_id: Uuid) -> Result<()> {
        self.request(|response| LedgerMessage::CancelListing {
            seller,
            listing_id,
            response,
        })
        .await
    }

    /// Donate tickets
    pub async fn donate(
        &self,
        from: AccountId,
        to: AccountId,
        amount: u64,
    ) -> Result<DonationOutcome> {
        self.request(|response| LedgerMessage::Donate {
            from,
            to,
            amount,
            response,
        })
        .await
    }

    /// Grant a serialized copy outside the purchase path
    pub async fn grant_copy(&self, owner: AccountId, item_id: Uuid, serial: u64) -> Result<()> {
        self.request(|response| LedgerMessage::GrantCopy {
            owner,
            item_id,
            serial,
            response,
        })
        .await
    }

    /// Reassign a serialized copy between accounts
    pub async fn transfer_copy(
        &self,
        item_id: Uuid,
        serial: u64,
        from: AccountId,
        to: AccountId,
    ) -> Result<()> {
        self.request(|response| LedgerMessage::TransferCopy {
            item_id,
            serial,
            from,
            to,
            response,
        })
        .await
    }

    /// Grant a one-time badge; returns true when newly granted
    pub async fn grant_badge(&self, account: AccountId, kind: BadgeKind) -> Result<bool> {
        self.request(|response| LedgerMessage::GrantBadge {
            account,
            kind,
            response,
        })
        .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the economy actor
pub fn spawn_ledger_actor(
    storage: Arc<Storage>,
    mailbox_capacity: usize,
    metrics: Metrics,
) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity); // Bounded channel for backpressure
    let actor = LedgerActor::new(storage, rx, metrics);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}
