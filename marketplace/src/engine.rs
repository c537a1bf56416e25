//! Main marketplace engine
//!
//! The only caller-facing entry point that mutates stock, listings,
//! ownership, and balances together. Validation happens up front; the
//! race-sensitive re-checks run inside the ledger's single-writer actor.

use crate::{
    config::MarketConfig,
    types::{DonationReceipt, ListingReceipt, PurchaseReceipt},
    Error, Result,
};
use badge_awarder::{EconomyEvent, EventPublisher};
use chrono::Utc;
use ledger_core::{AccountId, Inventory, Ledger, OwnedStack};
use pricing_engine::{PriceQuote, PricingEngine};
use std::sync::Arc;
use uuid::Uuid;

/// Marketplace engine
pub struct MarketplaceEngine {
    /// Economy core
    ledger: Arc<Ledger>,

    /// Inventory view over the same store
    inventory: Inventory,

    /// Read-time price derivation
    pricing: PricingEngine,

    /// Fire-and-forget completion events
    events: EventPublisher,
}

impl MarketplaceEngine {
    /// Create a new marketplace engine
    pub fn new(
        ledger: Arc<Ledger>,
        config: MarketConfig,
        events: EventPublisher,
    ) -> Result<Self> {
        let pricing = PricingEngine::new(config.rap)?;
        let inventory = ledger.inventory();

        Ok(Self {
            ledger,
            inventory,
            pricing,
            events,
        })
    }

    /// Buy an item.
    ///
    /// Without `resale_listing_id` this is a primary purchase (limited stock
    /// path or catalog path). With it, the given listing is consumed: the
    /// copy moves from the listing's seller to the buyer and the listing row
    /// is deleted, atomically with the payment.
    pub async fn buy(
        &self,
        buyer: AccountId,
        item_id: Uuid,
        declared_price: u64,
        resale_listing_id: Option<Uuid>,
    ) -> Result<PurchaseReceipt> {
        // Step 1: the item must exist and be purchasable
        let item = self.ledger.item(item_id)?;
        if !item.on_sale() {
            return Err(ledger_core::Error::NotForSale(format!(
                "item {} is not on sale",
                item_id
            ))
            .into());
        }

        let outcome = match resale_listing_id {
            // Step 3: resale purchase against a specific listing
            Some(listing_id) => {
                let listing = self.ledger.listing(listing_id)?;
                if listing.item_id != item_id {
                    return Err(Error::Validation(format!(
                        "listing {} is for item {}, not {}",
                        listing_id, listing.item_id, item_id
                    )));
                }

                // The actor re-checks both conditions inside the atomic unit;
                // this pass just rejects obviously stale requests early.
                self.ledger
                    .resale_purchase(buyer.clone(), listing_id, declared_price)
                    .await?
            }

            // Step 2: primary purchase; the actor re-checks stock and mints
            // the serial at commit time
            None => {
                self.ledger
                    .purchase(buyer.clone(), item_id, declared_price)
                    .await?
            }
        };

        tracing::info!(
            buyer = %buyer,
            item = %item_id,
            serial = outcome.serial,
            price = outcome.price,
            resale = resale_listing_id.is_some(),
            "Purchase complete"
        );

        // Step 5: notify, fire-and-forget; a dropped event never rolls back
        // the committed purchase
        self.events.publish(EconomyEvent::PurchaseCompleted {
            account: buyer,
            item_id,
            serial: outcome.serial,
            price: outcome.price,
        });

        Ok(outcome.into())
    }

    /// List an owned copy for resale.
    ///
    /// The copy does not move at listing time; ownership transfers only when
    /// a buy consumes the listing.
    pub async fn sell(
        &self,
        seller: AccountId,
        item_id: Uuid,
        serial: u64,
        price: u64,
    ) -> Result<ListingReceipt> {
        if price < 1 {
            return Err(Error::Validation(
                "listing price must be at least 1 ticket".to_string(),
            ));
        }

        let listing = self
            .ledger
            .create_listing(seller.clone(), item_id, serial, price)
            .await?;

        tracing::info!(
            seller = %seller,
            item = %item_id,
            serial,
            price,
            listing = %listing.id,
            "Listing created"
        );

        Ok(ListingReceipt {
            listing_id: listing.id,
            item_id: listing.item_id,
            serial: listing.serial,
            price: listing.price,
        })
    }

    /// Cancel an active listing; always permitted for its owner
    pub async fn cancel_listing(&self, seller: AccountId, listing_id: Uuid) -> Result<()> {
        self.ledger.cancel_listing(seller, listing_id).await?;
        Ok(())
    }

    /// Donate tickets to another account
    pub async fn donate(
        &self,
        from: AccountId,
        to: AccountId,
        amount: u64,
    ) -> Result<DonationReceipt> {
        if amount == 0 {
            return Err(Error::Validation(
                "donation amount must be positive".to_string(),
            ));
        }
        if from == to {
            return Err(Error::Validation("self-donation is not allowed".to_string()));
        }

        let outcome = self.ledger.donate(from.clone(), to, amount).await?;

        self.events.publish(EconomyEvent::DonationCompleted {
            account: from,
            donation_count: outcome.donation_count,
        });

        Ok(DonationReceipt {
            transfer_id: outcome.transfer_id,
            donation_count: outcome.donation_count,
        })
    }

    /// Current price of an item, or `None` when no price exists yet
    /// (exhausted limited item that has never sold)
    pub fn current_price(&self, item_id: Uuid) -> Result<Option<PriceQuote>> {
        let item = self.ledger.item(item_id)?;
        let now = Utc::now();

        let listings = self.ledger.listings_for_item(item_id)?;
        let sales = self
            .ledger
            .sale_history(item_id, self.pricing.rap_window_start(now))?;

        Ok(self.pricing.current_price(&item, &listings, &sales, now))
    }

    /// Trailing-window recent average price of an item, recomputed on demand
    pub fn recent_average_price(&self, item_id: Uuid) -> Result<Option<u64>> {
        // Surface NotFound for unknown items rather than an empty window
        self.ledger.item(item_id)?;

        let now = Utc::now();
        let sales = self
            .ledger
            .sale_history(item_id, self.pricing.rap_window_start(now))?;

        Ok(self.pricing.recent_average_price(&sales, now))
    }

    /// Serials of one item owned by an account, with stacked counts
    pub fn count_owned(&self, account: &AccountId, item_id: Uuid) -> Result<Vec<OwnedStack>> {
        Ok(self.inventory.count_owned(account, item_id)?)
    }

    /// The underlying ledger
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ledger_core::{Config, Item, LimitedItem};

    async fn test_engine() -> MarketplaceEngine {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        std::mem::forget(temp_dir);

        let ledger = Arc::new(Ledger::open(config).await.unwrap());
        let (events, _stream) = badge_awarder::channel(64);
        MarketplaceEngine::new(ledger, MarketConfig::default(), events).unwrap()
    }

    async fn seed_limited(engine: &MarketplaceEngine, price: u64, stock: u32) -> Uuid {
        let author = engine
            .ledger()
            .create_account(format!("author-{}", Uuid::new_v4()), 0, 0)
            .await
            .unwrap();
        let item = LimitedItem {
            id: Uuid::new_v4(),
            name: "Test Relic".to_string(),
            fixed_price: price,
            original_stock: stock,
            stock,
            quantity_sold: 0,
            on_sale: true,
            author: author.id,
            created_at: Utc::now(),
        };
        let id = item.id;
        engine.ledger().publish_item(Item::Limited(item)).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_donate_validation() {
        let engine = test_engine().await;
        let alice = engine.ledger().create_account("alice", 100, 0).await.unwrap();
        let bob = engine.ledger().create_account("bob", 0, 0).await.unwrap();

        let zero = engine.donate(alice.id.clone(), bob.id.clone(), 0).await;
        assert!(matches!(zero, Err(Error::Validation(_))));

        let own = engine.donate(alice.id.clone(), alice.id.clone(), 5).await;
        assert!(matches!(own, Err(Error::Validation(_))));

        // Nothing was written
        assert_eq!(engine.ledger().account(&alice.id).unwrap().ticket_balance, 100);
    }

    #[tokio::test]
    async fn test_sell_rejects_zero_price() {
        let engine = test_engine().await;
        let item_id = seed_limited(&engine, 50, 1).await;
        let buyer = engine.ledger().create_account("buyer", 50, 0).await.unwrap();

        let receipt = engine.buy(buyer.id.clone(), item_id, 50, None).await.unwrap();

        let result = engine.sell(buyer.id, item_id, receipt.serial, 0).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_buy_unknown_item() {
        let engine = test_engine().await;
        let buyer = engine.ledger().create_account("buyer", 50, 0).await.unwrap();

        let result = engine.buy(buyer.id, Uuid::new_v4(), 50, None).await;
        assert!(matches!(
            result,
            Err(Error::Ledger(ledger_core::Error::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_buy_listing_item_mismatch() {
        let engine = test_engine().await;
        let item_id = seed_limited(&engine, 50, 1).await;
        let other_item = seed_limited(&engine, 60, 1).await;

        let seller = engine.ledger().create_account("seller", 200, 0).await.unwrap();
        let buyer = engine.ledger().create_account("buyer", 200, 0).await.unwrap();

        let purchase = engine.buy(seller.id.clone(), item_id, 50, None).await.unwrap();
        let listing = engine
            .sell(seller.id.clone(), item_id, purchase.serial, 80)
            .await
            .unwrap();

        // Listing referenced through the wrong item id
        let result = engine
            .buy(buyer.id, other_item, 80, Some(listing.listing_id))
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_count_owned_via_engine() {
        let engine = test_engine().await;
        let item_id = seed_limited(&engine, 10, 2).await;
        let buyer = engine.ledger().create_account("buyer", 100, 0).await.unwrap();

        engine.buy(buyer.id.clone(), item_id, 10, None).await.unwrap();
        engine.buy(buyer.id.clone(), item_id, 10, None).await.unwrap();

        let owned = engine.count_owned(&buyer.id, item_id).unwrap();
        assert_eq!(owned.len(), 2);
    }
}
