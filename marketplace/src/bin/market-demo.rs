//! Marketplace wiring demo
//!
//! Opens the economy store, spawns the badge awarder, and walks one limited
//! item through its life: primary sellout, resale listing, resale purchase,
//! and the price ladder along the way.

use badge_awarder::spawn_badge_awarder;
use ledger_core::{Item, Ledger, LimitedItem};
use marketplace::{MarketConfig, MarketplaceEngine};
use std::sync::Arc;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Plaza marketplace demo");

    // Open the economy core
    let config = ledger_core::Config::from_env()?;
    let ledger = Arc::new(Ledger::open(config).await?);

    // Wire the notification bus and badge awarder
    let market_config = MarketConfig::default();
    let (events, stream) = badge_awarder::channel(market_config.event_capacity);
    let awarder = spawn_badge_awarder(ledger.clone(), stream);

    let market = MarketplaceEngine::new(ledger.clone(), market_config, events)?;

    // Seed accounts and one limited item
    let author = ledger.create_account("demo-author", 0, 0).await?;
    let flip = ledger.create_account("demo-flip", 500, 0).await?;
    let collector = ledger.create_account("demo-collector", 500, 250).await?;

    let item = LimitedItem {
        id: Uuid::new_v4(),
        name: "Obsidian Visor".to_string(),
        fixed_price: 50,
        original_stock: 2,
        stock: 2,
        quantity_sold: 0,
        on_sale: true,
        author: author.id.clone(),
        created_at: chrono::Utc::now(),
    };
    let item_id = item.id;
    ledger.publish_item(Item::Limited(item)).await?;

    println!("primary price: {:?}", market.current_price(item_id)?);

    // Sell out the primary market
    let first = market.buy(flip.id.clone(), item_id, 50, None).await?;
    let second = market.buy(collector.id.clone(), item_id, 50, None).await?;
    println!(
        "sold out: serials {} and {} minted, author balance {}",
        first.serial,
        second.serial,
        ledger.account(&author.id)?.ticket_balance
    );

    // Flip relists; the floating price follows the cheapest listing
    let listing = market.sell(flip.id.clone(), item_id, first.serial, 120).await?;
    println!("listed serial {} at {}", listing.serial, listing.price);
    println!("floating price: {:?}", market.current_price(item_id)?);

    // Collector converts bits and takes the listing
    let conversion = ledger.convert_bits_to_tickets(collector.id.clone()).await?;
    println!(
        "converted {} bits into {} tickets",
        conversion.bits_spent, conversion.tickets_minted
    );

    let resale = market
        .buy(collector.id.clone(), item_id, 120, Some(listing.listing_id))
        .await?;
    println!("resale receipt: {}", serde_json::to_string_pretty(&resale)?);

    println!("RAP: {:?}", market.recent_average_price(item_id)?);
    println!(
        "collector now owns: {:?}",
        market.count_owned(&collector.id, item_id)?
    );

    let stats = ledger.stats()?;
    println!(
        "store: ~{} accounts, ~{} transaction legs, ~{} listings",
        stats.total_accounts, stats.total_transactions, stats.total_listings
    );

    // Let the awarder drain, then shut down
    drop(market);
    awarder.abort();
    let _ = awarder.await;

    match Arc::try_unwrap(ledger) {
        Ok(ledger) => ledger.shutdown().await?,
        Err(_) => tracing::warn!("ledger still shared at shutdown"),
    }

    tracing::info!("Demo complete");
    Ok(())
}
