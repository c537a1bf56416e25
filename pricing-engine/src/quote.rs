//! Current price derivation

use crate::{
    rap::{RapCalculator, RapConfig},
    types::{PriceQuote, PriceSource},
    Result,
};
use chrono::{DateTime, Utc};
use ledger_core::{Item, ResaleListing, SaleSample};

/// Derives the current price and RAP for marketplace items.
///
/// The price ladder for a limited item:
///
/// 1. While primary stock remains, the fixed price applies.
/// 2. Once exhausted, the cheapest active resale listing sets the price.
/// 3. With no listings, the last known RAP stands in.
/// 4. With no sales ever, there is no price (rendered as "pending").
#[derive(Debug, Clone)]
pub struct PricingEngine {
    rap: RapCalculator,
}

impl PricingEngine {
    /// Create a pricing engine from RAP configuration
    pub fn new(config: RapConfig) -> Result<Self> {
        Ok(Self {
            rap: RapCalculator::new(config)?,
        })
    }

    /// Start of the RAP window ending at `now`; callers fetch sale history
    /// from this instant forward
    pub fn rap_window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.rap.window_start(now)
    }

    /// Trailing-window recent average price, floored
    pub fn recent_average_price(
        &self,
        sales: &[SaleSample],
        now: DateTime<Utc>,
    ) -> Option<u64> {
        self.rap.recent_average_price(sales, now)
    }

    /// Current price of an item given its active listings and sale history
    pub fn current_price(
        &self,
        item: &Item,
        listings: &[ResaleListing],
        sales: &[SaleSample],
        now: DateTime<Utc>,
    ) -> Option<PriceQuote> {
        match item {
            Item::Catalog(catalog) => Some(PriceQuote {
                amount: catalog.price,
                source: PriceSource::Primary,
            }),
            Item::Limited(limited) => {
                if limited.stock > 0 {
                    return Some(PriceQuote {
                        amount: limited.fixed_price,
                        source: PriceSource::Primary,
                    });
                }

                if let Some(cheapest) = listings.iter().map(|l| l.price).min() {
                    return Some(PriceQuote {
                        amount: cheapest,
                        source: PriceSource::BestResale,
                    });
                }

                let rap = self.rap.recent_average_price(sales, now)?;
                tracing::debug!(item = %limited.id, rap, "Quoting from recent average price");
                Some(PriceQuote {
                    amount: rap,
                    source: PriceSource::RecentAverage,
                })
            }
        }
    }
}
