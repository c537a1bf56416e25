//! Type definitions for price quotes

use serde::{Deserialize, Serialize};

/// Where a quoted price came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceSource {
    /// Primary-market price (fixed price while stock remains, or catalog price)
    Primary,
    /// Cheapest active resale listing
    BestResale,
    /// Trailing-window recent average price
    RecentAverage,
}

/// A derived price for an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Price in tickets
    pub amount: u64,

    /// Where the price came from
    pub source: PriceSource,
}
