//! Receipt types returned to callers

use ledger_core::{AccountId, PurchaseOutcome};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Receipt for a committed purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    /// Transfer pair ID of the payment
    pub transfer_id: Uuid,

    /// Purchased item
    pub item_id: Uuid,

    /// Serial of the copy now owned by the buyer
    pub serial: u64,

    /// Price paid in tickets
    pub price: u64,

    /// Account credited (author on primary, seller on resale)
    pub seller: AccountId,

    /// Buyer's ticket balance after commit
    pub buyer_ticket_balance: u64,
}

impl From<PurchaseOutcome> for PurchaseReceipt {
    fn from(outcome: PurchaseOutcome) -> Self {
        Self {
            transfer_id: outcome.transfer_id,
            item_id: outcome.item_id,
            serial: outcome.serial,
            price: outcome.price,
            seller: outcome.seller,
            buyer_ticket_balance: outcome.buyer_ticket_balance,
        }
    }
}

/// Receipt for a created resale listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingReceipt {
    /// Listing ID
    pub listing_id: Uuid,

    /// Listed item
    pub item_id: Uuid,

    /// Listed copy serial
    pub serial: u64,

    /// Asking price in tickets
    pub price: u64,
}

/// Receipt for a committed donation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationReceipt {
    /// Transfer pair ID
    pub transfer_id: Uuid,

    /// Donor's donation count after commit
    pub donation_count: u32,
}
