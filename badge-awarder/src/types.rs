//! Event definitions for the notification bus

use ledger_core::AccountId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A completed economy operation worth reacting to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EconomyEvent {
    /// A donation committed
    DonationCompleted {
        /// Donating account
        account: AccountId,
        /// Donor's donation count after the commit
        donation_count: u32,
    },

    /// A purchase committed (primary or resale)
    PurchaseCompleted {
        /// Buying account
        account: AccountId,
        /// Purchased item
        item_id: Uuid,
        /// Copy serial now owned by the buyer
        serial: u64,
        /// Price paid in tickets
        price: u64,
    },
}

impl EconomyEvent {
    /// Account the event concerns
    pub fn account(&self) -> &AccountId {
        match self {
            EconomyEvent::DonationCompleted { account, .. } => account,
            EconomyEvent::PurchaseCompleted { account, .. } => account,
        }
    }
}
