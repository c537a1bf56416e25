//! Core domain types for the platform economy
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Integer currency (no fractional amounts)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Size of a whole conversion block in bits.
pub const BITS_PER_BLOCK: u64 = 100;

/// Tickets credited per whole conversion block.
pub const TICKETS_PER_BLOCK: u64 = 10;

/// Tickets minted for a given bit amount.
///
/// Whole 100-bit blocks convert to 10 tickets each; the partial block
/// converts proportionally, floored.
pub fn tickets_for_bits(bits: u64) -> u64 {
    let blocks = bits / BITS_PER_BLOCK;
    let remainder = bits % BITS_PER_BLOCK;
    blocks * TICKETS_PER_BLOCK + remainder * TICKETS_PER_BLOCK / BITS_PER_BLOCK
}

/// Account identifier (platform user id or fund id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create new account ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Virtual currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// Tickets, the primary spendable currency
    Tickets,
    /// Bits, convertible to tickets at a fixed block rate
    Bits,
}

impl Currency {
    /// Short code for display and logging
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Tickets => "TIX",
            Currency::Bits => "BITS",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A user's or fund's spendable balances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Account ID
    pub id: AccountId,

    /// Spendable ticket balance
    pub ticket_balance: u64,

    /// Spendable bit balance
    pub bit_balance: u64,

    /// Completed donations made by this account
    pub donation_count: u32,

    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with initial balances
    pub fn new(id: AccountId, tickets: u64, bits: u64) -> Self {
        Self {
            id,
            ticket_balance: tickets,
            bit_balance: bits,
            donation_count: 0,
            created_at: Utc::now(),
        }
    }

    /// Balance in the given currency
    pub fn balance(&self, currency: Currency) -> u64 {
        match currency {
            Currency::Tickets => self.ticket_balance,
            Currency::Bits => self.bit_balance,
        }
    }

    /// Credit the given currency
    pub fn credit(&mut self, currency: Currency, amount: u64) {
        match currency {
            Currency::Tickets => self.ticket_balance += amount,
            Currency::Bits => self.bit_balance += amount,
        }
    }

    /// Debit the given currency, failing if the balance is insufficient.
    ///
    /// Unsigned balances make a negative balance unrepresentable; this is
    /// the only code path that decrements them.
    pub fn debit(&mut self, currency: Currency, amount: u64) -> crate::Result<()> {
        match currency {
            Currency::Tickets => {
                let remaining = self.ticket_balance.checked_sub(amount).ok_or_else(|| {
                    crate::Error::InsufficientFunds(format!(
                        "account {} has {} tickets, needs {}",
                        self.id, self.ticket_balance, amount
                    ))
                })?;
                self.ticket_balance = remaining;
            }
            Currency::Bits => {
                let remaining = self.bit_balance.checked_sub(amount).ok_or_else(|| {
                    crate::Error::InsufficientBits(format!(
                        "account {} has {} bits, needs {}",
                        self.id, self.bit_balance, amount
                    ))
                })?;
                self.bit_balance = remaining;
            }
        }

        Ok(())
    }
}

/// Non-limited purchasable good
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Item ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Price in tickets
    pub price: u64,

    /// Optional bit-denominated display price; purchases settle in tickets
    pub price_bits: Option<u64>,

    /// Whether the item is currently purchasable
    pub on_sale: bool,

    /// Publishing account, credited on sale
    pub author: AccountId,

    /// Units sold; mints copy serials
    pub quantity_sold: u32,

    /// Publication timestamp
    pub created_at: DateTime<Utc>,
}

/// Fixed-supply collectible
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitedItem {
    /// Item ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Primary-market price in tickets
    pub fixed_price: u64,

    /// Total units ever available on the primary market
    pub original_stock: u32,

    /// Units still available on the primary market
    pub stock: u32,

    /// Units sold on the primary market
    pub quantity_sold: u32,

    /// Whether the item is currently purchasable
    pub on_sale: bool,

    /// Publishing account, credited on primary sale
    pub author: AccountId,

    /// Publication timestamp
    pub created_at: DateTime<Utc>,
}

impl LimitedItem {
    /// Take one unit of primary stock, minting the copy serial.
    ///
    /// Serials are minted monotonically per item: the Nth unit sold carries
    /// serial N.
    pub fn take_unit(&mut self) -> crate::Result<u64> {
        if self.stock == 0 {
            return Err(crate::Error::OutOfStock(format!(
                "limited item {} has no primary stock",
                self.id
            )));
        }

        self.stock -= 1;
        self.quantity_sold += 1;
        Ok(self.quantity_sold as u64)
    }

    /// Stock accounting invariant: stock + quantity_sold == original_stock
    pub fn stock_invariant_holds(&self) -> bool {
        self.stock + self.quantity_sold == self.original_stock
    }
}

/// A purchasable item, either non-limited catalog or fixed-supply limited
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Item {
    /// Non-limited catalog item
    Catalog(CatalogItem),
    /// Fixed-supply limited item
    Limited(LimitedItem),
}

impl Item {
    /// Item ID
    pub fn id(&self) -> Uuid {
        match self {
            Item::Catalog(item) => item.id,
            Item::Limited(item) => item.id,
        }
    }

    /// Publishing account
    pub fn author(&self) -> &AccountId {
        match self {
            Item::Catalog(item) => &item.author,
            Item::Limited(item) => &item.author,
        }
    }

    /// Whether the item is currently purchasable
    pub fn on_sale(&self) -> bool {
        match self {
            Item::Catalog(item) => item.on_sale,
            Item::Limited(item) => item.on_sale,
        }
    }

    /// Display name
    pub fn name(&self) -> &str {
        match self {
            Item::Catalog(item) => &item.name,
            Item::Limited(item) => &item.name,
        }
    }
}

/// One serialized unit of an item held by an account
///
/// Keyed by `(item_id, serial)`; the serial never changes, the owner does.
/// `count` supports stacked identical serials and only drops below 1
/// transiently inside an ownership transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipCopy {
    /// Item this copy belongs to
    pub item_id: Uuid,

    /// Serial, unique per item
    pub serial: u64,

    /// Current owner
    pub owner: AccountId,

    /// Stacked count of this serial
    pub count: u32,
}

/// One owned serial with its stacked count, as returned by inventory queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedStack {
    /// Copy serial
    pub serial: u64,
    /// Stacked count
    pub count: u32,
}

/// An active offer to sell one serialized copy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResaleListing {
    /// Listing ID
    pub id: Uuid,

    /// Selling account; must own the backing copy
    pub seller: AccountId,

    /// Item the listed copy belongs to
    pub item_id: Uuid,

    /// Listed copy serial
    pub serial: u64,

    /// Asking price in tickets (>= 1)
    pub price: u64,

    /// Listing timestamp
    pub created_at: DateTime<Utc>,
}

/// One leg of a currency movement
///
/// Created in pairs sharing `transfer_id`: one OUTBOUND row from the payer's
/// perspective and one INBOUND row from the payee's, equal amounts. Rows are
/// append-only and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique row ID (UUIDv7 for time-ordering)
    pub id: Uuid,

    /// Pair ID shared by both legs of the transfer
    pub transfer_id: Uuid,

    /// Transferred amount, always positive
    pub amount: u64,

    /// Currency the transfer settled in
    pub currency: Currency,

    /// Paying account
    pub from: AccountId,

    /// Receiving account
    pub to: AccountId,

    /// Perspective of this leg
    pub direction: TransferDirection,

    /// What kind of movement this was
    pub kind: TransferKind,

    /// Item sold, for sale transfers
    pub item_id: Option<Uuid>,

    /// Human-readable description
    pub description: String,

    /// Commit timestamp
    pub created_at: DateTime<Utc>,
}

/// Perspective of one transaction leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferDirection {
    /// Leg recorded from the payer's perspective
    Outbound,
    /// Leg recorded from the payee's perspective
    Inbound,
}

/// Kind of currency movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferKind {
    /// Primary-market item sale, paid to the author
    PrimarySale,
    /// Resale of a serialized copy, paid to the seller
    ResaleSale,
    /// Donation between accounts
    Donation,
}

impl TransferKind {
    /// Whether this movement is a sale of an item
    pub fn is_sale(&self) -> bool {
        matches!(self, TransferKind::PrimarySale | TransferKind::ResaleSale)
    }
}

/// One completed sale of an item, as fed to price statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleSample {
    /// Sale price in tickets
    pub amount: u64,

    /// When the sale committed
    pub occurred_at: DateTime<Utc>,
}

/// One-time achievement badge kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BadgeKind {
    /// Granted on the tenth completed donation
    SeasonedDonor = 1,
    /// Granted on the first completed purchase
    FirstPurchase = 2,
}

impl BadgeKind {
    /// Stable name for storage keys and display
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeKind::SeasonedDonor => "seasoned-donor",
            BadgeKind::FirstPurchase => "first-purchase",
        }
    }
}

impl fmt::Display for BadgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One-time achievement record, unique per (account, kind)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeGrant {
    /// Recognized account
    pub account: AccountId,

    /// Badge kind
    pub kind: BadgeKind,

    /// Grant timestamp
    pub granted_at: DateTime<Utc>,
}

/// Result of a committed purchase (primary, catalog, or resale)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOutcome {
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

/// Result of a committed donation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationOutcome {
    /// Transfer pair ID
    pub transfer_id: Uuid,

    /// Donor's donation count after commit
    pub donation_count: u32,
}

/// Result of a committed bits-to-tickets conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutcome {
    /// Bits debited (the full bit balance)
    pub bits_spent: u64,

    /// Tickets credited
    pub tickets_minted: u64,

    /// Ticket balance after commit
    pub ticket_balance: u64,

    /// Bit balance after commit (always zero)
    pub bit_balance: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tickets_for_bits_whole_blocks() {
        assert_eq!(tickets_for_bits(100), 10);
        assert_eq!(tickets_for_bits(300), 30);
    }

    #[test]
    fn test_tickets_for_bits_partial_block_floors() {
        assert_eq!(tickets_for_bits(150), 15);
        assert_eq!(tickets_for_bits(155), 15); // 5.5-ticket remainder floors
        assert_eq!(tickets_for_bits(199), 19);
        assert_eq!(tickets_for_bits(101), 10);
    }

    #[test]
    fn test_account_debit_insufficient() {
        let mut account = Account::new(AccountId::new("acc-1"), 50, 0);
        let result = account.debit(Currency::Tickets, 51);
        assert!(matches!(result, Err(crate::Error::InsufficientFunds(_))));
        // Failed debit leaves the balance untouched
        assert_eq!(account.ticket_balance, 50);
    }

    #[test]
    fn test_account_debit_credit_roundtrip() {
        let mut account = Account::new(AccountId::new("acc-2"), 100, 200);
        account.debit(Currency::Bits, 150).unwrap();
        account.credit(Currency::Tickets, 15);
        assert_eq!(account.bit_balance, 50);
        assert_eq!(account.ticket_balance, 115);
    }

    #[test]
    fn test_limited_item_take_unit() {
        let mut item = LimitedItem {
            id: Uuid::new_v4(),
            name: "Golden Visor".to_string(),
            fixed_price: 50,
            original_stock: 2,
            stock: 2,
            quantity_sold: 0,
            on_sale: true,
            author: AccountId::new("author-1"),
            created_at: Utc::now(),
        };

        assert_eq!(item.take_unit().unwrap(), 1);
        assert_eq!(item.take_unit().unwrap(), 2);
        assert!(item.stock_invariant_holds());

        let result = item.take_unit();
        assert!(matches!(result, Err(crate::Error::OutOfStock(_))));
        assert_eq!(item.quantity_sold, 2);
    }

    #[test]
    fn test_transfer_kind_is_sale() {
        assert!(TransferKind::PrimarySale.is_sale());
        assert!(TransferKind::ResaleSale.is_sale());
        assert!(!TransferKind::Donation.is_sale());
    }
}
