//! Ownership tracking for serialized item copies
//!
//! The inventory shares the ledger's storage and single-writer actor: a copy
//! transfer issued here runs through the same serialized command path as the
//! marketplace's purchase commands, so an ownership check can never interleave
//! with a concurrent transfer of the same copy.

use crate::{
    actor::LedgerHandle,
    types::{AccountId, OwnedStack, OwnershipCopy},
    Result, Storage,
};
use std::sync::Arc;
use uuid::Uuid;

/// Inventory view over the economy store
#[derive(Clone)]
pub struct Inventory {
    /// Actor handle for mutations
    handle: LedgerHandle,

    /// Direct storage access (for reads)
    storage: Arc<Storage>,
}

impl Inventory {
    /// Create an inventory view; obtained via [`crate::Ledger::inventory`]
    pub(crate) fn new(handle: LedgerHandle, storage: Arc<Storage>) -> Self {
        Self { handle, storage }
    }

    /// Grant a serialized copy to an account.
    ///
    /// Used on mint paths outside a purchase. Granting the same serial to the
    /// same owner again stacks the copy (`count + 1`); a serial already minted
    /// to another owner is a `Conflict`.
    pub async fn grant_copy(&self, owner: AccountId, item_id: Uuid, serial: u64) -> Result<()> {
        self.handle.grant_copy(owner, item_id, serial).await
    }

    /// Reassign a serialized copy between accounts.
    ///
    /// Fails `NotOwned` when the copy's current owner isn't `from`, and
    /// `AlreadyTransferred` when a previous transfer already moved it to `to`.
    pub async fn transfer_copy(
        &self,
        item_id: Uuid,
        serial: u64,
        from: AccountId,
        to: AccountId,
    ) -> Result<()> {
        self.handle.transfer_copy(item_id, serial, from, to).await
    }

    /// Serials of one item owned by an account, with stacked counts
    pub fn count_owned(&self, owner: &AccountId, item_id: Uuid) -> Result<Vec<OwnedStack>> {
        let copies = self.storage.copies_owned(owner, item_id)?;
        Ok(copies
            .into_iter()
            .map(|copy| OwnedStack {
                serial: copy.serial,
                count: copy.count,
            })
            .collect())
    }

    /// Get one copy by item and serial
    pub fn copy(&self, item_id: Uuid, serial: u64) -> Result<OwnershipCopy> {
        self.storage.get_copy(item_id, serial)
    }
}
