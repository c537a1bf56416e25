//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `accounts` - Account balances (key: account_id)
//! - `items` - Catalog and limited items (key: item_id)
//! - `copies` - Serialized ownership copies (key: item_id || serial)
//! - `listings` - Active resale listings (key: listing_id)
//! - `transactions` - Append-only transfer legs (key: transaction_id)
//! - `badges` - One-time badge grants (key: account_id || kind)
//! - `indices` - Secondary indices under one-byte tags
//!
//! Mutations are staged into a [`rocksdb::WriteBatch`] and committed in one
//! atomic write; readers never observe a partially applied operation.

use crate::{
    error::{Error, Result},
    types::{
        Account, AccountId, BadgeGrant, BadgeKind, Item, OwnershipCopy, ResaleListing, SaleSample,
        Transaction,
    },
    Config,
};
use chrono::{DateTime, Utc};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, Direction, IteratorMode, Options,
    WriteBatch, DB,
};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_ACCOUNTS: &str = "accounts";
const CF_ITEMS: &str = "items";
const CF_COPIES: &str = "copies";
const CF_LISTINGS: &str = "listings";
const CF_TRANSACTIONS: &str = "transactions";
const CF_BADGES: &str = "badges";
const CF_INDICES: &str = "indices";

/// Index tags (first key byte in the `indices` column family)
const IDX_OWNER_COPY: u8 = 1;
const IDX_ITEM_LISTING: u8 = 2;
const IDX_SERIAL_LISTING: u8 = 3;
const IDX_ITEM_SALE: u8 = 4;
const IDX_ACCOUNT_TXN: u8 = 5;

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        // Universal compaction for write-heavy workload
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_state()),
            ColumnFamilyDescriptor::new(CF_ITEMS, Self::cf_options_state()),
            ColumnFamilyDescriptor::new(CF_COPIES, Self::cf_options_state()),
            ColumnFamilyDescriptor::new(CF_LISTINGS, Self::cf_options_state()),
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_append_only()),
            ColumnFamilyDescriptor::new(CF_BADGES, Self::cf_options_state()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened RocksDB economy store");

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_state() -> Options {
        let mut opts = Options::default();
        // State rows are frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_append_only() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Indices benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false); // 10 bits per key
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Key helpers

    fn copy_key(item_id: &Uuid, serial: u64) -> Vec<u8> {
        let mut key = item_id.as_bytes().to_vec();
        key.extend_from_slice(&serial.to_be_bytes());
        key
    }

    fn badge_key(account: &AccountId, kind: BadgeKind) -> Vec<u8> {
        let mut key = account.as_str().as_bytes().to_vec();
        key.push(b'|');
        key.push(kind as u8);
        key
    }

    fn index_key_owner_copy(owner: &AccountId, item_id: &Uuid, serial: u64) -> Vec<u8> {
        let mut key = vec![IDX_OWNER_COPY];
        key.extend_from_slice(owner.as_str().as_bytes());
        key.push(b'|');
        key.extend_from_slice(item_id.as_bytes());
        key.extend_from_slice(&serial.to_be_bytes());
        key
    }

    fn index_prefix_owner_item(owner: &AccountId, item_id: &Uuid) -> Vec<u8> {
        let mut key = vec![IDX_OWNER_COPY];
        key.extend_from_slice(owner.as_str().as_bytes());
        key.push(b'|');
        key.extend_from_slice(item_id.as_bytes());
        key
    }

    // Big-endian price in the key keeps the iteration order price-ascending.
    fn index_key_item_listing(item_id: &Uuid, price: u64, listing_id: &Uuid) -> Vec<u8> {
        let mut key = vec![IDX_ITEM_LISTING];
        key.extend_from_slice(item_id.as_bytes());
        key.extend_from_slice(&price.to_be_bytes());
        key.extend_from_slice(listing_id.as_bytes());
        key
    }

    fn index_key_serial_listing(item_id: &Uuid, serial: u64) -> Vec<u8> {
        let mut key = vec![IDX_SERIAL_LISTING];
        key.extend_from_slice(item_id.as_bytes());
        key.extend_from_slice(&serial.to_be_bytes());
        key
    }

    fn index_key_item_sale(item_id: &Uuid, at: DateTime<Utc>, transfer_id: &Uuid) -> Vec<u8> {
        let mut key = vec![IDX_ITEM_SALE];
        key.extend_from_slice(item_id.as_bytes());
        key.extend_from_slice(&at.timestamp_nanos_opt().unwrap_or(0).to_be_bytes());
        key.extend_from_slice(transfer_id.as_bytes());
        key
    }

    fn index_key_account_txn(account: &AccountId, at: DateTime<Utc>, txn_id: &Uuid) -> Vec<u8> {
        let mut key = vec![IDX_ACCOUNT_TXN];
        key.extend_from_slice(account.as_str().as_bytes());
        key.push(b'|');
        key.extend_from_slice(&at.timestamp_nanos_opt().unwrap_or(0).to_be_bytes());
        key.extend_from_slice(txn_id.as_bytes());
        key
    }

    // Account operations

    /// Get account by ID
    pub fn get_account(&self, id: &AccountId) -> Result<Account> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        let value = self
            .db
            .get_cf(cf, id.as_str().as_bytes())?
            .ok_or_else(|| Error::NotFound(format!("account {}", id)))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Whether an account row exists
    pub fn has_account(&self, id: &AccountId) -> Result<bool> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        Ok(self.db.get_cf(cf, id.as_str().as_bytes())?.is_some())
    }

    /// Stage an account row into a batch
    pub fn stage_account(&self, batch: &mut WriteBatch, account: &Account) -> Result<()> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        batch.put_cf(cf, account.id.as_str().as_bytes(), bincode::serialize(account)?);
        Ok(())
    }

    /// All account rows (conservation audits, admin tooling)
    pub fn scan_accounts(&self) -> Result<Vec<Account>> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        let mut accounts = Vec::new();
        for entry in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = entry?;
            accounts.push(bincode::deserialize(&value)?);
        }
        Ok(accounts)
    }

    // Item operations

    /// Get item by ID
    pub fn get_item(&self, id: Uuid) -> Result<Item> {
        let cf = self.cf_handle(CF_ITEMS)?;
        let value = self
            .db
            .get_cf(cf, id.as_bytes())?
            .ok_or_else(|| Error::NotFound(format!("item {}", id)))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Whether an item row exists
    pub fn has_item(&self, id: Uuid) -> Result<bool> {
        let cf = self.cf_handle(CF_ITEMS)?;
        Ok(self.db.get_cf(cf, id.as_bytes())?.is_some())
    }

    /// Stage an item row into a batch
    pub fn stage_item(&self, batch: &mut WriteBatch, item: &Item) -> Result<()> {
        let cf = self.cf_handle(CF_ITEMS)?;
        batch.put_cf(cf, item.id().as_bytes(), bincode::serialize(item)?);
        Ok(())
    }

    // Copy operations

    /// Get copy by item and serial
    pub fn get_copy(&self, item_id: Uuid, serial: u64) -> Result<OwnershipCopy> {
        self.maybe_copy(item_id, serial)?
            .ok_or_else(|| Error::NotFound(format!("copy {}#{}", item_id, serial)))
    }

    /// Get copy by item and serial, if present
    pub fn maybe_copy(&self, item_id: Uuid, serial: u64) -> Result<Option<OwnershipCopy>> {
        let cf = self.cf_handle(CF_COPIES)?;
        let value = self.db.get_cf(cf, Self::copy_key(&item_id, serial))?;
        value.map(|v| bincode::deserialize(&v).map_err(Error::from)).transpose()
    }

    /// Stage a copy row plus its owner index entry
    pub fn stage_copy(&self, batch: &mut WriteBatch, copy: &OwnershipCopy) -> Result<()> {
        let cf = self.cf_handle(CF_COPIES)?;
        batch.put_cf(
            cf,
            Self::copy_key(&copy.item_id, copy.serial),
            bincode::serialize(copy)?,
        );

        let cf_idx = self.cf_handle(CF_INDICES)?;
        batch.put_cf(
            cf_idx,
            Self::index_key_owner_copy(&copy.owner, &copy.item_id, copy.serial),
            b"",
        );
        Ok(())
    }

    /// Stage an ownership change: rewrite the copy row, move the owner index
    pub fn stage_copy_owner_change(
        &self,
        batch: &mut WriteBatch,
        copy: &OwnershipCopy,
        previous_owner: &AccountId,
    ) -> Result<()> {
        let cf_idx = self.cf_handle(CF_INDICES)?;
        batch.delete_cf(
            cf_idx,
            Self::index_key_owner_copy(previous_owner, &copy.item_id, copy.serial),
        );
        self.stage_copy(batch, copy)
    }

    /// Copies of one item owned by one account
    pub fn copies_owned(&self, owner: &AccountId, item_id: Uuid) -> Result<Vec<OwnershipCopy>> {
        let cf_idx = self.cf_handle(CF_INDICES)?;
        let prefix = Self::index_prefix_owner_item(owner, &item_id);

        let mut copies = Vec::new();
        for entry in self.db.prefix_iterator_cf(cf_idx, &prefix) {
            let (key, _) = entry?;
            if !key.starts_with(&prefix) {
                break;
            }

            let serial_bytes: [u8; 8] = key[key.len() - 8..]
                .try_into()
                .map_err(|_| Error::Storage("malformed owner-copy index key".to_string()))?;
            let serial = u64::from_be_bytes(serial_bytes);

            copies.push(self.get_copy(item_id, serial)?);
        }

        Ok(copies)
    }

    // Listing operations

    /// Get listing by ID
    pub fn get_listing(&self, id: Uuid) -> Result<ResaleListing> {
        self.maybe_listing(id)?
            .ok_or_else(|| Error::NotFound(format!("listing {}", id)))
    }

    /// Get listing by ID, if present
    pub fn maybe_listing(&self, id: Uuid) -> Result<Option<ResaleListing>> {
        let cf = self.cf_handle(CF_LISTINGS)?;
        let value = self.db.get_cf(cf, id.as_bytes())?;
        value.map(|v| bincode::deserialize(&v).map_err(Error::from)).transpose()
    }

    /// Listing ID currently backed by a given serial, if any
    pub fn listing_id_for_serial(&self, item_id: Uuid, serial: u64) -> Result<Option<Uuid>> {
        let cf_idx = self.cf_handle(CF_INDICES)?;
        let value = self
            .db
            .get_cf(cf_idx, Self::index_key_serial_listing(&item_id, serial))?;

        match value {
            Some(bytes) => {
                let id_bytes: [u8; 16] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| Error::Storage("malformed serial-listing index".to_string()))?;
                Ok(Some(Uuid::from_bytes(id_bytes)))
            }
            None => Ok(None),
        }
    }

    /// Stage a listing row plus its indices
    pub fn stage_listing(&self, batch: &mut WriteBatch, listing: &ResaleListing) -> Result<()> {
        let cf = self.cf_handle(CF_LISTINGS)?;
        batch.put_cf(cf, listing.id.as_bytes(), bincode::serialize(listing)?);

        let cf_idx = self.cf_handle(CF_INDICES)?;
        batch.put_cf(
            cf_idx,
            Self::index_key_item_listing(&listing.item_id, listing.price, &listing.id),
            b"",
        );
        batch.put_cf(
            cf_idx,
            Self::index_key_serial_listing(&listing.item_id, listing.serial),
            listing.id.as_bytes(),
        );
        Ok(())
    }

    /// Stage deletion of a listing row plus its indices
    pub fn stage_delete_listing(&self, batch: &mut WriteBatch, listing: &ResaleListing) -> Result<()> {
        let cf = self.cf_handle(CF_LISTINGS)?;
        batch.delete_cf(cf, listing.id.as_bytes());

        let cf_idx = self.cf_handle(CF_INDICES)?;
        batch.delete_cf(
            cf_idx,
            Self::index_key_item_listing(&listing.item_id, listing.price, &listing.id),
        );
        batch.delete_cf(
            cf_idx,
            Self::index_key_serial_listing(&listing.item_id, listing.serial),
        );
        Ok(())
    }

    /// Active listings for an item, cheapest first
    pub fn listings_for_item(&self, item_id: Uuid) -> Result<Vec<ResaleListing>> {
        let cf_idx = self.cf_handle(CF_INDICES)?;
        let mut prefix = vec![IDX_ITEM_LISTING];
        prefix.extend_from_slice(item_id.as_bytes());

        let mut listings = Vec::new();
        for entry in self.db.prefix_iterator_cf(cf_idx, &prefix) {
            let (key, _) = entry?;
            if !key.starts_with(&prefix) {
                break;
            }

            let id_bytes: [u8; 16] = key[key.len() - 16..]
                .try_into()
                .map_err(|_| Error::Storage("malformed item-listing index key".to_string()))?;
            listings.push(self.get_listing(Uuid::from_bytes(id_bytes))?);
        }

        Ok(listings)
    }

    // Transaction operations

    /// Get transaction leg by ID
    pub fn get_transaction(&self, id: Uuid) -> Result<Transaction> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        let value = self
            .db
            .get_cf(cf, id.as_bytes())?
            .ok_or_else(|| Error::NotFound(format!("transaction {}", id)))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Stage a transaction leg plus its account-history index entry
    pub fn stage_transaction(&self, batch: &mut WriteBatch, txn: &Transaction) -> Result<()> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        batch.put_cf(cf, txn.id.as_bytes(), bincode::serialize(txn)?);

        let account = match txn.direction {
            crate::types::TransferDirection::Outbound => &txn.from,
            crate::types::TransferDirection::Inbound => &txn.to,
        };

        let cf_idx = self.cf_handle(CF_INDICES)?;
        batch.put_cf(
            cf_idx,
            Self::index_key_account_txn(account, txn.created_at, &txn.id),
            b"",
        );
        Ok(())
    }

    /// Stage the per-item sale index entry for one committed sale pair
    pub fn stage_sale_index(
        &self,
        batch: &mut WriteBatch,
        item_id: Uuid,
        transfer_id: Uuid,
        sample: &SaleSample,
    ) -> Result<()> {
        let cf_idx = self.cf_handle(CF_INDICES)?;
        batch.put_cf(
            cf_idx,
            Self::index_key_item_sale(&item_id, sample.occurred_at, &transfer_id),
            bincode::serialize(sample)?,
        );
        Ok(())
    }

    /// Transaction legs recorded for an account, oldest first
    pub fn transactions_for_account(&self, account: &AccountId) -> Result<Vec<Transaction>> {
        let cf_idx = self.cf_handle(CF_INDICES)?;
        let mut prefix = vec![IDX_ACCOUNT_TXN];
        prefix.extend_from_slice(account.as_str().as_bytes());
        prefix.push(b'|');

        let mut txns = Vec::new();
        for entry in self.db.prefix_iterator_cf(cf_idx, &prefix) {
            let (key, _) = entry?;
            if !key.starts_with(&prefix) {
                break;
            }

            let id_bytes: [u8; 16] = key[key.len() - 16..]
                .try_into()
                .map_err(|_| Error::Storage("malformed account-txn index key".to_string()))?;
            txns.push(self.get_transaction(Uuid::from_bytes(id_bytes))?);
        }

        Ok(txns)
    }

    /// Sale samples for an item committed at or after `since`, oldest first
    pub fn sales_for_item_since(&self, item_id: Uuid, since: DateTime<Utc>) -> Result<Vec<SaleSample>> {
        let cf_idx = self.cf_handle(CF_INDICES)?;
        let mut prefix = vec![IDX_ITEM_SALE];
        prefix.extend_from_slice(item_id.as_bytes());

        let mut start = prefix.clone();
        start.extend_from_slice(&since.timestamp_nanos_opt().unwrap_or(0).to_be_bytes());

        let mut samples = Vec::new();
        let iter = self
            .db
            .iterator_cf(cf_idx, IteratorMode::From(&start, Direction::Forward));
        for entry in iter {
            let (key, value) = entry?;
            if !key.starts_with(&prefix) {
                break;
            }
            samples.push(bincode::deserialize(&value)?);
        }

        Ok(samples)
    }

    // Badge operations

    /// Get badge grant, if present
    pub fn get_badge(&self, account: &AccountId, kind: BadgeKind) -> Result<Option<BadgeGrant>> {
        let cf = self.cf_handle(CF_BADGES)?;
        let value = self.db.get_cf(cf, Self::badge_key(account, kind))?;
        value.map(|v| bincode::deserialize(&v).map_err(Error::from)).transpose()
    }

    /// Stage a badge grant row
    pub fn stage_badge(&self, batch: &mut WriteBatch, grant: &BadgeGrant) -> Result<()> {
        let cf = self.cf_handle(CF_BADGES)?;
        batch.put_cf(
            cf,
            Self::badge_key(&grant.account, grant.kind),
            bincode::serialize(grant)?,
        );
        Ok(())
    }

    // Commit

    /// Atomically commit a staged batch
    pub fn commit(&self, batch: WriteBatch) -> Result<()> {
        self.db.write(batch)?;
        Ok(())
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            total_accounts: self.approximate_count(CF_ACCOUNTS)?,
            total_transactions: self.approximate_count(CF_TRANSACTIONS)?,
            total_listings: self.approximate_count(CF_LISTINGS)?,
        })
    }

    fn approximate_count(&self, cf_name: &str) -> Result<u64> {
        let cf = self.cf_handle(cf_name)?;
        // RocksDB property for approximate count
        let prop = self
            .db
            .property_int_value_cf(cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);
        Ok(prop)
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Approximate account rows
    pub total_accounts: u64,
    /// Approximate transaction legs
    pub total_transactions: u64,
    /// Approximate active listings
    pub total_listings: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Currency, TransferDirection, TransferKind};
    use tempfile::TempDir;

    fn test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Storage::open(&config).unwrap(), temp_dir)
    }

    fn test_account(id: &str, tickets: u64) -> Account {
        Account::new(AccountId::new(id), tickets, 0)
    }

    #[test]
    fn test_storage_open() {
        let (storage, _temp) = test_storage();
        assert!(storage.db.cf_handle(CF_ACCOUNTS).is_some());
        assert!(storage.db.cf_handle(CF_INDICES).is_some());
    }

    #[test]
    fn test_account_roundtrip() {
        let (storage, _temp) = test_storage();

        let account = test_account("user-1", 500);
        let mut batch = WriteBatch::default();
        storage.stage_account(&mut batch, &account).unwrap();
        storage.commit(batch).unwrap();

        let loaded = storage.get_account(&account.id).unwrap();
        assert_eq!(loaded.ticket_balance, 500);
        assert!(storage.has_account(&account.id).unwrap());
        assert!(!storage.has_account(&AccountId::new("missing")).unwrap());
    }

    #[test]
    fn test_copy_owner_index_follows_transfer() {
        let (storage, _temp) = test_storage();
        let item_id = Uuid::new_v4();
        let alice = AccountId::new("alice");
        let bob = AccountId::new("bob");

        let copy = OwnershipCopy {
            item_id,
            serial: 1,
            owner: alice.clone(),
            count: 1,
        };

        let mut batch = WriteBatch::default();
        storage.stage_copy(&mut batch, &copy).unwrap();
        storage.commit(batch).unwrap();

        assert_eq!(storage.copies_owned(&alice, item_id).unwrap().len(), 1);

        // Move ownership to bob
        let moved = OwnershipCopy {
            owner: bob.clone(),
            ..copy.clone()
        };
        let mut batch = WriteBatch::default();
        storage.stage_copy_owner_change(&mut batch, &moved, &alice).unwrap();
        storage.commit(batch).unwrap();

        assert!(storage.copies_owned(&alice, item_id).unwrap().is_empty());
        let bobs = storage.copies_owned(&bob, item_id).unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].serial, 1);
    }

    #[test]
    fn test_listings_sorted_by_price() {
        let (storage, _temp) = test_storage();
        let item_id = Uuid::new_v4();

        let mut batch = WriteBatch::default();
        for (serial, price) in [(1u64, 300u64), (2, 150), (3, 220)] {
            let listing = ResaleListing {
                id: Uuid::now_v7(),
                seller: AccountId::new("seller"),
                item_id,
                serial,
                price,
                created_at: Utc::now(),
            };
            storage.stage_listing(&mut batch, &listing).unwrap();
        }
        storage.commit(batch).unwrap();

        let listings = storage.listings_for_item(item_id).unwrap();
        let prices: Vec<u64> = listings.iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![150, 220, 300]);

        // Unrelated item sees nothing
        assert!(storage.listings_for_item(Uuid::new_v4()).unwrap().is_empty());
    }

    #[test]
    fn test_delete_listing_removes_indices() {
        let (storage, _temp) = test_storage();
        let item_id = Uuid::new_v4();

        let listing = ResaleListing {
            id: Uuid::now_v7(),
            seller: AccountId::new("seller"),
            item_id,
            serial: 7,
            price: 99,
            created_at: Utc::now(),
        };

        let mut batch = WriteBatch::default();
        storage.stage_listing(&mut batch, &listing).unwrap();
        storage.commit(batch).unwrap();

        assert_eq!(
            storage.listing_id_for_serial(item_id, 7).unwrap(),
            Some(listing.id)
        );

        let mut batch = WriteBatch::default();
        storage.stage_delete_listing(&mut batch, &listing).unwrap();
        storage.commit(batch).unwrap();

        assert!(storage.maybe_listing(listing.id).unwrap().is_none());
        assert!(storage.listing_id_for_serial(item_id, 7).unwrap().is_none());
        assert!(storage.listings_for_item(item_id).unwrap().is_empty());
    }

    #[test]
    fn test_sale_index_window_scan() {
        let (storage, _temp) = test_storage();
        let item_id = Uuid::new_v4();
        let now = Utc::now();

        let mut batch = WriteBatch::default();
        for (amount, days_ago) in [(100u64, 90i64), (200, 30), (300, 1)] {
            let sample = SaleSample {
                amount,
                occurred_at: now - chrono::Duration::days(days_ago),
            };
            storage
                .stage_sale_index(&mut batch, item_id, Uuid::now_v7(), &sample)
                .unwrap();
        }
        storage.commit(batch).unwrap();

        let since = now - chrono::Duration::days(60);
        let samples = storage.sales_for_item_since(item_id, since).unwrap();
        let amounts: Vec<u64> = samples.iter().map(|s| s.amount).collect();
        assert_eq!(amounts, vec![200, 300]);
    }

    #[test]
    fn test_transaction_history_index() {
        let (storage, _temp) = test_storage();
        let alice = AccountId::new("alice");
        let bob = AccountId::new("bob");

        let transfer_id = Uuid::now_v7();
        let now = Utc::now();
        let legs = [
            Transaction {
                id: Uuid::now_v7(),
                transfer_id,
                amount: 40,
                currency: Currency::Tickets,
                from: alice.clone(),
                to: bob.clone(),
                direction: TransferDirection::Outbound,
                kind: TransferKind::Donation,
                item_id: None,
                description: "donation".to_string(),
                created_at: now,
            },
            Transaction {
                id: Uuid::now_v7(),
                transfer_id,
                amount: 40,
                currency: Currency::Tickets,
                from: alice.clone(),
                to: bob.clone(),
                direction: TransferDirection::Inbound,
                kind: TransferKind::Donation,
                item_id: None,
                description: "donation".to_string(),
                created_at: now,
            },
        ];

        let mut batch = WriteBatch::default();
        for leg in &legs {
            storage.stage_transaction(&mut batch, leg).unwrap();
        }
        storage.commit(batch).unwrap();

        let alice_txns = storage.transactions_for_account(&alice).unwrap();
        assert_eq!(alice_txns.len(), 1);
        assert_eq!(alice_txns[0].direction, TransferDirection::Outbound);

        let bob_txns = storage.transactions_for_account(&bob).unwrap();
        assert_eq!(bob_txns.len(), 1);
        assert_eq!(bob_txns[0].direction, TransferDirection::Inbound);
    }

    #[test]
    fn test_badge_roundtrip() {
        let (storage, _temp) = test_storage();
        let account = AccountId::new("donor");

        assert!(storage.get_badge(&account, BadgeKind::SeasonedDonor).unwrap().is_none());

        let grant = BadgeGrant {
            account: account.clone(),
            kind: BadgeKind::SeasonedDonor,
            granted_at: Utc::now(),
        };
        let mut batch = WriteBatch::default();
        storage.stage_badge(&mut batch, &grant).unwrap();
        storage.commit(batch).unwrap();

        let loaded = storage.get_badge(&account, BadgeKind::SeasonedDonor).unwrap();
        assert!(loaded.is_some());
        assert!(storage.get_badge(&account, BadgeKind::FirstPurchase).unwrap().is_none());
    }
}
