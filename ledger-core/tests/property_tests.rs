//! Property-based tests for economy invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Currency conservation: the ticket supply is invariant across transfers
//! - Balance safety: a failed transfer changes nothing
//! - Stock bound: stock + quantity_sold == original_stock, always
//! - Conversion: floor rounding, full bit balance consumed

use ledger_core::{
    types::{tickets_for_bits, Item, LimitedItem, BITS_PER_BLOCK, TICKETS_PER_BLOCK},
    AccountId, Config, Currency, Error, Ledger, TransferKind,
};
use chrono::Utc;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use uuid::Uuid;

/// Create test ledger backed by a throwaway directory
async fn create_test_ledger() -> Ledger {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();
    std::mem::forget(temp_dir);

    Ledger::open(config).await.unwrap()
}

fn limited_item(author: &AccountId, price: u64, stock: u32) -> LimitedItem {
    LimitedItem {
        id: Uuid::new_v4(),
        name: "Prop Relic".to_string(),
        fixed_price: price,
        original_stock: stock,
        stock,
        quantity_sold: 0,
        on_sale: true,
        author: author.clone(),
        created_at: Utc::now(),
    }
}

proptest! {
    /// Property: conversion credits whole blocks plus a floored remainder
    #[test]
    fn prop_conversion_floor_formula(bits in 0u64..10_000_000) {
        let tickets = tickets_for_bits(bits);
        let expected =
            (bits / BITS_PER_BLOCK) * TICKETS_PER_BLOCK
                + (bits % BITS_PER_BLOCK) * TICKETS_PER_BLOCK / BITS_PER_BLOCK;
        prop_assert_eq!(tickets, expected);

        // Never credits more than the exact rate
        prop_assert!(tickets * BITS_PER_BLOCK <= bits * TICKETS_PER_BLOCK);
    }

    /// Property: conversion is monotonic in the bit balance
    #[test]
    fn prop_conversion_monotonic(bits in 0u64..1_000_000) {
        prop_assert!(tickets_for_bits(bits) <= tickets_for_bits(bits + 1));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    /// Property: the total ticket supply is invariant across any sequence of
    /// transfer attempts, successful or not
    #[test]
    fn prop_transfers_conserve_supply(
        balances in prop::collection::vec(0u64..1_000, 2..5),
        moves in prop::collection::vec((0usize..5, 0usize..5, 1u64..500), 1..20),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ledger = create_test_ledger().await;

            let mut ids = Vec::new();
            for (i, tickets) in balances.iter().enumerate() {
                let account = ledger
                    .create_account(format!("acct-{}", i), *tickets, 0)
                    .await
                    .unwrap();
                ids.push(account.id);
            }

            let supply: u64 = balances.iter().sum();

            for (from, to, amount) in moves {
                let from = ids[from % ids.len()].clone();
                let to = ids[to % ids.len()].clone();
                let before_from = ledger.account(&from).unwrap().ticket_balance;
                let before_to = ledger.account(&to).unwrap().ticket_balance;

                let result = ledger
                    .transfer(
                        amount,
                        Currency::Tickets,
                        from.clone(),
                        to.clone(),
                        TransferKind::Donation,
                        None,
                        "prop move",
                    )
                    .await;

                match result {
                    Ok(_) => {
                        prop_assert_eq!(
                            ledger.account(&from).unwrap().ticket_balance,
                            before_from - amount
                        );
                        prop_assert_eq!(
                            ledger.account(&to).unwrap().ticket_balance,
                            before_to + amount
                        );
                    }
                    Err(Error::Validation(_)) | Err(Error::InsufficientFunds(_)) => {
                        // A rejected transfer must leave both balances untouched
                        prop_assert_eq!(ledger.account(&from).unwrap().ticket_balance, before_from);
                        prop_assert_eq!(ledger.account(&to).unwrap().ticket_balance, before_to);
                    }
                    Err(e) => return Err(TestCaseError::fail(format!("unexpected error: {}", e))),
                }

                let (total, _) = ledger.total_balances().unwrap();
                prop_assert_eq!(total, supply);
            }

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: selling out a limited item yields distinct serials 1..=stock,
    /// holds the stock invariant throughout, and the next buy is OutOfStock
    #[test]
    fn prop_sellout_exhausts_stock(stock in 1u32..12, price in 1u64..100) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ledger = create_test_ledger().await;

            let author = ledger.create_account("author", 0, 0).await.unwrap();
            let item = limited_item(&author.id, price, stock);
            let item_id = item.id;
            ledger.publish_item(Item::Limited(item)).await.unwrap();

            let mut serials = Vec::new();
            for i in 0..stock {
                let buyer = ledger
                    .create_account(format!("buyer-{}", i), price, 0)
                    .await
                    .unwrap();
                let outcome = ledger.purchase(buyer.id, item_id, price).await.unwrap();
                serials.push(outcome.serial);

                match ledger.item(item_id).unwrap() {
                    Item::Limited(limited) => prop_assert!(limited.stock_invariant_holds()),
                    Item::Catalog(_) => return Err(TestCaseError::fail("expected limited item")),
                }
            }

            serials.sort_unstable();
            serials.dedup();
            prop_assert_eq!(serials.len(), stock as usize);
            prop_assert_eq!(*serials.first().unwrap(), 1);
            prop_assert_eq!(*serials.last().unwrap(), stock as u64);

            // Author was paid once per unit
            prop_assert_eq!(
                ledger.account(&author.id).unwrap().ticket_balance,
                price * stock as u64
            );

            let late = ledger.create_account("late-buyer", price, 0).await.unwrap();
            let result = ledger.purchase(late.id, item_id, price).await;
            prop_assert!(matches!(result, Err(Error::OutOfStock(_))));

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: converting always zeroes the bit balance and mints the
    /// floored ticket amount
    #[test]
    fn prop_conversion_consumes_full_balance(bits in 100u64..100_000, tickets in 0u64..1_000) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ledger = create_test_ledger().await;

            let account = ledger.create_account("converter", tickets, bits).await.unwrap();
            let outcome = ledger.convert_bits_to_tickets(account.id.clone()).await.unwrap();

            prop_assert_eq!(outcome.bits_spent, bits);
            prop_assert_eq!(outcome.tickets_minted, tickets_for_bits(bits));
            prop_assert_eq!(outcome.bit_balance, 0);
            prop_assert_eq!(outcome.ticket_balance, tickets + tickets_for_bits(bits));

            let after = ledger.account(&account.id).unwrap();
            prop_assert_eq!(after.bit_balance, 0);

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }
}
