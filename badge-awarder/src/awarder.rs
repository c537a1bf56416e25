//! Threshold-based badge granting

use crate::{bus::EventStream, types::EconomyEvent, Result};
use ledger_core::{BadgeKind, Ledger};
use std::sync::Arc;

/// Donations required for the seasoned-donor badge
pub const DONATION_BADGE_THRESHOLD: u32 = 10;

/// Grants one-time badges in reaction to completed operations.
///
/// Grants go through the ledger actor's check-and-insert, so delivering the
/// same event twice (at-least-once buses do) produces exactly one grant row.
pub struct BadgeAwarder {
    ledger: Arc<Ledger>,
}

impl BadgeAwarder {
    /// Create an awarder over the given ledger
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// React to one event
    pub async fn handle_event(&self, event: EconomyEvent) -> Result<()> {
        match event {
            EconomyEvent::DonationCompleted {
                account,
                donation_count,
            } => {
                if donation_count < DONATION_BADGE_THRESHOLD {
                    return Ok(());
                }

                let newly_granted = self
                    .ledger
                    .grant_badge(account.clone(), BadgeKind::SeasonedDonor)
                    .await?;
                if newly_granted {
                    tracing::info!(
                        account = %account,
                        donation_count,
                        "Seasoned-donor badge granted"
                    );
                }
            }
            EconomyEvent::PurchaseCompleted { account, .. } => {
                let newly_granted = self
                    .ledger
                    .grant_badge(account.clone(), BadgeKind::FirstPurchase)
                    .await?;
                if newly_granted {
                    tracing::info!(account = %account, "First-purchase badge granted");
                }
            }
        }

        Ok(())
    }

    /// Consume events until the bus closes.
    ///
    /// Failures are logged and skipped: recognition must never disturb the
    /// request path, and a missed grant is retried by the next event.
    pub async fn run(self, mut events: EventStream) {
        while let Some(event) = events.recv().await {
            if let Err(err) = self.handle_event(event).await {
                tracing::warn!(error = %err, "Badge award failed");
            }
        }
        tracing::debug!("Badge awarder stopped");
    }
}

/// Spawn the awarder as a background task
pub fn spawn_badge_awarder(ledger: Arc<Ledger>, events: EventStream) -> tokio::task::JoinHandle<()> {
    let awarder = BadgeAwarder::new(ledger);
    tokio::spawn(awarder.run(events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::Config;
    use uuid::Uuid;

    async fn test_ledger() -> Arc<Ledger> {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        std::mem::forget(temp_dir);

        Arc::new(Ledger::open(config).await.unwrap())
    }

    #[tokio::test]
    async fn test_donation_badge_at_threshold() {
        let ledger = test_ledger().await;
        let awarder = BadgeAwarder::new(ledger.clone());

        let donor = ledger.create_account("donor", 0, 0).await.unwrap();

        awarder
            .handle_event(EconomyEvent::DonationCompleted {
                account: donor.id.clone(),
                donation_count: DONATION_BADGE_THRESHOLD,
            })
            .await
            .unwrap();

        assert!(ledger
            .badge(&donor.id, BadgeKind::SeasonedDonor)
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_donation_badge_below_threshold() {
        let ledger = test_ledger().await;
        let awarder = BadgeAwarder::new(ledger.clone());

        let donor = ledger.create_account("donor", 0, 0).await.unwrap();

        awarder
            .handle_event(EconomyEvent::DonationCompleted {
                account: donor.id.clone(),
                donation_count: DONATION_BADGE_THRESHOLD - 1,
            })
            .await
            .unwrap();

        assert!(ledger
            .badge(&donor.id, BadgeKind::SeasonedDonor)
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_double_delivery_grants_once() {
        let ledger = test_ledger().await;
        let awarder = BadgeAwarder::new(ledger.clone());

        let donor = ledger.create_account("donor", 0, 0).await.unwrap();

        // The tenth-donation event arrives twice
        let event = EconomyEvent::DonationCompleted {
            account: donor.id.clone(),
            donation_count: DONATION_BADGE_THRESHOLD,
        };
        awarder.handle_event(event.clone()).await.unwrap();
        awarder.handle_event(event).await.unwrap();

        let grant = ledger.badge(&donor.id, BadgeKind::SeasonedDonor).unwrap();
        assert!(grant.is_some());
        // A second grant would have overwritten granted_at; verify the row
        // is the idempotent first insert by granting directly and checking
        // the actor reports it as already present.
        assert!(!ledger
            .grant_badge(donor.id.clone(), BadgeKind::SeasonedDonor)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_first_purchase_badge() {
        let ledger = test_ledger().await;
        let awarder = BadgeAwarder::new(ledger.clone());

        let buyer = ledger.create_account("buyer", 0, 0).await.unwrap();

        let event = EconomyEvent::PurchaseCompleted {
            account: buyer.id.clone(),
            item_id: Uuid::new_v4(),
            serial: 1,
            price: 50,
        };
        awarder.handle_event(event.clone()).await.unwrap();
        awarder.handle_event(event).await.unwrap();

        assert!(ledger
            .badge(&buyer.id, BadgeKind::FirstPurchase)
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_spawned_awarder_consumes_bus() {
        let ledger = test_ledger().await;
        let donor = ledger.create_account("donor", 0, 0).await.unwrap();

        let (publisher, stream) = crate::bus::channel(16);
        let task = spawn_badge_awarder(ledger.clone(), stream);

        publisher.publish(EconomyEvent::DonationCompleted {
            account: donor.id.clone(),
            donation_count: DONATION_BADGE_THRESHOLD,
        });

        // Closing the bus lets the task drain and stop
        drop(publisher);
        task.await.unwrap();

        assert!(ledger
            .badge(&donor.id, BadgeKind::SeasonedDonor)
            .unwrap()
            .is_some());
    }
}
