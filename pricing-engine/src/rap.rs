//! Recent average price (RAP) over a trailing window

use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use ledger_core::SaleSample;
use serde::{Deserialize, Serialize};

/// RAP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RapConfig {
    /// Trailing window length in days
    pub window_days: i64,
}

impl Default for RapConfig {
    fn default() -> Self {
        Self { window_days: 60 }
    }
}

/// Computes the trailing-window mean of completed sale prices.
///
/// The mean is floored to an integer; currency has no fractional units.
#[derive(Debug, Clone)]
pub struct RapCalculator {
    window: Duration,
}

impl RapCalculator {
    /// Create a calculator from configuration
    pub fn new(config: RapConfig) -> Result<Self> {
        if config.window_days <= 0 {
            return Err(Error::InvalidConfig(format!(
                "RAP window must be positive, got {} days",
                config.window_days
            )));
        }

        Ok(Self {
            window: Duration::days(config.window_days),
        })
    }

    /// Start of the trailing window ending at `now`
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window
    }

    /// Arithmetic mean of sale amounts inside the trailing window, floored.
    ///
    /// Returns `None` when the window contains no sales; callers render that
    /// as "pending". Samples must already be filtered to the item in question
    /// (the sale index never carries donations or transfers of other items).
    pub fn recent_average_price(
        &self,
        sales: &[SaleSample],
        now: DateTime<Utc>,
    ) -> Option<u64> {
        let start = self.window_start(now);

        let mut sum = 0u128;
        let mut count = 0u128;
        for sale in sales {
            if sale.occurred_at >= start {
                sum += sale.amount as u128;
                count += 1;
            }
        }

        if count == 0 {
            return None;
        }

        Some((sum / count) as u64)
    }
}
