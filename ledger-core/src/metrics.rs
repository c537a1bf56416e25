//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the economy core.
//!
//! # Metrics
//!
//! - `economy_transfers_total` - Committed double-entry transfers
//! - `economy_purchases_total` - Committed purchases (primary and resale)
//! - `economy_conflicts_total` - Commands lost to a race (conflict class)
//! - `economy_commit_duration_seconds` - Histogram of command latencies
//! - `economy_listings_active` - Currently active resale listings

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Committed double-entry transfers
    pub transfers_total: IntCounter,

    /// Committed purchases (primary and resale)
    pub purchases_total: IntCounter,

    /// Commands that lost a race (Conflict / OutOfStock / AlreadyTransferred)
    pub conflicts_total: IntCounter,

    /// Command latency histogram
    pub commit_duration: Histogram,

    /// Currently active resale listings
    pub listings_active: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let transfers_total = IntCounter::new(
            "economy_transfers_total",
            "Committed double-entry transfers",
        )?;
        registry.register(Box::new(transfers_total.clone()))?;

        let purchases_total = IntCounter::new(
            "economy_purchases_total",
            "Committed purchases (primary and resale)",
        )?;
        registry.register(Box::new(purchases_total.clone()))?;

        let conflicts_total = IntCounter::new(
            "economy_conflicts_total",
            "Commands lost to a concurrent writer",
        )?;
        registry.register(Box::new(conflicts_total.clone()))?;

        let commit_duration = Histogram::with_opts(
            HistogramOpts::new(
                "economy_commit_duration_seconds",
                "Histogram of command latencies",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250]),
        )?;
        registry.register(Box::new(commit_duration.clone()))?;

        let listings_active = IntGauge::new(
            "economy_listings_active",
            "Currently active resale listings",
        )?;
        registry.register(Box::new(listings_active.clone()))?;

        Ok(Self {
            transfers_total,
            purchases_total,
            conflicts_total,
            commit_duration,
            listings_active,
            registry,
        })
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.transfers_total.get(), 0);
        assert_eq!(metrics.conflicts_total.get(), 0);
    }

    #[test]
    fn test_metrics_independent_registries() {
        // Each collector owns its registry, so repeated construction works
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();

        first.transfers_total.inc();
        assert_eq!(first.transfers_total.get(), 1);
        assert_eq!(second.transfers_total.get(), 0);
    }

    #[test]
    fn test_listings_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.listings_active.inc();
        metrics.listings_active.inc();
        metrics.listings_active.dec();
        assert_eq!(metrics.listings_active.get(), 1);
    }
}
