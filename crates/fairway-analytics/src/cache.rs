//! Generation-stamped cache for computed metrics.

use crate::metrics::RevenueMetrics;
use fairway_common::{DateRange, TenantId};
use moka::sync::Cache;
use std::time::Duration;

/// Scope + bucket a metrics result was computed for. `None` is platform-wide.
type MetricsKey = (Option<TenantId>, DateRange);

/// Caches computed metrics keyed by (scope, bucket), stamped with the ledger
/// generation they were computed from.
///
/// A hit is only served when the stored generation matches the caller's
/// current one; any append since computation bumps the generation and the
/// stale entry reads as a miss.
pub struct MetricsCache {
    cache: Cache<MetricsKey, (u64, RevenueMetrics)>,
    capacity: u64,
}

impl MetricsCache {
    pub fn new(capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(Duration::from_secs(300))
            .build();

        Self { cache, capacity }
    }

    /// Look up metrics, treating generation mismatches as misses.
    pub fn get(
        &self,
        tenant: Option<TenantId>,
        bucket: &DateRange,
        current_generation: u64,
    ) -> Option<RevenueMetrics> {
        let (generation, metrics) = self.cache.get(&(tenant, *bucket))?;
        if generation == current_generation {
            Some(metrics)
        } else {
            None
        }
    }

    pub fn insert(
        &self,
        tenant: Option<TenantId>,
        bucket: DateRange,
        generation: u64,
        metrics: RevenueMetrics,
    ) {
        self.cache.insert((tenant, bucket), (generation, metrics));
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    pub fn len(&self) -> usize {
        self.cache.run_pending_tasks();
        self.cache.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

impl Default for MetricsCache {
    fn default() -> Self {
        Self::new(4096)
    }
}
