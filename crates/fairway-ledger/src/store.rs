//! Append-only event storage partitioned by tenant.

use crate::event::RevenueEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use fairway_common::{
    DateRange, EventId, LedgerPolicy, PlatformError, PlatformResult, TenantId,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Storage contract for the revenue ledger.
///
/// Implementations must keep each tenant partition ordered by
/// `(occurred_at, id)` and reject any event id seen before. Queries return a
/// snapshot: events appended after the call starts do not appear in its
/// result.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends one validated event. Duplicate ids are rejected.
    async fn append(&self, event: RevenueEvent) -> PlatformResult<()>;

    /// Returns events in `range` ordered by `(occurred_at, id)`.
    ///
    /// `tenant` narrows the query to one partition; `None` spans the whole
    /// platform.
    async fn query(
        &self,
        tenant: Option<TenantId>,
        range: &DateRange,
    ) -> PlatformResult<Vec<RevenueEvent>>;

    /// Number of stored events, optionally for one tenant.
    async fn count(&self, tenant: Option<TenantId>) -> PlatformResult<usize>;

    /// Monotonic write counter, bumped on every successful append.
    ///
    /// Cached aggregates stamp the generation they were computed at and treat
    /// a mismatch as stale.
    async fn generation(&self, tenant: Option<TenantId>) -> PlatformResult<u64>;
}

#[derive(Default)]
struct TenantPartition {
    /// Kept sorted by `(occurred_at, id)`.
    events: Vec<RevenueEvent>,
    generation: u64,
}

/// In-memory [`EventStore`] backed by per-tenant partitions.
///
/// Each partition lives in its own map shard, so appends for different
/// tenants do not contend. A query clones the partition under its lock, which
/// is the snapshot boundary: concurrent appends land before or after the
/// clone, never inside it.
pub struct InMemoryEventStore {
    partitions: DashMap<TenantId, TenantPartition>,
    seen_ids: DashSet<EventId>,
    global_generation: AtomicU64,
    policy: LedgerPolicy,
}

impl InMemoryEventStore {
    /// Creates an empty store using the given admission policy.
    pub fn new(policy: LedgerPolicy) -> Self {
        Self {
            partitions: DashMap::new(),
            seen_ids: DashSet::new(),
            global_generation: AtomicU64::new(0),
            policy,
        }
    }

    fn sorted_insert(events: &mut Vec<RevenueEvent>, event: RevenueEvent) {
        let pos = events
            .partition_point(|existing| (existing.occurred_at, existing.id) <= (event.occurred_at, event.id));
        events.insert(pos, event);
    }

    fn in_range(event: &RevenueEvent, range: &DateRange) -> bool {
        range.contains(event.occurred_at)
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new(LedgerPolicy::default())
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: RevenueEvent) -> PlatformResult<()> {
        event.validate(&self.policy, Utc::now())?;

        // Claiming the id before touching the partition keeps duplicate
        // rejection race-free across shards.
        if !self.seen_ids.insert(event.id) {
            return Err(PlatformError::DuplicateEvent(event.id));
        }

        let tenant_id = event.tenant_id;
        let event_id = event.id;
        {
            let mut partition = self.partitions.entry(tenant_id).or_default();
            Self::sorted_insert(&mut partition.events, event);
            partition.generation += 1;
        }
        self.global_generation.fetch_add(1, Ordering::SeqCst);

        debug!(tenant = %tenant_id, event = %event_id, "event appended");
        Ok(())
    }

    async fn query(
        &self,
        tenant: Option<TenantId>,
        range: &DateRange,
    ) -> PlatformResult<Vec<RevenueEvent>> {
        match tenant {
            Some(tenant_id) => {
                let events = match self.partitions.get(&tenant_id) {
                    Some(partition) => partition
                        .events
                        .iter()
                        .filter(|event| Self::in_range(event, range))
                        .cloned()
                        .collect(),
                    None => Vec::new(),
                };
                Ok(events)
            }
            None => {
                let mut events: Vec<RevenueEvent> = Vec::new();
                for partition in self.partitions.iter() {
                    events.extend(
                        partition
                            .events
                            .iter()
                            .filter(|event| Self::in_range(event, range))
                            .cloned(),
                    );
                }
                events.sort_by_key(|event| (event.occurred_at, event.id));
                Ok(events)
            }
        }
    }

    async fn count(&self, tenant: Option<TenantId>) -> PlatformResult<usize> {
        let count = match tenant {
            Some(tenant_id) => self
                .partitions
                .get(&tenant_id)
                .map(|partition| partition.events.len())
                .unwrap_or(0),
            None => self
                .partitions
                .iter()
                .map(|partition| partition.events.len())
                .sum(),
        };
        Ok(count)
    }

    async fn generation(&self, tenant: Option<TenantId>) -> PlatformResult<u64> {
        let generation = match tenant {
            Some(tenant_id) => self
                .partitions
                .get(&tenant_id)
                .map(|partition| partition.generation)
                .unwrap_or(0),
            None => self.global_generation.load(Ordering::SeqCst),
        };
        Ok(generation)
    }
}

/// Widest queryable range, for reads that need the full partition history.
pub fn full_history() -> DateRange {
    DateRange {
        start: DateTime::<Utc>::MIN_UTC,
        end: DateTime::<Utc>::MAX_UTC,
    }
}

/// Everything recorded strictly before `end`.
pub fn history_until(end: DateTime<Utc>) -> DateRange {
    DateRange {
        start: DateTime::<Utc>::MIN_UTC,
        end,
    }
}
