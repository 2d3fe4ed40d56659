//! Per-tenant usage counters for the current billing period.
//!
//! Counters are fed from outside (API gateway, storage scanner, booking
//! service); this crate only stores and reads them. Resetting happens at
//! billing-period boundaries, driven by the caller.

use crate::model::GovernedResource;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fairway_common::{PlatformResult, TenantId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Snapshot of one tenant's consumption in the current billing period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantUsage {
    pub tenant_id: TenantId,
    /// When the current billing period began
    pub period_started_at: DateTime<Utc>,
    pub counters: HashMap<GovernedResource, u64>,
}

impl TenantUsage {
    pub fn empty(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            period_started_at: Utc::now(),
            counters: HashMap::new(),
        }
    }

    /// Counter value, zero when the resource has never been recorded.
    pub fn get(&self, resource: GovernedResource) -> u64 {
        self.counters.get(&resource).copied().unwrap_or(0)
    }
}

/// Store contract for usage counters.
#[async_trait]
pub trait UsageCounterStore: Send + Sync {
    /// Add to a counter, returning the new total.
    async fn record(
        &self,
        tenant: TenantId,
        resource: GovernedResource,
        amount: u64,
    ) -> PlatformResult<u64>;

    /// Overwrite a counter with an externally computed value.
    async fn replace(
        &self,
        tenant: TenantId,
        resource: GovernedResource,
        value: u64,
    ) -> PlatformResult<()>;

    /// Current snapshot. Tenants with no recorded usage read as empty.
    async fn usage(&self, tenant: TenantId) -> TenantUsage;

    /// Zero every counter and start a fresh billing period.
    async fn reset_period(&self, tenant: TenantId) -> PlatformResult<()>;
}

/// Sharded in-memory counter store.
pub struct InMemoryUsageStore {
    tenants: DashMap<TenantId, TenantUsage>,
}

impl InMemoryUsageStore {
    pub fn new() -> Self {
        Self {
            tenants: DashMap::new(),
        }
    }
}

impl Default for InMemoryUsageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UsageCounterStore for InMemoryUsageStore {
    async fn record(
        &self,
        tenant: TenantId,
        resource: GovernedResource,
        amount: u64,
    ) -> PlatformResult<u64> {
        let mut entry = self
            .tenants
            .entry(tenant)
            .or_insert_with(|| TenantUsage::empty(tenant));
        let counter = entry.counters.entry(resource).or_insert(0);
        *counter = counter.saturating_add(amount);
        Ok(*counter)
    }

    async fn replace(
        &self,
        tenant: TenantId,
        resource: GovernedResource,
        value: u64,
    ) -> PlatformResult<()> {
        let mut entry = self
            .tenants
            .entry(tenant)
            .or_insert_with(|| TenantUsage::empty(tenant));
        entry.counters.insert(resource, value);
        Ok(())
    }

    async fn usage(&self, tenant: TenantId) -> TenantUsage {
        self.tenants
            .get(&tenant)
            .map(|entry| entry.clone())
            .unwrap_or_else(|| TenantUsage::empty(tenant))
    }

    async fn reset_period(&self, tenant: TenantId) -> PlatformResult<()> {
        self.tenants.insert(tenant, TenantUsage::empty(tenant));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_accumulates() {
        let store = InMemoryUsageStore::new();
        let tenant = TenantId::new_v4();

        store
            .record(tenant, GovernedResource::ApiCallsPerMonth, 100)
            .await
            .unwrap();
        let total = store
            .record(tenant, GovernedResource::ApiCallsPerMonth, 50)
            .await
            .unwrap();
        assert_eq!(total, 150);

        let usage = store.usage(tenant).await;
        assert_eq!(usage.get(GovernedResource::ApiCallsPerMonth), 150);
        assert_eq!(usage.get(GovernedResource::StorageGb), 0);
    }

    #[tokio::test]
    async fn test_replace_overwrites() {
        let store = InMemoryUsageStore::new();
        let tenant = TenantId::new_v4();

        store
            .record(tenant, GovernedResource::StorageGb, 10)
            .await
            .unwrap();
        store
            .replace(tenant, GovernedResource::StorageGb, 3)
            .await
            .unwrap();

        assert_eq!(store.usage(tenant).await.get(GovernedResource::StorageGb), 3);
    }

    #[tokio::test]
    async fn test_reset_starts_fresh_period() {
        let store = InMemoryUsageStore::new();
        let tenant = TenantId::new_v4();

        store
            .record(tenant, GovernedResource::BookingsPerMonth, 400)
            .await
            .unwrap();
        let before = store.usage(tenant).await;

        store.reset_period(tenant).await.unwrap();
        let after = store.usage(tenant).await;

        assert_eq!(after.get(GovernedResource::BookingsPerMonth), 0);
        assert!(after.period_started_at >= before.period_started_at);
    }

    #[tokio::test]
    async fn test_unknown_tenant_reads_empty() {
        let store = InMemoryUsageStore::new();
        let usage = store.usage(TenantId::new_v4()).await;

        assert!(usage.counters.is_empty());
        for resource in GovernedResource::all() {
            assert_eq!(usage.get(resource), 0);
        }
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let store = InMemoryUsageStore::new();
        let a = TenantId::new_v4();
        let b = TenantId::new_v4();

        store.record(a, GovernedResource::Users, 7).await.unwrap();

        assert_eq!(store.usage(a).await.get(GovernedResource::Users), 7);
        assert_eq!(store.usage(b).await.get(GovernedResource::Users), 0);
    }
}
