//! Effective limit resolution and overage computation.
//!
//! Resolution precedence is fixed: explicit override, then parent-derived
//! fraction for children, then tier default. Hierarchy is a reference walked
//! at resolution time, never a subtype.

use crate::model::{GovernedResource, Tenant, TenantLimits, UNLIMITED};
use crate::registry::TenantRegistry;
use crate::usage::UsageCounterStore;
use fairway_common::{HierarchyPolicy, PlatformError, PlatformResult, TenantId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Which rule produced an effective limit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitSource {
    Override,
    ParentFraction,
    TierDefault,
}

/// Effective limits plus their provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedLimits {
    pub tenant_id: TenantId,
    pub limits: TenantLimits,
    pub source: LimitSource,
    /// Override version at resolution time
    pub version: u32,
}

/// Usage measured against one effective ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverageEntry {
    pub resource: GovernedResource,
    pub usage: u64,
    pub effective_limit: u64,
    pub overage: u64,
}

/// Per-resource overage breakdown for one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverageReport {
    pub tenant_id: TenantId,
    pub source: LimitSource,
    pub entries: Vec<OverageEntry>,
}

impl OverageReport {
    pub fn has_overage(&self) -> bool {
        self.entries.iter().any(|entry| entry.overage > 0)
    }

    pub fn overage_for(&self, resource: GovernedResource) -> u64 {
        self.entries
            .iter()
            .find(|entry| entry.resource == resource)
            .map(|entry| entry.overage)
            .unwrap_or(0)
    }
}

/// `max(0, usage - limit)`; the unbounded sentinel never overages.
pub fn compute_overage(usage: u64, limit: u64) -> u64 {
    if limit == UNLIMITED {
        return 0;
    }
    usage.saturating_sub(limit)
}

/// Resolves effective limits and measures usage against them.
pub struct LimitGovernor {
    registry: Arc<TenantRegistry>,
    usage: Arc<dyn UsageCounterStore>,
    policy: HierarchyPolicy,
}

impl LimitGovernor {
    pub fn new(
        registry: Arc<TenantRegistry>,
        usage: Arc<dyn UsageCounterStore>,
        policy: HierarchyPolicy,
    ) -> Self {
        Self {
            registry,
            usage,
            policy,
        }
    }

    /// Effective limits for a tenant under the fixed precedence order.
    pub fn resolve_limits(&self, tenant_id: &TenantId) -> PlatformResult<ResolvedLimits> {
        let tenant = self.registry.get(tenant_id)?;
        self.resolve_for(&tenant)
    }

    fn resolve_for(&self, tenant: &Tenant) -> PlatformResult<ResolvedLimits> {
        if let Some(limits) = &tenant.limits_override {
            return Ok(ResolvedLimits {
                tenant_id: tenant.id,
                limits: limits.clone(),
                source: LimitSource::Override,
                version: tenant.limits_version,
            });
        }

        if let Some(parent_id) = tenant.parent_id {
            // Parents may themselves be children or overridden; recurse on
            // their effective limits, not their tier defaults.
            let parent = self.registry.get(&parent_id)?;
            let parent_resolved = self.resolve_for(&parent)?;
            let divisor = self.policy.child_fraction.divisor();
            let limits = derive_child_limits(&parent_resolved.limits, divisor, tenant);
            return Ok(ResolvedLimits {
                tenant_id: tenant.id,
                limits,
                source: LimitSource::ParentFraction,
                version: tenant.limits_version,
            });
        }

        Ok(ResolvedLimits {
            tenant_id: tenant.id,
            limits: TenantLimits::for_tier(tenant.tier),
            source: LimitSource::TierDefault,
            version: tenant.limits_version,
        })
    }

    /// Current-period usage measured against effective limits, one entry per
    /// governed resource.
    pub async fn overage_report(&self, tenant_id: &TenantId) -> PlatformResult<OverageReport> {
        let resolved = self.resolve_limits(tenant_id)?;
        let usage = self.usage.usage(*tenant_id).await;

        let entries = GovernedResource::all()
            .into_iter()
            .map(|resource| {
                let used = usage.get(resource);
                let limit = resolved.limits.limit_for(resource);
                OverageEntry {
                    resource,
                    usage: used,
                    effective_limit: limit,
                    overage: compute_overage(used, limit),
                }
            })
            .collect();

        Ok(OverageReport {
            tenant_id: *tenant_id,
            source: resolved.source,
            entries,
        })
    }

    /// Replace or clear a tenant's explicit override.
    ///
    /// For children, every proposed ceiling must fit inside the parent's
    /// remaining allocation (parent effective limit minus sibling
    /// consumption); a violation rejects the whole write.
    pub async fn set_limits_override(
        &self,
        tenant_id: &TenantId,
        limits: Option<TenantLimits>,
    ) -> PlatformResult<Tenant> {
        if let Some(proposed) = &limits {
            let tenant = self.registry.get(tenant_id)?;
            if let Some(parent_id) = tenant.parent_id {
                self.check_child_fits(tenant_id, &parent_id, proposed).await?;
            }
        }
        let cleared = limits.is_none();
        let updated = self.registry.write_limits_override(tenant_id, limits)?;
        debug!(tenant_id = %tenant_id, cleared, "limits override written");
        Ok(updated)
    }

    async fn check_child_fits(
        &self,
        child_id: &TenantId,
        parent_id: &TenantId,
        proposed: &TenantLimits,
    ) -> PlatformResult<()> {
        let parent = self.registry.get(parent_id)?;
        let parent_limits = self.resolve_for(&parent)?.limits;

        let mut sibling_usage: Vec<(GovernedResource, u64)> = GovernedResource::all()
            .into_iter()
            .map(|resource| (resource, 0u64))
            .collect();
        for sibling in self.registry.children_of(parent_id) {
            if sibling.id == *child_id {
                continue;
            }
            let usage = self.usage.usage(sibling.id).await;
            for (resource, total) in sibling_usage.iter_mut() {
                *total = total.saturating_add(usage.get(*resource));
            }
        }

        for (resource, consumed) in sibling_usage {
            let ceiling = parent_limits.limit_for(resource);
            if ceiling == UNLIMITED {
                continue;
            }
            let remaining = ceiling.saturating_sub(consumed);
            let requested = proposed.limit_for(resource);
            if requested > remaining {
                return Err(PlatformError::HierarchyLimitExceeded(format!(
                    "{resource}: requested {requested} exceeds parent remaining {remaining}"
                )));
            }
        }
        Ok(())
    }
}

fn derive_child_limits(parent: &TenantLimits, divisor: u64, child: &Tenant) -> TenantLimits {
    // Support level and SLA stay with the child's own tier; only numeric
    // ceilings are fractioned.
    let mut limits = TenantLimits::for_tier(child.tier);
    for resource in GovernedResource::all() {
        let ceiling = parent.limit_for(resource);
        let derived = if ceiling == UNLIMITED {
            UNLIMITED
        } else {
            ceiling / divisor
        };
        limits.set_limit(resource, derived);
    }
    limits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TenantTier;
    use crate::usage::InMemoryUsageStore;
    use fairway_common::ChildFraction;
    use fairway_common::ErrorKind;

    fn governor_with(policy: HierarchyPolicy) -> (Arc<TenantRegistry>, Arc<InMemoryUsageStore>, LimitGovernor) {
        let registry = Arc::new(TenantRegistry::new());
        let usage = Arc::new(InMemoryUsageStore::new());
        let governor = LimitGovernor::new(registry.clone(), usage.clone(), policy);
        (registry, usage, governor)
    }

    fn governor() -> (Arc<TenantRegistry>, Arc<InMemoryUsageStore>, LimitGovernor) {
        governor_with(HierarchyPolicy::default())
    }

    #[tokio::test]
    async fn test_tier_default_resolution() {
        let (registry, _, governor) = governor();
        let tenant = registry.create("Solo Club", TenantTier::Starter).unwrap();

        let resolved = governor.resolve_limits(&tenant.id).unwrap();
        assert_eq!(resolved.source, LimitSource::TierDefault);
        assert_eq!(resolved.limits.api_calls_per_month, 25_000);
    }

    #[tokio::test]
    async fn test_override_takes_precedence() {
        let (registry, _, governor) = governor();
        let tenant = registry.create("Solo Club", TenantTier::Starter).unwrap();

        let mut custom = TenantLimits::for_tier(TenantTier::Starter);
        custom.api_calls_per_month = 40_000;
        governor
            .set_limits_override(&tenant.id, Some(custom))
            .await
            .unwrap();

        let resolved = governor.resolve_limits(&tenant.id).unwrap();
        assert_eq!(resolved.source, LimitSource::Override);
        assert_eq!(resolved.limits.api_calls_per_month, 40_000);
        assert_eq!(resolved.version, 1);
    }

    #[tokio::test]
    async fn test_child_inherits_fraction_of_parent() {
        let (registry, _, governor) = governor();
        let parent = registry.create("Group HQ", TenantTier::Enterprise).unwrap();
        let child = registry
            .create_child(&parent.id, "Satellite", TenantTier::Starter)
            .unwrap();

        let resolved = governor.resolve_limits(&child.id).unwrap();
        assert_eq!(resolved.source, LimitSource::ParentFraction);
        // Enterprise ceiling 5M, tenth policy.
        assert_eq!(resolved.limits.api_calls_per_month, 500_000);

        let parent_limits = governor.resolve_limits(&parent.id).unwrap().limits;
        for resource in GovernedResource::all() {
            let ceiling = parent_limits.limit_for(resource);
            if ceiling != UNLIMITED && ceiling > 0 {
                assert!(resolved.limits.limit_for(resource) < ceiling);
            }
        }
    }

    #[tokio::test]
    async fn test_fifth_policy_widens_children() {
        let (registry, _, governor) = governor_with(HierarchyPolicy {
            child_fraction: ChildFraction::Fifth,
        });
        let parent = registry.create("Group HQ", TenantTier::Enterprise).unwrap();
        let child = registry
            .create_child(&parent.id, "Satellite", TenantTier::Starter)
            .unwrap();

        let resolved = governor.resolve_limits(&child.id).unwrap();
        assert_eq!(resolved.limits.api_calls_per_month, 1_000_000);
    }

    #[tokio::test]
    async fn test_unlimited_parent_passes_through() {
        let (registry, _, governor) = governor();
        let parent = registry.create("Flagship", TenantTier::Custom).unwrap();
        let child = registry
            .create_child(&parent.id, "Satellite", TenantTier::Starter)
            .unwrap();

        let resolved = governor.resolve_limits(&child.id).unwrap();
        assert_eq!(resolved.limits.api_calls_per_month, UNLIMITED);
    }

    #[tokio::test]
    async fn test_overage_scenario() {
        let (registry, usage, governor) = governor();
        let tenant = registry.create("Busy Club", TenantTier::Starter).unwrap();
        usage
            .record(tenant.id, GovernedResource::ApiCallsPerMonth, 27_300)
            .await
            .unwrap();

        let report = governor.overage_report(&tenant.id).await.unwrap();
        assert_eq!(report.overage_for(GovernedResource::ApiCallsPerMonth), 2_300);
        for resource in GovernedResource::all() {
            if resource != GovernedResource::ApiCallsPerMonth {
                assert_eq!(report.overage_for(resource), 0);
            }
        }
        assert!(report.has_overage());
    }

    #[tokio::test]
    async fn test_unlimited_never_overages() {
        let (registry, usage, governor) = governor();
        let tenant = registry.create("Flagship", TenantTier::Custom).unwrap();
        usage
            .record(tenant.id, GovernedResource::ApiCallsPerMonth, u64::MAX / 2)
            .await
            .unwrap();

        let report = governor.overage_report(&tenant.id).await.unwrap();
        assert!(!report.has_overage());
        assert_eq!(compute_overage(u64::MAX, UNLIMITED), 0);
    }

    #[tokio::test]
    async fn test_child_override_must_fit_parent_remaining() {
        let (registry, usage, governor) = governor();
        let parent = registry
            .create("Group HQ", TenantTier::Professional)
            .unwrap();
        let first = registry
            .create_child(&parent.id, "First", TenantTier::Starter)
            .unwrap();
        let second = registry
            .create_child(&parent.id, "Second", TenantTier::Starter)
            .unwrap();

        // Professional ceiling 250k; sibling already consumed 200k.
        usage
            .record(first.id, GovernedResource::ApiCallsPerMonth, 200_000)
            .await
            .unwrap();

        let mut over = TenantLimits::for_tier(TenantTier::Starter);
        over.api_calls_per_month = 60_000;
        let err = governor
            .set_limits_override(&second.id, Some(over))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("api_calls_per_month"));

        // Tenant untouched by the rejected write.
        assert!(registry.get(&second.id).unwrap().limits_override.is_none());

        let mut fits = TenantLimits::for_tier(TenantTier::Starter);
        fits.api_calls_per_month = 50_000;
        governor
            .set_limits_override(&second.id, Some(fits))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_clearing_override_skips_hierarchy_check() {
        let (registry, _, governor) = governor();
        let parent = registry.create("Group HQ", TenantTier::Starter).unwrap();
        let child = registry
            .create_child(&parent.id, "Satellite", TenantTier::Starter)
            .unwrap();

        let cleared = governor.set_limits_override(&child.id, None).await.unwrap();
        assert!(cleared.limits_override.is_none());
        assert_eq!(cleared.limits_version, 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_overage_is_clamped_difference(usage in any::<u64>(), limit in any::<u64>()) {
                let overage = compute_overage(usage, limit);
                if limit == UNLIMITED {
                    prop_assert_eq!(overage, 0);
                } else {
                    prop_assert_eq!(overage, usage.saturating_sub(limit));
                    prop_assert!(overage == 0 || usage > limit);
                }
            }

            // The fraction policy keeps a derived child ceiling strictly
            // under any bounded positive parent ceiling.
            #[test]
            fn prop_derived_child_stays_below_parent(parent in 1u64..1_000_000_000) {
                for fraction in [ChildFraction::Tenth, ChildFraction::Fifth] {
                    prop_assert!(parent / fraction.divisor() < parent);
                }
            }
        }
    }
}
