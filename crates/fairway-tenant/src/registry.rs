//! Tenant lifecycle management

use crate::model::{
    Operator, SuspensionReason, Tenant, TenantLimits, TenantStatus, TenantTier,
};
use fairway_common::{PlatformError, PlatformResult, TenantId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// In-memory registry of tenant aggregates.
///
/// Deleted tenants stay in the map with terminal status rather than being
/// removed, so repeat transitions keep failing deterministically.
pub struct TenantRegistry {
    tenants: Arc<RwLock<HashMap<TenantId, Tenant>>>,
}

impl TenantRegistry {
    pub fn new() -> Self {
        Self {
            tenants: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a new top-level tenant in `Provisioning` state.
    pub fn create(&self, name: &str, tier: TenantTier) -> PlatformResult<Tenant> {
        validate_name(name)?;
        let tenant = Tenant::new(name, tier);
        self.tenants.write().insert(tenant.id, tenant.clone());
        info!(tenant_id = %tenant.id, %tier, "tenant created");
        Ok(tenant)
    }

    /// Create a sub-tenant under an existing, non-deleted parent.
    pub fn create_child(
        &self,
        parent_id: &TenantId,
        name: &str,
        tier: TenantTier,
    ) -> PlatformResult<Tenant> {
        validate_name(name)?;
        let mut tenants = self.tenants.write();
        let parent = tenants
            .get(parent_id)
            .ok_or(PlatformError::TenantNotFound(*parent_id))?;
        if parent.status == TenantStatus::Deleted {
            return Err(PlatformError::InvalidTransition(format!(
                "cannot attach child to deleted tenant {parent_id}"
            )));
        }
        let tenant = Tenant::new_child(*parent_id, name, tier);
        tenants.insert(tenant.id, tenant.clone());
        info!(tenant_id = %tenant.id, parent_id = %parent_id, "child tenant created");
        Ok(tenant)
    }

    /// Fetch a tenant. Soft-deleted records read as not found.
    pub fn get(&self, tenant_id: &TenantId) -> PlatformResult<Tenant> {
        self.tenants
            .read()
            .get(tenant_id)
            .filter(|tenant| tenant.status != TenantStatus::Deleted)
            .cloned()
            .ok_or(PlatformError::TenantNotFound(*tenant_id))
    }

    /// All non-deleted tenants.
    pub fn list(&self) -> Vec<Tenant> {
        self.tenants
            .read()
            .values()
            .filter(|tenant| tenant.status != TenantStatus::Deleted)
            .cloned()
            .collect()
    }

    /// Non-deleted direct children of a tenant.
    pub fn children_of(&self, parent_id: &TenantId) -> Vec<Tenant> {
        self.tenants
            .read()
            .values()
            .filter(|tenant| {
                tenant.parent_id == Some(*parent_id) && tenant.status != TenantStatus::Deleted
            })
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.tenants
            .read()
            .values()
            .filter(|tenant| tenant.status != TenantStatus::Deleted)
            .count()
    }

    /// Apply field updates.
    pub fn update(&self, tenant_id: &TenantId, update: TenantUpdate) -> PlatformResult<Tenant> {
        let mut tenants = self.tenants.write();
        let tenant = tenants
            .get_mut(tenant_id)
            .ok_or(PlatformError::TenantNotFound(*tenant_id))?;
        if tenant.status == TenantStatus::Deleted {
            return Err(PlatformError::InvalidTransition(format!(
                "cannot update deleted tenant {tenant_id}"
            )));
        }

        if let Some(name) = update.name {
            validate_name(&name)?;
            tenant.name = name;
        }
        if let Some(tier) = update.tier {
            tenant.tier = tier;
        }
        if let Some(branding) = update.branding {
            tenant.branding = branding;
        }
        if let Some(settings) = update.settings {
            tenant.settings = settings;
        }
        tenant.updated_at = chrono::Utc::now();

        Ok(tenant.clone())
    }

    /// Finish provisioning.
    pub fn activate(&self, tenant_id: &TenantId) -> PlatformResult<Tenant> {
        self.transition(tenant_id, TenantStatus::Active)
    }

    /// Suspend an active tenant. The reason is mandatory; a missing reason is
    /// a validation failure and the tenant stays active.
    pub fn suspend(
        &self,
        tenant_id: &TenantId,
        reason: Option<SuspensionReason>,
    ) -> PlatformResult<Tenant> {
        let reason = reason.ok_or(PlatformError::SuspensionReasonRequired)?;
        let mut tenants = self.tenants.write();
        let tenant = tenants
            .get_mut(tenant_id)
            .ok_or(PlatformError::TenantNotFound(*tenant_id))?;
        tenant.transition_to(TenantStatus::Suspended)?;
        info!(tenant_id = %tenant_id, %reason, "tenant suspended");
        tenant.suspension = Some(reason);
        Ok(tenant.clone())
    }

    /// Lift a suspension.
    pub fn resume(&self, tenant_id: &TenantId) -> PlatformResult<Tenant> {
        self.transition(tenant_id, TenantStatus::Active)
    }

    /// Retire a tenant. Inactive tenants can only move on to deletion.
    pub fn deactivate(&self, tenant_id: &TenantId) -> PlatformResult<Tenant> {
        self.transition(tenant_id, TenantStatus::Inactive)
    }

    /// Irreversibly delete a tenant.
    ///
    /// Authorization is checked before the registry is consulted, so an
    /// unauthorized caller learns nothing about whether the tenant exists.
    pub fn delete(&self, operator: &Operator, tenant_id: &TenantId) -> PlatformResult<()> {
        if !operator.role.may_delete_tenants() {
            return Err(PlatformError::Unauthorized("delete tenant".into()));
        }
        let mut tenants = self.tenants.write();
        let tenant = tenants
            .get_mut(tenant_id)
            .ok_or(PlatformError::TenantNotFound(*tenant_id))?;
        tenant.transition_to(TenantStatus::Deleted)?;
        info!(tenant_id = %tenant_id, operator_id = %operator.id, "tenant deleted");
        Ok(())
    }

    /// Replace or clear the explicit limits override, bumping its version.
    ///
    /// Hierarchy validation happens in the governor before this write; the
    /// registry records whatever it is handed.
    pub(crate) fn write_limits_override(
        &self,
        tenant_id: &TenantId,
        limits: Option<TenantLimits>,
    ) -> PlatformResult<Tenant> {
        let mut tenants = self.tenants.write();
        let tenant = tenants
            .get_mut(tenant_id)
            .ok_or(PlatformError::TenantNotFound(*tenant_id))?;
        if tenant.status == TenantStatus::Deleted {
            return Err(PlatformError::InvalidTransition(format!(
                "cannot set limits on deleted tenant {tenant_id}"
            )));
        }
        tenant.limits_override = limits;
        tenant.limits_version += 1;
        tenant.updated_at = chrono::Utc::now();
        Ok(tenant.clone())
    }

    fn transition(&self, tenant_id: &TenantId, next: TenantStatus) -> PlatformResult<Tenant> {
        let mut tenants = self.tenants.write();
        let tenant = tenants
            .get_mut(tenant_id)
            .ok_or(PlatformError::TenantNotFound(*tenant_id))?;
        tenant.transition_to(next)?;
        Ok(tenant.clone())
    }
}

impl Default for TenantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_name(name: &str) -> PlatformResult<()> {
    if name.trim().is_empty() {
        return Err(PlatformError::MalformedRequest(
            "tenant name must be non-empty".into(),
        ));
    }
    Ok(())
}

/// Field updates applied by [`TenantRegistry::update`].
#[derive(Debug, Clone, Default)]
pub struct TenantUpdate {
    pub name: Option<String>,
    pub tier: Option<TenantTier>,
    pub branding: Option<serde_json::Value>,
    pub settings: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OperatorRole;
    use fairway_common::ErrorKind;

    fn admin() -> Operator {
        Operator::new(OperatorRole::PlatformAdmin)
    }

    #[test]
    fn test_full_lifecycle() {
        let registry = TenantRegistry::new();
        let tenant = registry.create("Fairway Links", TenantTier::Professional).unwrap();
        assert_eq!(registry.count(), 1);

        registry.activate(&tenant.id).unwrap();
        registry
            .suspend(&tenant.id, Some(SuspensionReason::PaymentFailure))
            .unwrap();
        let resumed = registry.resume(&tenant.id).unwrap();
        assert_eq!(resumed.status, TenantStatus::Active);
        assert!(resumed.suspension.is_none());

        registry.deactivate(&tenant.id).unwrap();
        registry.delete(&admin(), &tenant.id).unwrap();
        assert_eq!(registry.count(), 0);
        // The record is retained internally but no longer reads back.
        assert!(registry.get(&tenant.id).is_err());
    }

    #[test]
    fn test_suspend_without_reason_fails_and_state_holds() {
        let registry = TenantRegistry::new();
        let tenant = registry.create("Fairway Links", TenantTier::Starter).unwrap();
        registry.activate(&tenant.id).unwrap();

        let err = registry.suspend(&tenant.id, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            registry.get(&tenant.id).unwrap().status,
            TenantStatus::Active
        );
    }

    #[test]
    fn test_delete_checks_authorization_before_existence() {
        let registry = TenantRegistry::new();
        let missing = TenantId::new_v4();
        let support = Operator::new(OperatorRole::Support);

        // Same answer whether or not the tenant exists.
        let err = registry.delete(&support, &missing).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let tenant = registry.create("Fairway Links", TenantTier::Starter).unwrap();
        let err = registry.delete(&support, &tenant.id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        // Admin deleting the missing tenant gets not-found.
        let err = registry.delete(&admin(), &missing).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_delete_is_irreversible() {
        let registry = TenantRegistry::new();
        let tenant = registry.create("Fairway Links", TenantTier::Starter).unwrap();
        registry.delete(&admin(), &tenant.id).unwrap();

        assert!(registry.activate(&tenant.id).is_err());
        assert!(registry.delete(&admin(), &tenant.id).is_err());
    }

    #[test]
    fn test_child_requires_live_parent() {
        let registry = TenantRegistry::new();
        let missing = TenantId::new_v4();
        assert!(registry.create_child(&missing, "Satellite", TenantTier::Starter).is_err());

        let parent = registry.create("Group HQ", TenantTier::Enterprise).unwrap();
        let child = registry
            .create_child(&parent.id, "Satellite", TenantTier::Starter)
            .unwrap();
        assert_eq!(child.parent_id, Some(parent.id));
        assert_eq!(registry.children_of(&parent.id).len(), 1);
    }

    #[test]
    fn test_update_and_empty_name_rejected() {
        let registry = TenantRegistry::new();
        let tenant = registry.create("Old Name", TenantTier::Starter).unwrap();

        let updated = registry
            .update(
                &tenant.id,
                TenantUpdate {
                    name: Some("New Name".into()),
                    tier: Some(TenantTier::Professional),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "New Name");
        assert_eq!(updated.tier, TenantTier::Professional);

        assert!(registry.create("   ", TenantTier::Starter).is_err());
    }

    #[test]
    fn test_override_write_bumps_version() {
        let registry = TenantRegistry::new();
        let tenant = registry.create("Fairway Links", TenantTier::Starter).unwrap();

        let limits = TenantLimits::for_tier(TenantTier::Professional);
        let updated = registry
            .write_limits_override(&tenant.id, Some(limits))
            .unwrap();
        assert_eq!(updated.limits_version, 1);

        let cleared = registry.write_limits_override(&tenant.id, None).unwrap();
        assert_eq!(cleared.limits_version, 2);
        assert!(cleared.limits_override.is_none());
    }
}
