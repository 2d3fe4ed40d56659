//! Tenant data model

use chrono::{DateTime, Utc};
use fairway_common::{PlatformError, PlatformResult, TenantId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel for a resource with no ceiling. Never produces an overage.
pub const UNLIMITED: u64 = u64::MAX;

/// Tenant definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    /// Unique tenant ID
    pub id: TenantId,
    /// Display name
    pub name: String,
    /// Lifecycle state
    pub status: TenantStatus,
    /// Reason recorded while suspended, cleared on resume
    pub suspension: Option<SuspensionReason>,
    /// Parent tenant, when this is a sub-tenant. A reference only; limit
    /// derivation walks it at resolution time.
    pub parent_id: Option<TenantId>,
    /// Subscription tier
    pub tier: TenantTier,
    /// Explicit limit override. Takes precedence over tier defaults and
    /// parent-derived limits when present.
    pub limits_override: Option<TenantLimits>,
    /// Bumped on every override write
    pub limits_version: u32,
    /// Opaque branding blob, owned by the presentation layer
    pub branding: serde_json::Value,
    /// Opaque per-tenant settings blob
    pub settings: serde_json::Value,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Create a new tenant in `Provisioning` state.
    pub fn new(name: &str, tier: TenantTier) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            status: TenantStatus::Provisioning,
            suspension: None,
            parent_id: None,
            tier,
            limits_override: None,
            limits_version: 0,
            branding: serde_json::Value::Null,
            settings: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a sub-tenant under `parent`.
    pub fn new_child(parent: TenantId, name: &str, tier: TenantTier) -> Self {
        let mut tenant = Self::new(name, tier);
        tenant.parent_id = Some(parent);
        tenant
    }

    pub fn is_child(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Apply a status transition, rejecting moves the machine does not allow.
    /// State is untouched on rejection.
    pub fn transition_to(&mut self, next: TenantStatus) -> PlatformResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(PlatformError::InvalidTransition(format!(
                "{} -> {}",
                self.status, next
            )));
        }
        self.status = next;
        if next != TenantStatus::Suspended {
            self.suspension = None;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Tenant lifecycle state.
///
/// Provisioning -> Active <-> Suspended, either of which may move to
/// Inactive; Deleted is reachable from any non-deleted state and terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Provisioning,
    Active,
    Suspended,
    Inactive,
    Deleted,
}

impl TenantStatus {
    /// Whether the machine allows moving from this state to `next`.
    pub fn can_transition_to(self, next: TenantStatus) -> bool {
        match (self, next) {
            (Self::Provisioning, Self::Active) => true,
            (Self::Active, Self::Suspended) => true,
            (Self::Suspended, Self::Active) => true,
            (Self::Active, Self::Inactive) => true,
            (Self::Suspended, Self::Inactive) => true,
            (Self::Deleted, _) => false,
            (_, Self::Deleted) => true,
            (Self::Provisioning, _)
            | (Self::Active, _)
            | (Self::Suspended, _)
            | (Self::Inactive, _) => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Deleted
    }
}

impl std::fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Provisioning => "provisioning",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Inactive => "inactive",
            Self::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// Why a tenant was suspended. Required for every suspension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspensionReason {
    PaymentFailure,
    TermsViolation,
    CustomerRequest,
    Maintenance,
}

impl std::fmt::Display for SuspensionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PaymentFailure => "payment_failure",
            Self::TermsViolation => "terms_violation",
            Self::CustomerRequest => "customer_request",
            Self::Maintenance => "maintenance",
        };
        f.write_str(s)
    }
}

/// Subscription tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantTier {
    Starter,
    Professional,
    Enterprise,
    /// Negotiated plans; starts from Enterprise ceilings, always paired with
    /// an explicit limits override.
    Custom,
}

impl std::fmt::Display for TenantTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Starter => "starter",
            Self::Professional => "professional",
            Self::Enterprise => "enterprise",
            Self::Custom => "custom",
        };
        f.write_str(s)
    }
}

/// Support level bundled with a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportTier {
    Community,
    Standard,
    Priority,
    Dedicated,
}

/// A resource the platform meters and caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernedResource {
    ApiCallsPerMonth,
    StorageGb,
    BandwidthGb,
    Users,
    Courses,
    BookingsPerMonth,
    ChildTenants,
    CustomDomains,
    Webhooks,
}

impl GovernedResource {
    /// Every governed resource, in limit-report order.
    pub fn all() -> [GovernedResource; 9] {
        [
            Self::ApiCallsPerMonth,
            Self::StorageGb,
            Self::BandwidthGb,
            Self::Users,
            Self::Courses,
            Self::BookingsPerMonth,
            Self::ChildTenants,
            Self::CustomDomains,
            Self::Webhooks,
        ]
    }
}

impl std::fmt::Display for GovernedResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ApiCallsPerMonth => "api_calls_per_month",
            Self::StorageGb => "storage_gb",
            Self::BandwidthGb => "bandwidth_gb",
            Self::Users => "users",
            Self::Courses => "courses",
            Self::BookingsPerMonth => "bookings_per_month",
            Self::ChildTenants => "child_tenants",
            Self::CustomDomains => "custom_domains",
            Self::Webhooks => "webhooks",
        };
        f.write_str(s)
    }
}

/// Resource ceilings for one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantLimits {
    /// API calls per billing month
    pub api_calls_per_month: u64,
    /// Storage quota (GB)
    pub storage_gb: u64,
    /// Transfer quota per billing month (GB)
    pub bandwidth_gb: u64,
    /// Seats
    pub users: u64,
    /// Golf courses manageable under the account
    pub courses: u64,
    /// Bookings per billing month
    pub bookings_per_month: u64,
    /// Sub-tenants this tenant may own
    pub child_tenants: u64,
    /// Custom domains
    pub custom_domains: u64,
    /// Outbound webhook endpoints
    pub webhooks: u64,
    /// Support level
    pub support: SupportTier,
    /// Contractual uptime target, percent
    pub sla_uptime_percent: f64,
}

impl TenantLimits {
    /// Default ceilings for a tier.
    pub fn for_tier(tier: TenantTier) -> Self {
        match tier {
            TenantTier::Starter => Self {
                api_calls_per_month: 25_000,
                storage_gb: 5,
                bandwidth_gb: 50,
                users: 10,
                courses: 1,
                bookings_per_month: 500,
                child_tenants: 0,
                custom_domains: 1,
                webhooks: 2,
                support: SupportTier::Community,
                sla_uptime_percent: 99.0,
            },
            TenantTier::Professional => Self {
                api_calls_per_month: 250_000,
                storage_gb: 50,
                bandwidth_gb: 500,
                users: 100,
                courses: 5,
                bookings_per_month: 10_000,
                child_tenants: 5,
                custom_domains: 5,
                webhooks: 10,
                support: SupportTier::Standard,
                sla_uptime_percent: 99.5,
            },
            TenantTier::Enterprise => Self {
                api_calls_per_month: 5_000_000,
                storage_gb: 1_000,
                bandwidth_gb: 10_000,
                users: 5_000,
                courses: 100,
                bookings_per_month: 500_000,
                child_tenants: 50,
                custom_domains: 25,
                webhooks: 100,
                support: SupportTier::Priority,
                sla_uptime_percent: 99.9,
            },
            TenantTier::Custom => Self {
                api_calls_per_month: UNLIMITED,
                storage_gb: UNLIMITED,
                bandwidth_gb: UNLIMITED,
                users: UNLIMITED,
                courses: UNLIMITED,
                bookings_per_month: UNLIMITED,
                child_tenants: UNLIMITED,
                custom_domains: UNLIMITED,
                webhooks: UNLIMITED,
                support: SupportTier::Dedicated,
                sla_uptime_percent: 99.99,
            },
        }
    }

    /// Ceiling for one resource.
    pub fn limit_for(&self, resource: GovernedResource) -> u64 {
        match resource {
            GovernedResource::ApiCallsPerMonth => self.api_calls_per_month,
            GovernedResource::StorageGb => self.storage_gb,
            GovernedResource::BandwidthGb => self.bandwidth_gb,
            GovernedResource::Users => self.users,
            GovernedResource::Courses => self.courses,
            GovernedResource::BookingsPerMonth => self.bookings_per_month,
            GovernedResource::ChildTenants => self.child_tenants,
            GovernedResource::CustomDomains => self.custom_domains,
            GovernedResource::Webhooks => self.webhooks,
        }
    }

    /// Set the ceiling for one resource.
    pub fn set_limit(&mut self, resource: GovernedResource, value: u64) {
        match resource {
            GovernedResource::ApiCallsPerMonth => self.api_calls_per_month = value,
            GovernedResource::StorageGb => self.storage_gb = value,
            GovernedResource::BandwidthGb => self.bandwidth_gb = value,
            GovernedResource::Users => self.users = value,
            GovernedResource::Courses => self.courses = value,
            GovernedResource::BookingsPerMonth => self.bookings_per_month = value,
            GovernedResource::ChildTenants => self.child_tenants = value,
            GovernedResource::CustomDomains => self.custom_domains = value,
            GovernedResource::Webhooks => self.webhooks = value,
        }
    }
}

/// Platform operator performing administrative commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub id: Uuid,
    pub role: OperatorRole,
}

impl Operator {
    pub fn new(role: OperatorRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
        }
    }
}

/// Role attached to an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorRole {
    PlatformAdmin,
    Support,
    ReadOnly,
}

impl OperatorRole {
    /// Only platform admins may irreversibly delete tenants.
    pub fn may_delete_tenants(self) -> bool {
        match self {
            Self::PlatformAdmin => true,
            Self::Support | Self::ReadOnly => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_starts_provisioning() {
        let tenant = Tenant::new("Pinehurst Group", TenantTier::Professional);

        assert_eq!(tenant.status, TenantStatus::Provisioning);
        assert_eq!(tenant.limits_version, 0);
        assert!(tenant.limits_override.is_none());
        assert!(!tenant.is_child());
    }

    #[test]
    fn test_tier_limits_scale_up() {
        let starter = TenantLimits::for_tier(TenantTier::Starter);
        let enterprise = TenantLimits::for_tier(TenantTier::Enterprise);

        assert!(enterprise.api_calls_per_month > starter.api_calls_per_month);
        assert!(enterprise.users > starter.users);
        assert_eq!(starter.child_tenants, 0);
    }

    #[test]
    fn test_custom_tier_is_unbounded() {
        let custom = TenantLimits::for_tier(TenantTier::Custom);
        for resource in GovernedResource::all() {
            assert_eq!(custom.limit_for(resource), UNLIMITED);
        }
    }

    #[test]
    fn test_limit_for_covers_every_resource() {
        let limits = TenantLimits::for_tier(TenantTier::Starter);
        assert_eq!(
            limits.limit_for(GovernedResource::ApiCallsPerMonth),
            25_000
        );
        assert_eq!(limits.limit_for(GovernedResource::Courses), 1);
    }

    #[test]
    fn test_allowed_transitions() {
        let mut tenant = Tenant::new("Links Co", TenantTier::Starter);

        tenant.transition_to(TenantStatus::Active).unwrap();
        tenant.transition_to(TenantStatus::Suspended).unwrap();
        tenant.transition_to(TenantStatus::Active).unwrap();
        tenant.transition_to(TenantStatus::Inactive).unwrap();
        tenant.transition_to(TenantStatus::Deleted).unwrap();
        assert!(tenant.status.is_terminal());
    }

    #[test]
    fn test_invalid_transition_leaves_state() {
        let mut tenant = Tenant::new("Links Co", TenantTier::Starter);

        let err = tenant.transition_to(TenantStatus::Inactive).unwrap_err();
        assert!(err.to_string().contains("provisioning"));
        assert_eq!(tenant.status, TenantStatus::Provisioning);
    }

    #[test]
    fn test_deleted_is_terminal() {
        let mut tenant = Tenant::new("Links Co", TenantTier::Starter);
        tenant.transition_to(TenantStatus::Deleted).unwrap();

        assert!(tenant.transition_to(TenantStatus::Active).is_err());
        assert_eq!(tenant.status, TenantStatus::Deleted);
    }

    #[test]
    fn test_resume_clears_suspension_reason() {
        let mut tenant = Tenant::new("Links Co", TenantTier::Starter);
        tenant.transition_to(TenantStatus::Active).unwrap();
        tenant.transition_to(TenantStatus::Suspended).unwrap();
        tenant.suspension = Some(SuspensionReason::PaymentFailure);

        tenant.transition_to(TenantStatus::Active).unwrap();
        assert!(tenant.suspension.is_none());
    }

    #[test]
    fn test_only_admins_delete() {
        assert!(OperatorRole::PlatformAdmin.may_delete_tenants());
        assert!(!OperatorRole::Support.may_delete_tenants());
        assert!(!OperatorRole::ReadOnly.may_delete_tenants());
    }
}
