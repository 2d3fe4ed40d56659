//! Tenant governance.
//!
//! Lifecycle, hierarchical resource limits, usage counters, health scoring,
//! and migration tracking for platform tenants.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     TENANT REGISTRY                      │
//! │     provisioning → active ⇄ suspended → inactive →       │
//! │                        deleted                           │
//! └──────────────┬───────────────────────────┬───────────────┘
//!                │                           │
//! ┌──────────────▼─────────────┐ ┌───────────▼──────────────┐
//! │       LIMIT GOVERNOR       │ │     MIGRATION TRACKER    │
//! │ override > parent fraction │ │  pending → in_progress → │
//! │       > tier default       │ │    terminal outcomes     │
//! └──────┬──────────────┬──────┘ └──────────────────────────┘
//!        │              │
//! ┌──────▼──────┐ ┌─────▼─────────────────────┐
//! │ USAGE STORE │ │       HEALTH SCORER       │
//! │ per-period  │ │ uptime/errors/efficiency/ │
//! │  counters   │ │  satisfaction → grade     │
//! └─────────────┘ └───────────────────────────┘
//! ```

pub mod health;
pub mod limits;
pub mod migration;
pub mod model;
pub mod registry;
pub mod usage;

pub use health::{
    FactorName, FactorTrend, HealthFactor, HealthGrade, HealthScorer, SloSample, TenantHealthScore,
};
pub use limits::{
    compute_overage, LimitGovernor, LimitSource, OverageEntry, OverageReport, ResolvedLimits,
};
pub use migration::{MigrationStatus, MigrationTracker, TenantMigration};
pub use model::{
    GovernedResource, Operator, OperatorRole, SupportTier, SuspensionReason, Tenant, TenantLimits,
    TenantStatus, TenantTier, UNLIMITED,
};
pub use registry::{TenantRegistry, TenantUpdate};
pub use usage::{InMemoryUsageStore, TenantUsage, UsageCounterStore};
