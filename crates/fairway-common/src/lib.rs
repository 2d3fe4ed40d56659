//! Fairway Common - Shared types for the multi-tenant revenue core
//!
//! This crate provides the primitives every other Fairway crate builds on:
//! - Identifiers for tenants, events, customers, subscriptions
//! - Calendar periods and validated date ranges
//! - Currency codes
//! - The platform-wide error taxonomy
//! - Startup configuration (feature toggles + numeric policies)

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod money;
pub mod period;

pub use config::{
    AnomalyPolicy, ChildFraction, FeatureToggles, ForecastPolicy, GrowthPolicy, HealthPolicy,
    HierarchyPolicy, LedgerPolicy, PlatformConfig,
};
pub use error::{ErrorKind, PlatformError, PlatformResult};
pub use money::CurrencyCode;
pub use period::{DateRange, RevenuePeriod};

use uuid::Uuid;

/// Tenant identifier
pub type TenantId = Uuid;

/// Revenue event identifier
pub type EventId = Uuid;

/// Customer identifier
pub type CustomerId = Uuid;

/// Subscription identifier
pub type SubscriptionId = Uuid;

/// Invoice identifier
pub type InvoiceId = Uuid;
