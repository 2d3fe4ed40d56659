//! Startup configuration
//!
//! The platform reads one [`PlatformConfig`] at construction time. Feature
//! toggles short-circuit whole operations to no-ops; the numeric policy
//! sections pin down every threshold the analytics and governance engines
//! use, so recomputation stays deterministic across deployments.

use crate::{PlatformError, PlatformResult};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Feature switches, read once at startup. Off means the corresponding
/// operation short-circuits; it never changes the semantics of an enabled
/// path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeatureToggles {
    /// Statistical anomaly detection over metric series
    pub anomaly_detection: bool,
    /// Revenue forecasting
    pub forecasting: bool,
    /// Live revenue signal publishing (watch channels)
    pub realtime_updates: bool,
    /// Derived-metrics snapshot cache
    pub caching: bool,
    /// At-rest encryption; consumed by the storage collaborator, carried here
    pub encryption: bool,
    /// Append-only audit trail of command operations
    pub audit_logging: bool,
    /// Coarse per-operation timing logs
    pub benchmarking: bool,
    /// Insight generation from metrics/growth/anomalies
    pub insight_generation: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            anomaly_detection: true,
            forecasting: true,
            realtime_updates: true,
            caching: true,
            encryption: false,
            audit_logging: true,
            benchmarking: false,
            insight_generation: true,
        }
    }
}

/// Ledger ingestion policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LedgerPolicy {
    /// How far into the future an event timestamp may sit before the append
    /// is rejected as invalid
    pub clock_skew_tolerance_secs: u64,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            clock_skew_tolerance_secs: 300,
        }
    }
}

impl LedgerPolicy {
    /// Tolerance as a chrono duration.
    pub fn clock_skew_tolerance(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.clock_skew_tolerance_secs as i64)
    }
}

/// Anomaly detection policy: rolling window shape and fixed severity bands
/// in standard-deviation units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AnomalyPolicy {
    /// Trailing buckets forming the rolling baseline
    pub window_days: usize,
    /// Minimum baseline samples before any point can be flagged
    pub min_samples: usize,
    /// Deviation at or above this is at least Low severity
    pub low_sigma: Decimal,
    /// Medium severity threshold
    pub medium_sigma: Decimal,
    /// High severity threshold
    pub high_sigma: Decimal,
    /// Critical severity threshold
    pub critical_sigma: Decimal,
}

impl Default for AnomalyPolicy {
    fn default() -> Self {
        Self {
            window_days: 30,
            min_samples: 7,
            low_sigma: dec!(2.0),
            medium_sigma: dec!(2.5),
            high_sigma: dec!(3.0),
            critical_sigma: dec!(4.0),
        }
    }
}

/// Forecasting policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ForecastPolicy {
    /// Trailing snapshots required before a forecast is attempted
    pub min_history: usize,
    /// Scenario spread as a multiple of observed volatility
    pub scenario_spread: Decimal,
    /// Confidence for the first projected month before penalties
    pub confidence_base: f64,
    /// Confidence lost per additional month of horizon
    pub confidence_decay: f64,
    /// Confidence never drops below this floor
    pub confidence_floor: f64,
}

impl Default for ForecastPolicy {
    fn default() -> Self {
        Self {
            min_history: 3,
            scenario_spread: dec!(0.5),
            confidence_base: 0.9,
            confidence_decay: 0.05,
            confidence_floor: 0.2,
        }
    }
}

/// Growth trend classification policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GrowthPolicy {
    /// Number of trailing growth-rate samples the trend rule inspects
    pub trend_window: usize,
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self { trend_window: 3 }
    }
}

/// Health score weights and grading bands. Weights must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HealthPolicy {
    /// Uptime factor weight
    pub uptime_weight: f64,
    /// Error-rate factor weight
    pub error_rate_weight: f64,
    /// Usage-efficiency factor weight
    pub efficiency_weight: f64,
    /// Satisfaction factor weight
    pub satisfaction_weight: f64,
    /// Score delta within which a factor trend counts as stable
    pub stable_band: f64,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            uptime_weight: 0.30,
            error_rate_weight: 0.25,
            efficiency_weight: 0.20,
            satisfaction_weight: 0.25,
            stable_band: 1.0,
        }
    }
}

impl HealthPolicy {
    /// Sum of all factor weights.
    pub fn weight_sum(&self) -> f64 {
        self.uptime_weight + self.error_rate_weight + self.efficiency_weight + self.satisfaction_weight
    }
}

/// Fraction of a parent's effective limit a child tenant inherits when it has
/// no explicit override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildFraction {
    /// Child receives 1/10 of the parent's effective limit
    Tenth,
    /// Child receives 1/5 of the parent's effective limit
    Fifth,
}

impl ChildFraction {
    /// Integer divisor applied to the parent's limit.
    pub fn divisor(&self) -> u64 {
        match self {
            Self::Tenth => 10,
            Self::Fifth => 5,
        }
    }
}

/// Hierarchical limit derivation policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HierarchyPolicy {
    /// Fraction of the parent limit derived for override-free children
    pub child_fraction: ChildFraction,
}

impl Default for HierarchyPolicy {
    fn default() -> Self {
        Self {
            child_fraction: ChildFraction::Tenth,
        }
    }
}

/// Complete startup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Feature switches
    pub features: FeatureToggles,
    /// Ledger ingestion policy
    pub ledger: LedgerPolicy,
    /// Anomaly detection policy
    pub anomaly: AnomalyPolicy,
    /// Forecasting policy
    pub forecast: ForecastPolicy,
    /// Growth trend policy
    pub growth: GrowthPolicy,
    /// Health scoring policy
    pub health: HealthPolicy,
    /// Hierarchical limit policy
    pub hierarchy: HierarchyPolicy,
    /// Time budget for a single external collaborator call, milliseconds
    pub collaborator_timeout_ms: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            features: FeatureToggles::default(),
            ledger: LedgerPolicy::default(),
            anomaly: AnomalyPolicy::default(),
            forecast: ForecastPolicy::default(),
            growth: GrowthPolicy::default(),
            health: HealthPolicy::default(),
            hierarchy: HierarchyPolicy::default(),
            collaborator_timeout_ms: 2_000,
        }
    }
}

impl PlatformConfig {
    /// Collaborator budget as a std duration.
    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }

    /// Reject configurations the engines cannot honor.
    pub fn validate(&self) -> PlatformResult<()> {
        if self.collaborator_timeout_ms == 0 {
            return Err(PlatformError::MalformedRequest(
                "collaborator timeout must be non-zero".into(),
            ));
        }
        if (self.health.weight_sum() - 1.0).abs() > 1e-9 {
            return Err(PlatformError::MalformedRequest(format!(
                "health weights sum to {}, expected 1.0",
                self.health.weight_sum()
            )));
        }
        let a = &self.anomaly;
        if !(a.low_sigma < a.medium_sigma && a.medium_sigma < a.high_sigma && a.high_sigma < a.critical_sigma)
        {
            return Err(PlatformError::MalformedRequest(
                "anomaly severity bands must be strictly increasing".into(),
            ));
        }
        if self.forecast.min_history < 3 {
            return Err(PlatformError::MalformedRequest(
                "forecast requires at least 3 trailing snapshots".into(),
            ));
        }
        if self.growth.trend_window < 2 {
            return Err(PlatformError::MalformedRequest(
                "growth trend window must cover at least 2 samples".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PlatformConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bad_weights_rejected() {
        let mut config = PlatformConfig::default();
        config.health.uptime_weight = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_band_ordering_rejected() {
        let mut config = PlatformConfig::default();
        config.anomaly.critical_sigma = dec!(1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_child_fraction_divisors() {
        assert_eq!(ChildFraction::Tenth.divisor(), 10);
        assert_eq!(ChildFraction::Fifth.divisor(), 5);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = PlatformConfig::default();
        assert_eq!(config.collaborator_timeout(), Duration::from_millis(2_000));

        config.collaborator_timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
