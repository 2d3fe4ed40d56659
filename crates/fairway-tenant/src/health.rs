//! Composite tenant health scoring.

use crate::limits::{LimitGovernor, OverageReport};
use crate::model::UNLIMITED;
use chrono::{DateTime, Utc};
use fairway_common::{HealthPolicy, PlatformResult, TenantId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Point-in-time service levels delivered by an external SLO feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SloSample {
    /// Observed uptime, percent (0-100)
    pub uptime_percent: f64,
    /// Fraction of failed requests (0-1)
    pub error_rate: f64,
    /// Customer satisfaction, percent (0-100)
    pub satisfaction: f64,
}

/// Fixed factor set feeding the composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorName {
    Uptime,
    ErrorRate,
    UsageEfficiency,
    Satisfaction,
}

impl std::fmt::Display for FactorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Uptime => "uptime",
            Self::ErrorRate => "error_rate",
            Self::UsageEfficiency => "usage_efficiency",
            Self::Satisfaction => "satisfaction",
        };
        f.write_str(s)
    }
}

/// Movement versus the immediately preceding score for the same factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorTrend {
    Improving,
    Stable,
    Declining,
}

/// One weighted factor inside a health score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthFactor {
    pub name: FactorName,
    pub weight: f64,
    /// Input value before normalization
    pub raw_value: f64,
    /// Value mapped onto the 0-100 scale
    pub normalized: f64,
    /// `weight * normalized`; factor contributions sum to the composite
    pub contribution: f64,
    pub trend: FactorTrend,
}

/// Letter grade over the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthGrade {
    A,
    B,
    C,
    D,
    F,
}

impl HealthGrade {
    /// Fixed cutoffs: >=90 A, >=75 B, >=60 C, >=50 D, else F.
    pub fn for_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::A
        } else if score >= 75.0 {
            Self::B
        } else if score >= 60.0 {
            Self::C
        } else if score >= 50.0 {
            Self::D
        } else {
            Self::F
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::A => "Excellent",
            Self::B => "Good",
            Self::C => "Fair",
            Self::D => "Poor",
            Self::F => "Critical",
        }
    }
}

/// Composite health score for one tenant at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantHealthScore {
    pub tenant_id: TenantId,
    /// Weighted sum of normalized factors, 0-100
    pub composite: f64,
    pub grade: HealthGrade,
    pub factors: Vec<HealthFactor>,
    pub scored_at: DateTime<Utc>,
}

impl TenantHealthScore {
    fn factor(&self, name: FactorName) -> Option<&HealthFactor> {
        self.factors.iter().find(|factor| factor.name == name)
    }
}

/// Computes health scores from governor output and SLO samples, tracking the
/// previous score per tenant for trend direction.
pub struct HealthScorer {
    governor: Arc<LimitGovernor>,
    policy: HealthPolicy,
    previous: RwLock<HashMap<TenantId, TenantHealthScore>>,
}

impl HealthScorer {
    pub fn new(governor: Arc<LimitGovernor>, policy: HealthPolicy) -> Self {
        Self {
            governor,
            policy,
            previous: RwLock::new(HashMap::new()),
        }
    }

    /// Score a tenant from the current overage picture and an SLO sample.
    pub async fn score(
        &self,
        tenant_id: &TenantId,
        slo: &SloSample,
    ) -> PlatformResult<TenantHealthScore> {
        let report = self.governor.overage_report(tenant_id).await?;
        let efficiency = efficiency_from(&report);

        let uptime_norm = slo.uptime_percent.clamp(0.0, 100.0);
        let error_norm = (1.0 - slo.error_rate.clamp(0.0, 1.0)) * 100.0;
        let satisfaction_norm = slo.satisfaction.clamp(0.0, 100.0);

        let inputs = [
            (FactorName::Uptime, self.policy.uptime_weight, slo.uptime_percent, uptime_norm),
            (FactorName::ErrorRate, self.policy.error_rate_weight, slo.error_rate, error_norm),
            (FactorName::UsageEfficiency, self.policy.efficiency_weight, efficiency, efficiency),
            (FactorName::Satisfaction, self.policy.satisfaction_weight, slo.satisfaction, satisfaction_norm),
        ];

        let previous = self.previous.read().get(tenant_id).cloned();
        let mut factors = Vec::with_capacity(inputs.len());
        let mut composite = 0.0;
        for (name, weight, raw_value, normalized) in inputs {
            let contribution = weight * normalized;
            composite += contribution;
            let trend = match previous.as_ref().and_then(|score| score.factor(name)) {
                Some(prior) => trend_between(prior.normalized, normalized, self.policy.stable_band),
                None => FactorTrend::Stable,
            };
            factors.push(HealthFactor {
                name,
                weight,
                raw_value,
                normalized,
                contribution,
                trend,
            });
        }

        let score = TenantHealthScore {
            tenant_id: *tenant_id,
            composite,
            grade: HealthGrade::for_score(composite),
            factors,
            scored_at: Utc::now(),
        };
        self.previous.write().insert(*tenant_id, score.clone());
        Ok(score)
    }
}

fn trend_between(previous: f64, current: f64, stable_band: f64) -> FactorTrend {
    let delta = current - previous;
    if delta > stable_band {
        FactorTrend::Improving
    } else if delta < -stable_band {
        FactorTrend::Declining
    } else {
        FactorTrend::Stable
    }
}

/// Efficiency on the 0-100 scale from the overage picture.
///
/// Resources inside their ceiling score 100; an overage scales the score by
/// limit/usage. Unbounded or untouched resources carry no signal and are
/// skipped; with nothing to measure the factor reads 100.
fn efficiency_from(report: &OverageReport) -> f64 {
    let mut scores = Vec::new();
    for entry in &report.entries {
        if entry.effective_limit == UNLIMITED || entry.usage == 0 {
            continue;
        }
        let score = if entry.usage <= entry.effective_limit {
            100.0
        } else if entry.effective_limit == 0 {
            0.0
        } else {
            (entry.effective_limit as f64 / entry.usage as f64) * 100.0
        };
        scores.push(score);
    }
    if scores.is_empty() {
        100.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}
