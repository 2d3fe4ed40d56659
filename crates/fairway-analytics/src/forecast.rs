//! Revenue projection from trailing monthly history.
//!
//! Fits a weighted linear trend over completed months (weights ramp toward
//! recent samples) and projects it forward under three scenarios. Scenario
//! spread and interval widths derive from the observed volatility, the
//! standard deviation of month-over-month deltas.

use crate::metrics::net_revenue_in;
use chrono::{DateTime, Months, Utc};
use fairway_common::{DateRange, ForecastPolicy, PlatformError, PlatformResult, RevenuePeriod, TenantId};
use fairway_ledger::store::history_until;
use fairway_ledger::{EventStore, Polarity, RevenueEvent, RevenueEventType};
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Longest monthly history the trend fit will consume.
const HISTORY_MONTHS: usize = 12;

/// Projection stance for a forecast point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastScenario {
    Conservative,
    Realistic,
    Optimistic,
}

impl ForecastScenario {
    /// All scenarios, in presentation order.
    pub fn all() -> [ForecastScenario; 3] {
        [Self::Conservative, Self::Realistic, Self::Optimistic]
    }
}

impl std::fmt::Display for ForecastScenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Conservative => "conservative",
            Self::Realistic => "realistic",
            Self::Optimistic => "optimistic",
        };
        write!(f, "{}", label)
    }
}

/// One projected month under one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// The projected calendar month.
    pub month: DateRange,
    /// Months after the forecast origin, starting at 1.
    pub months_ahead: u32,
    pub scenario: ForecastScenario,
    /// Projected net revenue, floored at zero.
    pub projected_net_revenue: Decimal,
    /// Lower interval bound, floored at zero.
    pub interval_low: Decimal,
    /// Upper interval bound.
    pub interval_high: Decimal,
    /// Confidence in [0, 1]; never increases with the horizon.
    pub confidence: f64,
    /// Interpretability notes; they never alter the numbers.
    pub contributing_factors: Vec<String>,
}

/// A full projection for one tenant scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueForecast {
    pub tenant_id: Option<TenantId>,
    pub generated_at: DateTime<Utc>,
    /// Completed months the fit consumed.
    pub history_months: u32,
    pub horizon_months: u32,
    /// Standard deviation of month-over-month net deltas.
    pub volatility: Decimal,
    /// `horizon_months * 3` points, ordered by month then scenario.
    pub points: Vec<ForecastPoint>,
}

/// Projects future net revenue from the ledger's monthly history.
pub struct ForecastEngine {
    store: Arc<dyn EventStore>,
    policy: ForecastPolicy,
}

impl ForecastEngine {
    pub fn new(store: Arc<dyn EventStore>, policy: ForecastPolicy) -> Self {
        Self { store, policy }
    }

    /// Projects `months_ahead` future months for the given scope.
    ///
    /// Requires at least `policy.min_history` completed months of ledger
    /// history; fails with `ForecastFailed` otherwise. The whole series is
    /// read from one store snapshot, so a concurrent append cannot tear the
    /// history mid-fit.
    pub async fn forecast(
        &self,
        tenant: Option<TenantId>,
        months_ahead: u32,
        as_of: DateTime<Utc>,
    ) -> PlatformResult<RevenueForecast> {
        if months_ahead == 0 {
            return Err(PlatformError::MalformedRequest(
                "forecast horizon must be at least one month".into(),
            ));
        }

        let current_month = RevenuePeriod::Monthly.bucket_for(as_of);
        let history = self
            .store
            .query(tenant, &history_until(current_month.start))
            .await?;
        if history.is_empty() {
            return Err(PlatformError::ForecastFailed(
                "no completed revenue history to project from".into(),
            ));
        }

        let series = monthly_series(&history, current_month.start);
        let n = series.len();
        if n < self.policy.min_history {
            return Err(PlatformError::ForecastFailed(format!(
                "need {} completed months of history, have {}",
                self.policy.min_history, n
            )));
        }

        let nets: Vec<Decimal> = series.iter().map(|(_, net)| *net).collect();
        let fit = weighted_linear_fit(&nets);
        let volatility = delta_std_dev(&nets);
        let spread = self.policy.scenario_spread * volatility;
        let shared_factors = describe_factors(&history, &fit, volatility, &nets);

        let n_dec = Decimal::from(n as u64);
        let mut points = Vec::with_capacity(months_ahead as usize * 3);
        for k in 1..=months_ahead {
            let month = future_month(&current_month, k);
            let x = Decimal::from(n as u64 + u64::from(k));
            let trend = fit.intercept + fit.slope * x;
            let half_width = volatility * (Decimal::ONE + Decimal::from(k) / n_dec);
            let confidence = (self.policy.confidence_base
                - self.policy.confidence_decay * f64::from(k))
            .max(self.policy.confidence_floor);

            let mut factors = shared_factors.clone();
            if k as usize > n {
                factors.push("projection horizon exceeds historical depth".to_string());
            }

            for scenario in ForecastScenario::all() {
                let adjusted = match scenario {
                    ForecastScenario::Conservative => trend - spread,
                    ForecastScenario::Realistic => trend,
                    ForecastScenario::Optimistic => trend + spread,
                };
                let projected = adjusted.max(Decimal::ZERO);
                points.push(ForecastPoint {
                    month,
                    months_ahead: k,
                    scenario,
                    projected_net_revenue: projected,
                    interval_low: (projected - half_width).max(Decimal::ZERO),
                    interval_high: projected + half_width,
                    confidence,
                    contributing_factors: factors.clone(),
                });
            }
        }

        debug!(
            tenant = ?tenant,
            history = n,
            horizon = months_ahead,
            volatility = %volatility,
            "forecast generated"
        );

        Ok(RevenueForecast {
            tenant_id: tenant,
            generated_at: Utc::now(),
            history_months: n as u32,
            horizon_months: months_ahead,
            volatility,
            points,
        })
    }
}

struct TrendFit {
    slope: Decimal,
    intercept: Decimal,
}

/// Net revenue per completed month, oldest first, capped at
/// [`HISTORY_MONTHS`]. Months inside the observed span with no events count
/// as zero revenue.
fn monthly_series(
    history: &[RevenueEvent],
    exclusive_end: DateTime<Utc>,
) -> Vec<(DateRange, Decimal)> {
    let first = match history.first() {
        Some(event) => event.occurred_at,
        None => return Vec::new(),
    };

    let mut buckets = Vec::new();
    let mut bucket = RevenuePeriod::Monthly.bucket_for(first);
    while bucket.start < exclusive_end {
        buckets.push(bucket);
        let next_start = future_month(&bucket, 1).start;
        if next_start <= bucket.start {
            break;
        }
        bucket = RevenuePeriod::Monthly.bucket_for(next_start);
    }
    if buckets.len() > HISTORY_MONTHS {
        buckets.drain(..buckets.len() - HISTORY_MONTHS);
    }

    buckets
        .into_iter()
        .map(|bucket| {
            let net = net_revenue_in(history, &bucket).unwrap_or(Decimal::ZERO);
            (bucket, net)
        })
        .collect()
}

/// Least-squares line with weights ramping linearly toward recent samples.
fn weighted_linear_fit(nets: &[Decimal]) -> TrendFit {
    let mut sum_w = Decimal::ZERO;
    let mut sum_wx = Decimal::ZERO;
    let mut sum_wy = Decimal::ZERO;
    for (i, net) in nets.iter().enumerate() {
        let x = Decimal::from(i as u64 + 1);
        let w = x;
        sum_w += w;
        sum_wx += w * x;
        sum_wy += w * net;
    }
    if sum_w == Decimal::ZERO {
        return TrendFit {
            slope: Decimal::ZERO,
            intercept: Decimal::ZERO,
        };
    }

    let x_mean = sum_wx / sum_w;
    let y_mean = sum_wy / sum_w;
    let mut numerator = Decimal::ZERO;
    let mut denominator = Decimal::ZERO;
    for (i, net) in nets.iter().enumerate() {
        let x = Decimal::from(i as u64 + 1);
        let w = x;
        numerator += w * (x - x_mean) * (net - y_mean);
        denominator += w * (x - x_mean) * (x - x_mean);
    }

    let slope = if denominator == Decimal::ZERO {
        Decimal::ZERO
    } else {
        numerator / denominator
    };
    TrendFit {
        slope,
        intercept: y_mean - slope * x_mean,
    }
}

/// Population standard deviation of consecutive deltas.
fn delta_std_dev(nets: &[Decimal]) -> Decimal {
    if nets.len() < 2 {
        return Decimal::ZERO;
    }
    let deltas: Vec<Decimal> = nets.windows(2).map(|pair| pair[1] - pair[0]).collect();
    let count = Decimal::from(deltas.len() as u64);
    let mean: Decimal = deltas.iter().copied().sum::<Decimal>() / count;
    let variance: Decimal = deltas
        .iter()
        .map(|delta| (*delta - mean) * (*delta - mean))
        .sum::<Decimal>()
        / count;
    // Variance is non-negative, so the root always exists.
    variance.sqrt().unwrap_or(Decimal::ZERO)
}

fn future_month(current: &DateRange, k: u32) -> DateRange {
    let start = current
        .start
        .checked_add_months(Months::new(k))
        .unwrap_or(current.start);
    let end = start
        .checked_add_months(Months::new(1))
        .unwrap_or(start);
    DateRange { start, end }
}

/// Human-readable drivers behind the projection.
fn describe_factors(
    history: &[RevenueEvent],
    fit: &TrendFit,
    volatility: Decimal,
    nets: &[Decimal],
) -> Vec<String> {
    let mut factors = Vec::new();

    let mut driver: Option<(RevenueEventType, Decimal)> = None;
    for event_type in RevenueEventType::all() {
        if event_type.polarity() != Polarity::Positive {
            continue;
        }
        let total: Decimal = history
            .iter()
            .filter(|event| event.event_type == event_type)
            .map(|event| event.amount)
            .sum();
        if total > Decimal::ZERO && driver.map_or(true, |(_, best)| total > best) {
            driver = Some((event_type, total));
        }
    }
    if let Some((event_type, _)) = driver {
        factors.push(format!("primary revenue driver: {}", event_type));
    }

    if fit.slope > Decimal::ZERO {
        factors.push(format!("upward trend of {} per month", fit.slope.round_dp(2)));
    } else if fit.slope < Decimal::ZERO {
        factors.push(format!(
            "downward trend of {} per month",
            fit.slope.round_dp(2)
        ));
    } else {
        factors.push("flat revenue trend".to_string());
    }

    let n = Decimal::from(nets.len() as u64);
    let mean_net: Decimal = nets.iter().copied().sum::<Decimal>() / n;
    if mean_net > Decimal::ZERO && volatility * Decimal::from(4u64) > mean_net {
        factors.push("high month-to-month volatility".to_string());
    }

    if nets.len() >= 12 {
        factors.push("full-year history captures seasonal variation".to_string());
    } else {
        factors.push("history too short to separate seasonality".to_string());
    }

    factors
}
