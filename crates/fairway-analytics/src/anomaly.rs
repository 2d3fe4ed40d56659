//! Statistical anomaly detection over daily revenue.
//!
//! A rolling baseline (mean and standard deviation of daily net revenue)
//! is computed per point with the point under test excluded, so a single
//! outlier cannot hide itself by inflating its own baseline.

use crate::metrics::net_revenue_in;
use chrono::{DateTime, Duration, Utc};
use fairway_common::{AnomalyPolicy, DateRange, PlatformResult, RevenuePeriod, TenantId};
use fairway_ledger::{EventStore, RevenueEvent, RevenueEventType};
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// What shape of abnormality was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Net revenue far above the baseline.
    SuddenSpike,
    /// Net revenue far below the baseline.
    SuddenDrop,
    /// Sustained day-over-day oscillation without a single outlier day.
    UnusualPattern,
    /// A day with no events inside an otherwise active span.
    MissingData,
}

/// Severity bands keyed to deviation magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// One flagged abnormality.
///
/// For directional kinds, `observed`/`expected` are the day's net revenue
/// and the baseline mean, `deviation_sigmas` the distance between them in
/// standard deviations, and `revenue_delta` their difference. For
/// `UnusualPattern` the fields describe the oscillation (observed = average
/// swing, expected = average level); for `MissingData` the delta is the
/// baseline revenue the silent day failed to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueAnomaly {
    pub tenant_id: Option<TenantId>,
    pub kind: AnomalyKind,
    pub severity: AnomalySeverity,
    /// The day (or window, for pattern anomalies) affected.
    pub bucket: DateRange,
    pub observed: Decimal,
    pub expected: Decimal,
    pub deviation_sigmas: Decimal,
    pub revenue_delta: Decimal,
    /// Event types that moved most against their typical daily level.
    pub candidate_causes: Vec<String>,
    pub detected_at: DateTime<Utc>,
}

/// Flags abnormal daily revenue within a trailing window.
pub struct AnomalyDetector {
    store: Arc<dyn EventStore>,
    policy: AnomalyPolicy,
}

struct DaySample {
    bucket: DateRange,
    net: Decimal,
    has_events: bool,
}

impl AnomalyDetector {
    pub fn new(store: Arc<dyn EventStore>, policy: AnomalyPolicy) -> Self {
        Self { store, policy }
    }

    /// Scans the trailing window of completed days for anomalies.
    ///
    /// Returns an empty list when fewer than `policy.min_samples` days have
    /// any events; a quiet ledger is not an anomaly. Results are ordered by
    /// day, with at most one window-level pattern anomaly appended.
    pub async fn detect(
        &self,
        tenant: Option<TenantId>,
        as_of: DateTime<Utc>,
    ) -> PlatformResult<Vec<RevenueAnomaly>> {
        let today = RevenuePeriod::Daily.bucket_for(as_of);
        let window = DateRange {
            start: today.start - Duration::days(self.policy.window_days as i64),
            end: today.start,
        };
        let events = self.store.query(tenant, &window).await?;
        let days = daily_samples(&events, &window);

        // Leading and trailing silence is history, not signal.
        let first_active = days.iter().position(|day| day.has_events);
        let last_active = days.iter().rposition(|day| day.has_events);
        let (span_start, span_end) = match (first_active, last_active) {
            (Some(first), Some(last)) => (first, last),
            _ => return Ok(Vec::new()),
        };
        let span = &days[span_start..=span_end];

        let active: Vec<&DaySample> = span.iter().filter(|day| day.has_events).collect();
        if active.len() < self.policy.min_samples {
            return Ok(Vec::new());
        }

        let detected_at = Utc::now();
        let mut anomalies = Vec::new();

        for day in span {
            if !day.has_events {
                let baseline: Vec<Decimal> = active.iter().map(|sample| sample.net).collect();
                let (mean, _) = mean_and_std_dev(&baseline);
                anomalies.push(RevenueAnomaly {
                    tenant_id: tenant,
                    kind: AnomalyKind::MissingData,
                    severity: AnomalySeverity::Medium,
                    bucket: day.bucket,
                    observed: Decimal::ZERO,
                    expected: mean,
                    deviation_sigmas: Decimal::ZERO,
                    revenue_delta: -mean,
                    candidate_causes: vec!["no events recorded for the day".to_string()],
                    detected_at,
                });
                continue;
            }

            // Baseline over the other active days only.
            let baseline: Vec<Decimal> = active
                .iter()
                .filter(|sample| sample.bucket != day.bucket)
                .map(|sample| sample.net)
                .collect();
            if baseline.is_empty() {
                continue;
            }
            let (mean, std_dev) = mean_and_std_dev(&baseline);

            let deviation = if std_dev == Decimal::ZERO {
                if day.net == mean {
                    continue;
                }
                // A flat baseline broken at all is maximal surprise.
                let sign = if day.net > mean { Decimal::ONE } else { -Decimal::ONE };
                sign * self.policy.critical_sigma
            } else {
                (day.net - mean) / std_dev
            };

            let severity = match self.severity_for(deviation.abs()) {
                Some(severity) => severity,
                None => continue,
            };
            let kind = if deviation > Decimal::ZERO {
                AnomalyKind::SuddenSpike
            } else {
                AnomalyKind::SuddenDrop
            };

            anomalies.push(RevenueAnomaly {
                tenant_id: tenant,
                kind,
                severity,
                bucket: day.bucket,
                observed: day.net,
                expected: mean,
                deviation_sigmas: deviation,
                revenue_delta: day.net - mean,
                candidate_causes: candidate_causes(&events, &day.bucket, active.len()),
                detected_at,
            });
        }

        if let Some(pattern) = self.oscillation_anomaly(tenant, &active, &window, detected_at) {
            anomalies.push(pattern);
        }

        debug!(
            tenant = ?tenant,
            window = %window,
            flagged = anomalies.len(),
            "anomaly scan complete"
        );
        Ok(anomalies)
    }

    fn severity_for(&self, deviation_abs: Decimal) -> Option<AnomalySeverity> {
        if deviation_abs >= self.policy.critical_sigma {
            Some(AnomalySeverity::Critical)
        } else if deviation_abs >= self.policy.high_sigma {
            Some(AnomalySeverity::High)
        } else if deviation_abs >= self.policy.medium_sigma {
            Some(AnomalySeverity::Medium)
        } else if deviation_abs >= self.policy.low_sigma {
            Some(AnomalySeverity::Low)
        } else {
            None
        }
    }

    /// One window-level anomaly when daily nets oscillate hard without any
    /// single day being an outlier on its own.
    fn oscillation_anomaly(
        &self,
        tenant: Option<TenantId>,
        active: &[&DaySample],
        window: &DateRange,
        detected_at: DateTime<Utc>,
    ) -> Option<RevenueAnomaly> {
        if active.len() < self.policy.min_samples {
            return None;
        }
        let nets: Vec<Decimal> = active.iter().map(|sample| sample.net).collect();
        let deltas: Vec<Decimal> = nets.windows(2).map(|pair| pair[1] - pair[0]).collect();
        if deltas.len() < 2 {
            return None;
        }

        let mut alternations = 0usize;
        for pair in deltas.windows(2) {
            if (pair[0] > Decimal::ZERO) != (pair[1] > Decimal::ZERO)
                && pair[0] != Decimal::ZERO
                && pair[1] != Decimal::ZERO
            {
                alternations += 1;
            }
        }
        let max_alternations = deltas.len() - 1;
        let highly_alternating = alternations * 10 >= max_alternations * 8;

        let count = Decimal::from(deltas.len() as u64);
        let mean_swing: Decimal =
            deltas.iter().map(|delta| delta.abs()).sum::<Decimal>() / count;
        let mean_level: Decimal =
            nets.iter().copied().sum::<Decimal>() / Decimal::from(nets.len() as u64);
        let material = mean_swing * Decimal::TWO > mean_level.abs();

        if !highly_alternating || !material {
            return None;
        }

        let severity = if alternations == max_alternations {
            AnomalySeverity::Medium
        } else {
            AnomalySeverity::Low
        };
        Some(RevenueAnomaly {
            tenant_id: tenant,
            kind: AnomalyKind::UnusualPattern,
            severity,
            bucket: *window,
            observed: mean_swing,
            expected: mean_level,
            deviation_sigmas: Decimal::ZERO,
            revenue_delta: Decimal::ZERO,
            candidate_causes: vec![format!(
                "daily net revenue oscillates with average swing {} against level {}",
                mean_swing.round_dp(2),
                mean_level.round_dp(2)
            )],
            detected_at,
        })
    }
}

fn daily_samples(events: &[RevenueEvent], window: &DateRange) -> Vec<DaySample> {
    let mut days = Vec::new();
    let mut start = window.start;
    while start < window.end {
        let end = start + Duration::days(1);
        let bucket = DateRange { start, end };
        let has_events = events
            .iter()
            .any(|event| bucket.contains(event.occurred_at));
        let net = net_revenue_in(events, &bucket).unwrap_or(Decimal::ZERO);
        days.push(DaySample {
            bucket,
            net,
            has_events,
        });
        start = end;
    }
    days
}

fn mean_and_std_dev(values: &[Decimal]) -> (Decimal, Decimal) {
    if values.is_empty() {
        return (Decimal::ZERO, Decimal::ZERO);
    }
    let count = Decimal::from(values.len() as u64);
    let mean: Decimal = values.iter().copied().sum::<Decimal>() / count;
    let variance: Decimal = values
        .iter()
        .map(|value| (*value - mean) * (*value - mean))
        .sum::<Decimal>()
        / count;
    (mean, variance.sqrt().unwrap_or(Decimal::ZERO))
}

/// Event types that moved most on the anomalous day versus their typical
/// per-active-day level, strongest movers first.
fn candidate_causes(
    events: &[RevenueEvent],
    day: &DateRange,
    active_days: usize,
) -> Vec<String> {
    let mut movers: Vec<(RevenueEventType, Decimal, Decimal)> = Vec::new();
    for event_type in RevenueEventType::all() {
        let day_total: Decimal = events
            .iter()
            .filter(|event| event.event_type == event_type && day.contains(event.occurred_at))
            .map(|event| event.amount)
            .sum();
        let window_total: Decimal = events
            .iter()
            .filter(|event| event.event_type == event_type)
            .map(|event| event.amount)
            .sum();
        let typical = window_total / Decimal::from(active_days as u64);
        let moved = (day_total - typical).abs();
        if moved > Decimal::ZERO {
            movers.push((event_type, day_total, typical));
        }
    }
    movers.sort_by(|a, b| {
        let lhs = (a.1 - a.2).abs();
        let rhs = (b.1 - b.2).abs();
        rhs.cmp(&lhs)
    });
    movers
        .into_iter()
        .take(2)
        .map(|(event_type, day_total, typical)| {
            format!(
                "{}: {} on the day vs {} typical",
                event_type,
                day_total.round_dp(2),
                typical.round_dp(2)
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fairway_common::CurrencyCode;
    use fairway_ledger::{EventSource, InMemoryEventStore};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn day(offset: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() + Duration::days(offset)
    }

    async fn store_with_daily_amounts(
        tenant: TenantId,
        amounts: &[Decimal],
    ) -> Arc<InMemoryEventStore> {
        let store = Arc::new(InMemoryEventStore::default());
        for (offset, amount) in amounts.iter().enumerate() {
            if *amount == Decimal::ZERO {
                continue; // leave the day silent
            }
            let event = RevenueEvent::new(
                tenant,
                RevenueEventType::OneTimePayment,
                *amount,
                CurrencyCode::usd(),
                day(offset as i64),
                EventSource::Api,
            );
            store.append(event).await.unwrap();
        }
        store
    }

    fn detector(store: Arc<InMemoryEventStore>) -> AnomalyDetector {
        AnomalyDetector::new(store, AnomalyPolicy::default())
    }

    #[tokio::test]
    async fn test_flat_history_is_quiet() {
        let tenant = Uuid::new_v4();
        let amounts = vec![dec!(100); 10];
        let store = store_with_daily_amounts(tenant, &amounts).await;

        let anomalies = detector(store)
            .detect(Some(tenant), day(12))
            .await
            .unwrap();
        assert!(anomalies.is_empty());
    }

    #[tokio::test]
    async fn test_spike_on_flat_baseline_is_critical() {
        let tenant = Uuid::new_v4();
        let mut amounts = vec![dec!(100); 10];
        amounts.push(dec!(1000)); // one wild day
        let store = store_with_daily_amounts(tenant, &amounts).await;

        let anomalies = detector(store)
            .detect(Some(tenant), day(12))
            .await
            .unwrap();
        assert_eq!(anomalies.len(), 1);
        let spike = &anomalies[0];
        assert_eq!(spike.kind, AnomalyKind::SuddenSpike);
        assert_eq!(spike.severity, AnomalySeverity::Critical);
        assert_eq!(spike.observed, dec!(1000));
        assert!(spike
            .candidate_causes
            .iter()
            .any(|cause| cause.contains("one_time_payment")));
    }

    #[tokio::test]
    async fn test_collapse_is_a_sudden_drop() {
        let tenant = Uuid::new_v4();
        let amounts = vec![
            dec!(100),
            dec!(102),
            dec!(98),
            dec!(101),
            dec!(99),
            dec!(100),
            dec!(103),
            dec!(2), // collapse
        ];
        let store = store_with_daily_amounts(tenant, &amounts).await;

        let anomalies = detector(store)
            .detect(Some(tenant), day(9))
            .await
            .unwrap();
        let drop = anomalies
            .iter()
            .find(|anomaly| anomaly.kind == AnomalyKind::SuddenDrop)
            .unwrap();
        assert_eq!(drop.severity, AnomalySeverity::Critical);
        assert!(drop.revenue_delta < Decimal::ZERO);
        assert!(drop.deviation_sigmas < Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_silent_day_inside_active_span() {
        let tenant = Uuid::new_v4();
        let mut amounts = vec![dec!(100); 10];
        amounts[5] = Decimal::ZERO; // gap
        let store = store_with_daily_amounts(tenant, &amounts).await;

        let anomalies = detector(store)
            .detect(Some(tenant), day(12))
            .await
            .unwrap();
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].kind, AnomalyKind::MissingData);
        assert_eq!(anomalies[0].revenue_delta, dec!(-100));
    }

    #[tokio::test]
    async fn test_too_few_samples_yields_nothing() {
        let tenant = Uuid::new_v4();
        let amounts = vec![dec!(100), dec!(500), dec!(90)];
        let store = store_with_daily_amounts(tenant, &amounts).await;

        let anomalies = detector(store)
            .detect(Some(tenant), day(5))
            .await
            .unwrap();
        assert!(anomalies.is_empty());
    }

    #[tokio::test]
    async fn test_oscillation_without_single_outlier() {
        let tenant = Uuid::new_v4();
        let amounts = vec![
            dec!(200),
            dec!(20),
            dec!(210),
            dec!(15),
            dec!(205),
            dec!(18),
            dec!(200),
            dec!(22),
        ];
        let store = store_with_daily_amounts(tenant, &amounts).await;

        let anomalies = detector(store)
            .detect(Some(tenant), day(9))
            .await
            .unwrap();
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].kind, AnomalyKind::UnusualPattern);
        assert_eq!(anomalies[0].severity, AnomalySeverity::Medium);
    }

    #[tokio::test]
    async fn test_severity_bands() {
        let store = Arc::new(InMemoryEventStore::default());
        let detector = detector(store);
        assert_eq!(detector.severity_for(dec!(1.9)), None);
        assert_eq!(detector.severity_for(dec!(2.2)), Some(AnomalySeverity::Low));
        assert_eq!(
            detector.severity_for(dec!(2.7)),
            Some(AnomalySeverity::Medium)
        );
        assert_eq!(detector.severity_for(dec!(3.5)), Some(AnomalySeverity::High));
        assert_eq!(
            detector.severity_for(dec!(4.1)),
            Some(AnomalySeverity::Critical)
        );
    }
}
