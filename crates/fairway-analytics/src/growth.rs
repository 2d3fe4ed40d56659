//! Period-over-period growth classification.

use crate::metrics::net_revenue_in;
use chrono::{DateTime, Utc};
use fairway_common::{
    DateRange, GrowthPolicy, PlatformError, PlatformResult, RevenuePeriod, TenantId,
};
use fairway_ledger::store::history_until;
use fairway_ledger::{EventStore, RevenueEvent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Deterministic classification of recent growth-rate samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    /// Strictly increasing growth rates.
    Accelerating,
    /// Strictly decreasing growth rates.
    Declining,
    /// Growth-rate sign flips more than once.
    Volatile,
    Steady,
}

/// Growth picture for one tenant scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthAnalysis {
    pub tenant_id: Option<TenantId>,
    /// Last completed quarter versus the one before, `None` when the
    /// earlier quarter had no revenue to compare against.
    pub quarter_over_quarter: Option<Decimal>,
    /// Last completed year versus the one before.
    pub year_over_year: Option<Decimal>,
    /// Trailing monthly growth-rate samples, oldest first.
    pub monthly_growth_rates: Vec<Decimal>,
    pub trend: TrendDirection,
    pub analyzed_at: DateTime<Utc>,
}

/// Compares calendar-aligned windows and classifies the trend.
pub struct GrowthAnalyzer {
    store: Arc<dyn EventStore>,
    policy: GrowthPolicy,
}

impl GrowthAnalyzer {
    pub fn new(store: Arc<dyn EventStore>, policy: GrowthPolicy) -> Self {
        Self { store, policy }
    }

    /// Computes quarter-over-quarter and year-over-year growth from the
    /// last fully completed windows, plus the monthly trend classification.
    ///
    /// Only completed buckets are compared; the bucket containing `as_of`
    /// is partial by definition and never enters a comparison.
    pub async fn analyze(
        &self,
        tenant: Option<TenantId>,
        as_of: DateTime<Utc>,
    ) -> PlatformResult<GrowthAnalysis> {
        let history = self.store.query(tenant, &history_until(as_of)).await?;

        let quarter_over_quarter =
            completed_pair_growth(&history, &RevenuePeriod::Quarterly, as_of);
        let year_over_year = completed_pair_growth(&history, &RevenuePeriod::Yearly, as_of);

        let monthly_growth_rates = self.trailing_monthly_rates(&history, as_of);
        let trend = self.classify(&monthly_growth_rates);

        debug!(
            tenant = ?tenant,
            qoq = ?quarter_over_quarter,
            yoy = ?year_over_year,
            trend = ?trend,
            "growth analyzed"
        );

        Ok(GrowthAnalysis {
            tenant_id: tenant,
            quarter_over_quarter,
            year_over_year,
            monthly_growth_rates,
            trend,
            analyzed_at: Utc::now(),
        })
    }

    /// Growth between two explicit windows of the same granularity.
    ///
    /// Both windows must be calendar-aligned full buckets and must not
    /// overlap; a partial window is rejected rather than silently compared.
    pub async fn growth_between(
        &self,
        tenant: Option<TenantId>,
        period: &RevenuePeriod,
        earlier: DateRange,
        later: DateRange,
    ) -> PlatformResult<Option<Decimal>> {
        if !period.is_calendar_aligned(&earlier) || !period.is_calendar_aligned(&later) {
            return Err(PlatformError::InvalidPeriod(format!(
                "comparison windows must be full {:?} buckets",
                period
            )));
        }
        if earlier.end > later.start {
            return Err(PlatformError::InvalidPeriod(
                "comparison windows must be ordered and non-overlapping".into(),
            ));
        }

        let history = self.store.query(tenant, &history_until(later.end)).await?;
        Ok(growth_ratio(&history, &earlier, &later))
    }

    /// Applies the trend rule to the last `trend_window` samples.
    pub fn classify(&self, rates: &[Decimal]) -> TrendDirection {
        let window = self.policy.trend_window;
        let recent: &[Decimal] = if rates.len() > window {
            &rates[rates.len() - window..]
        } else {
            rates
        };
        if recent.len() < 2 {
            return TrendDirection::Steady;
        }

        let increasing = recent.windows(2).all(|pair| pair[1] > pair[0]);
        if increasing {
            return TrendDirection::Accelerating;
        }
        let decreasing = recent.windows(2).all(|pair| pair[1] < pair[0]);
        if decreasing {
            return TrendDirection::Declining;
        }

        let mut sign_flips = 0usize;
        for pair in recent.windows(2) {
            if (pair[0] >= Decimal::ZERO) != (pair[1] >= Decimal::ZERO) {
                sign_flips += 1;
            }
        }
        if sign_flips > 1 {
            return TrendDirection::Volatile;
        }
        TrendDirection::Steady
    }

    /// Growth rates between consecutive completed months, oldest first.
    /// Months whose predecessor netted zero contribute no sample.
    fn trailing_monthly_rates(
        &self,
        history: &[RevenueEvent],
        as_of: DateTime<Utc>,
    ) -> Vec<Decimal> {
        let current = RevenuePeriod::Monthly.bucket_for(as_of);
        let mut buckets = Vec::with_capacity(self.policy.trend_window + 1);
        let mut bucket = RevenuePeriod::Monthly.previous_bucket(&current);
        for _ in 0..=self.policy.trend_window {
            buckets.push(bucket);
            bucket = RevenuePeriod::Monthly.previous_bucket(&bucket);
        }
        buckets.reverse();

        let mut rates = Vec::new();
        for pair in buckets.windows(2) {
            if let Some(rate) = growth_ratio(history, &pair[0], &pair[1]) {
                rates.push(rate);
            }
        }
        rates
    }
}

/// Growth of the last completed bucket of `period` over the one before it.
fn completed_pair_growth(
    history: &[RevenueEvent],
    period: &RevenuePeriod,
    as_of: DateTime<Utc>,
) -> Option<Decimal> {
    let current = period.bucket_for(as_of);
    let last_completed = period.previous_bucket(&current);
    let before_that = period.previous_bucket(&last_completed);
    growth_ratio(history, &before_that, &last_completed)
}

/// `(later − earlier) / earlier`, `None` when the earlier window is empty
/// or netted to zero. A later window with no events counts as zero revenue.
fn growth_ratio(
    history: &[RevenueEvent],
    earlier: &DateRange,
    later: &DateRange,
) -> Option<Decimal> {
    let earlier_net = net_revenue_in(history, earlier)?;
    if earlier_net == Decimal::ZERO {
        return None;
    }
    let later_net = net_revenue_in(history, later).unwrap_or(Decimal::ZERO);
    Some((later_net - earlier_net) / earlier_net)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fairway_common::CurrencyCode;
    use fairway_ledger::{EventSource, InMemoryEventStore, RevenueEvent, RevenueEventType};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    fn midnight(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    async fn analyzer_with(
        tenant: TenantId,
        monthly_nets: &[(i32, u32, Decimal)],
    ) -> GrowthAnalyzer {
        let store = Arc::new(InMemoryEventStore::default());
        for (year, month, net) in monthly_nets {
            let event = RevenueEvent::new(
                tenant,
                RevenueEventType::OneTimePayment,
                *net,
                CurrencyCode::usd(),
                at(*year, *month, 10),
                EventSource::BillingProvider,
            );
            store.append(event).await.unwrap();
        }
        GrowthAnalyzer::new(store, GrowthPolicy::default())
    }

    #[tokio::test]
    async fn test_rising_rates_classify_as_accelerating() {
        let tenant = Uuid::new_v4();
        let analyzer = analyzer_with(
            tenant,
            &[
                (2025, 1, dec!(1000)),
                (2025, 2, dec!(1050)),    // +5%
                (2025, 3, dec!(1134)),    // +8%
                (2025, 4, dec!(1270.08)), // +12%
            ],
        )
        .await;

        let analysis = analyzer
            .analyze(Some(tenant), at(2025, 5, 2))
            .await
            .unwrap();
        assert_eq!(
            analysis.monthly_growth_rates,
            vec![dec!(0.05), dec!(0.08), dec!(0.12)]
        );
        assert_eq!(analysis.trend, TrendDirection::Accelerating);
    }

    #[tokio::test]
    async fn test_falling_rates_classify_as_declining() {
        let tenant = Uuid::new_v4();
        let analyzer = analyzer_with(
            tenant,
            &[
                (2025, 1, dec!(1000)),
                (2025, 2, dec!(1120)), // +12%
                (2025, 3, dec!(1209.6)), // +8%
                (2025, 4, dec!(1270.08)), // +5%
            ],
        )
        .await;

        let analysis = analyzer
            .analyze(Some(tenant), at(2025, 5, 2))
            .await
            .unwrap();
        assert_eq!(analysis.trend, TrendDirection::Declining);
    }

    #[tokio::test]
    async fn test_sign_flips_classify_as_volatile() {
        let tenant = Uuid::new_v4();
        let analyzer = analyzer_with(tenant, &[]).await;
        let trend = analyzer.classify(&[dec!(0.05), dec!(-0.03), dec!(0.04)]);
        assert_eq!(trend, TrendDirection::Volatile);
    }

    #[tokio::test]
    async fn test_flat_rates_classify_as_steady() {
        let tenant = Uuid::new_v4();
        let analyzer = analyzer_with(tenant, &[]).await;
        let trend = analyzer.classify(&[dec!(0.05), dec!(0.05), dec!(0.05)]);
        assert_eq!(trend, TrendDirection::Steady);
    }

    #[tokio::test]
    async fn test_quarter_over_quarter_uses_completed_quarters() {
        let tenant = Uuid::new_v4();
        let analyzer = analyzer_with(
            tenant,
            &[
                (2025, 1, dec!(1000)),
                (2025, 2, dec!(1000)),
                (2025, 3, dec!(1000)),
                (2025, 4, dec!(1100)),
                (2025, 5, dec!(1100)),
                (2025, 6, dec!(1100)),
            ],
        )
        .await;

        let analysis = analyzer
            .analyze(Some(tenant), at(2025, 7, 5))
            .await
            .unwrap();
        assert_eq!(analysis.quarter_over_quarter, Some(dec!(0.1)));
        assert_eq!(analysis.year_over_year, None);
    }

    #[tokio::test]
    async fn test_year_over_year() {
        let tenant = Uuid::new_v4();
        let analyzer = analyzer_with(
            tenant,
            &[(2024, 6, dec!(12000)), (2025, 6, dec!(13200))],
        )
        .await;

        let analysis = analyzer
            .analyze(Some(tenant), at(2026, 2, 1))
            .await
            .unwrap();
        assert_eq!(analysis.year_over_year, Some(dec!(0.1)));
    }

    #[tokio::test]
    async fn test_partial_window_comparison_rejected() {
        let tenant = Uuid::new_v4();
        let analyzer = analyzer_with(tenant, &[(2025, 1, dec!(1000))]).await;

        let full_quarter = DateRange::new(midnight(2025, 1, 1), midnight(2025, 4, 1)).unwrap();
        let partial = DateRange::new(midnight(2025, 4, 1), midnight(2025, 5, 15)).unwrap();
        let err = analyzer
            .growth_between(Some(tenant), &RevenuePeriod::Quarterly, full_quarter, partial)
            .await;
        assert!(matches!(err, Err(PlatformError::InvalidPeriod(_))));
    }

    #[tokio::test]
    async fn test_overlapping_windows_rejected() {
        let tenant = Uuid::new_v4();
        let analyzer = analyzer_with(tenant, &[(2025, 1, dec!(1000))]).await;

        let first = DateRange::new(midnight(2025, 1, 1), midnight(2025, 4, 1)).unwrap();
        let err = analyzer
            .growth_between(Some(tenant), &RevenuePeriod::Quarterly, first, first)
            .await;
        assert!(matches!(err, Err(PlatformError::InvalidPeriod(_))));
    }
}
