//! Deterministic revenue metrics derived from ledger snapshots.

use chrono::{DateTime, Utc};
use fairway_common::{
    CurrencyCode, CustomerId, DateRange, PlatformError, PlatformResult, RevenuePeriod,
    SubscriptionId, TenantId,
};
use fairway_ledger::store::history_until;
use fairway_ledger::{EventSource, EventStore, Polarity, RevenueEvent, RevenueEventType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

/// Point-in-time revenue snapshot for one period bucket.
///
/// Recomputing over the same event set yields a bit-identical value: every
/// field is a pure fold over the events, with no wall-clock stamp inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueMetrics {
    /// Tenant scope; `None` means platform-wide.
    pub tenant_id: Option<TenantId>,
    /// Granularity the bucket was derived from.
    pub period: RevenuePeriod,
    /// The concrete half-open window aggregated.
    pub bucket: DateRange,
    /// Currency shared by every event in the window.
    pub currency: CurrencyCode,
    /// Created + renewed + upgraded amounts minus downgrade deltas.
    pub recurring_revenue: Decimal,
    /// One-time payments, setup fees, and add-on purchases.
    pub one_time_revenue: Decimal,
    /// Metered usage charges.
    pub usage_revenue: Decimal,
    /// Recurring + one-time + usage.
    pub gross_revenue: Decimal,
    /// Refunds plus chargebacks.
    pub refunds: Decimal,
    /// Goodwill and promotional credits.
    pub credits: Decimal,
    /// Gross minus refunds minus credits.
    pub net_revenue: Decimal,
    /// Recurring revenue normalized to a monthly cadence.
    pub mrr: Decimal,
    /// `mrr * 12`.
    pub arr: Decimal,
    /// Distinct customers with a non-cancelling event in the window.
    pub customer_count: u64,
    /// Net revenue per counted customer; zero when no customers.
    pub average_revenue_per_customer: Decimal,
    /// Cancellations over subscriptions active at period start.
    /// `None` when nothing was active at the boundary.
    pub churn_rate: Option<Decimal>,
    /// Net revenue change versus the previous bucket. `None` when the
    /// previous bucket is empty or netted to zero.
    pub growth_rate: Option<Decimal>,
    /// Events aggregated in the window.
    pub event_count: u64,
}

/// One row of a breakdown table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownSlice<K> {
    pub key: K,
    pub amount: Decimal,
    pub event_count: u64,
    /// Fraction of gross revenue, zero for slices that do not contribute
    /// to gross (reversals, credits, lifecycle events).
    pub share_of_gross: Decimal,
}

/// Revenue sliced by event type and by source channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueBreakdown {
    pub tenant_id: Option<TenantId>,
    pub bucket: DateRange,
    pub by_event_type: Vec<BreakdownSlice<RevenueEventType>>,
    pub by_source: Vec<BreakdownSlice<EventSource>>,
}

/// Derives [`RevenueMetrics`] and [`RevenueBreakdown`] from ledger windows.
pub struct MetricsAggregator {
    store: Arc<dyn EventStore>,
}

impl MetricsAggregator {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Computes metrics for the bucket of `period` containing `as_of`.
    ///
    /// Fails with `InsufficientData` when the window holds no events.
    pub async fn compute(
        &self,
        period: &RevenuePeriod,
        tenant: Option<TenantId>,
        as_of: DateTime<Utc>,
    ) -> PlatformResult<RevenueMetrics> {
        self.compute_inner(period, tenant, as_of, false).await
    }

    /// Like [`compute`](Self::compute) but an empty window yields a
    /// zero-valued baseline instead of an error.
    pub async fn compute_or_baseline(
        &self,
        period: &RevenuePeriod,
        tenant: Option<TenantId>,
        as_of: DateTime<Utc>,
    ) -> PlatformResult<RevenueMetrics> {
        self.compute_inner(period, tenant, as_of, true).await
    }

    async fn compute_inner(
        &self,
        period: &RevenuePeriod,
        tenant: Option<TenantId>,
        as_of: DateTime<Utc>,
        allow_empty: bool,
    ) -> PlatformResult<RevenueMetrics> {
        let bucket = period.bucket_for(as_of);

        // One snapshot covers the window, the previous bucket, and the
        // pre-window history the churn denominator needs.
        let history = self.store.query(tenant, &history_until(bucket.end)).await?;
        let (before, window): (Vec<_>, Vec<_>) = history
            .into_iter()
            .partition(|event| event.occurred_at < bucket.start);

        if window.is_empty() && !allow_empty {
            return Err(PlatformError::InsufficientData(format!(
                "no revenue events in {}",
                bucket
            )));
        }

        let currency = window_currency(&window)?;
        let totals = Totals::fold(window.iter());

        let mut customers: HashSet<CustomerId> = HashSet::new();
        let mut cancelled_subscriptions: HashSet<SubscriptionId> = HashSet::new();
        for event in &window {
            if event.event_type == RevenueEventType::SubscriptionCancelled {
                if let Some(subscription) = event.subscription_id {
                    cancelled_subscriptions.insert(subscription);
                }
            } else if let Some(customer) = event.customer_id {
                customers.insert(customer);
            }
        }

        let gross = totals.gross();
        let net = totals.net();
        let mrr = period.normalize_to_monthly(totals.recurring, &bucket);
        let arr = mrr * MONTHS_PER_YEAR;

        let customer_count = customers.len() as u64;
        let average_revenue_per_customer = if customer_count == 0 {
            Decimal::ZERO
        } else {
            net / Decimal::from(customer_count)
        };

        let active_at_start = active_subscriptions_at_boundary(&before);
        let churn_rate = if active_at_start.is_empty() {
            None
        } else {
            Some(
                Decimal::from(cancelled_subscriptions.len() as u64)
                    / Decimal::from(active_at_start.len() as u64),
            )
        };

        let previous = period.previous_bucket(&bucket);
        let previous_net = net_revenue_in(&before, &previous);
        let growth_rate = match previous_net {
            Some(prev) if prev != Decimal::ZERO => Some((net - prev) / prev),
            _ => None,
        };

        debug!(
            tenant = ?tenant,
            bucket = %bucket,
            events = window.len(),
            net = %net,
            "metrics computed"
        );

        Ok(RevenueMetrics {
            tenant_id: tenant,
            period: *period,
            bucket,
            currency,
            recurring_revenue: totals.recurring,
            one_time_revenue: totals.one_time,
            usage_revenue: totals.usage,
            gross_revenue: gross,
            refunds: totals.refunds,
            credits: totals.credits,
            net_revenue: net,
            mrr,
            arr,
            customer_count,
            average_revenue_per_customer,
            churn_rate,
            growth_rate,
            event_count: window.len() as u64,
        })
    }

    /// Slices the window's events by type and by source channel.
    pub async fn breakdown(
        &self,
        period: &RevenuePeriod,
        tenant: Option<TenantId>,
        as_of: DateTime<Utc>,
    ) -> PlatformResult<RevenueBreakdown> {
        let bucket = period.bucket_for(as_of);
        let window = self.store.query(tenant, &bucket).await?;
        if window.is_empty() {
            return Err(PlatformError::InsufficientData(format!(
                "no revenue events in {}",
                bucket
            )));
        }
        window_currency(&window)?;

        let gross: Decimal = window
            .iter()
            .filter(|event| event.event_type.polarity() == Polarity::Positive)
            .map(|event| event.amount)
            .sum();

        let share = |event_types_gross: Decimal| {
            if gross == Decimal::ZERO {
                Decimal::ZERO
            } else {
                event_types_gross / gross
            }
        };

        let mut by_event_type = Vec::new();
        for event_type in RevenueEventType::all() {
            let matching: Vec<_> = window
                .iter()
                .filter(|event| event.event_type == event_type)
                .collect();
            if matching.is_empty() {
                continue;
            }
            let amount: Decimal = matching.iter().map(|event| event.amount).sum();
            let contributes = event_type.polarity() == Polarity::Positive;
            by_event_type.push(BreakdownSlice {
                key: event_type,
                amount,
                event_count: matching.len() as u64,
                share_of_gross: if contributes { share(amount) } else { Decimal::ZERO },
            });
        }

        let mut by_source = Vec::new();
        for source in EventSource::all() {
            let matching: Vec<_> = window
                .iter()
                .filter(|event| event.source == source)
                .collect();
            if matching.is_empty() {
                continue;
            }
            let contributing: Decimal = matching
                .iter()
                .filter(|event| event.event_type.polarity() == Polarity::Positive)
                .map(|event| event.amount)
                .sum();
            let amount: Decimal = matching.iter().map(|event| event.amount).sum();
            by_source.push(BreakdownSlice {
                key: source,
                amount,
                event_count: matching.len() as u64,
                share_of_gross: share(contributing),
            });
        }

        Ok(RevenueBreakdown {
            tenant_id: tenant,
            bucket,
            by_event_type,
            by_source,
        })
    }
}

/// Category sums over one event window.
#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    recurring: Decimal,
    one_time: Decimal,
    usage: Decimal,
    refunds: Decimal,
    credits: Decimal,
}

impl Totals {
    fn fold<'a>(events: impl Iterator<Item = &'a RevenueEvent>) -> Self {
        let mut totals = Self::default();
        for event in events {
            match event.event_type {
                RevenueEventType::SubscriptionCreated
                | RevenueEventType::SubscriptionRenewed
                | RevenueEventType::SubscriptionUpgraded => totals.recurring += event.amount,
                RevenueEventType::SubscriptionDowngraded => totals.recurring -= event.amount,
                RevenueEventType::SubscriptionCancelled => {}
                RevenueEventType::OneTimePayment
                | RevenueEventType::SetupFee
                | RevenueEventType::AddOnPurchase => totals.one_time += event.amount,
                RevenueEventType::UsageCharge => totals.usage += event.amount,
                RevenueEventType::Refund | RevenueEventType::Chargeback => {
                    totals.refunds += event.amount
                }
                RevenueEventType::Credit => totals.credits += event.amount,
            }
        }
        totals
    }

    fn gross(&self) -> Decimal {
        self.recurring + self.one_time + self.usage
    }

    fn net(&self) -> Decimal {
        self.gross() - self.refunds - self.credits
    }
}

/// Subscriptions still active immediately before a window starts.
///
/// `before` must be ordered by `(occurred_at, id)` so that a cancellation
/// followed by a re-creation nets out correctly.
fn active_subscriptions_at_boundary(before: &[RevenueEvent]) -> HashSet<SubscriptionId> {
    let mut active = HashSet::new();
    for event in before {
        match event.event_type {
            RevenueEventType::SubscriptionCreated
            | RevenueEventType::SubscriptionRenewed
            | RevenueEventType::SubscriptionUpgraded
            | RevenueEventType::SubscriptionDowngraded => {
                if let Some(subscription) = event.subscription_id {
                    active.insert(subscription);
                }
            }
            RevenueEventType::SubscriptionCancelled => {
                if let Some(subscription) = event.subscription_id {
                    active.remove(&subscription);
                }
            }
            RevenueEventType::OneTimePayment
            | RevenueEventType::SetupFee
            | RevenueEventType::AddOnPurchase
            | RevenueEventType::UsageCharge
            | RevenueEventType::Refund
            | RevenueEventType::Chargeback
            | RevenueEventType::Credit => {}
        }
    }
    active
}

/// Net revenue over the events falling inside `range`, `None` when empty.
pub(crate) fn net_revenue_in(events: &[RevenueEvent], range: &DateRange) -> Option<Decimal> {
    let in_range: Vec<&RevenueEvent> = events
        .iter()
        .filter(|event| range.contains(event.occurred_at))
        .collect();
    if in_range.is_empty() {
        return None;
    }
    Some(Totals::fold(in_range.into_iter()).net())
}

/// The single currency shared by a window, or USD for an empty one.
fn window_currency(window: &[RevenueEvent]) -> PlatformResult<CurrencyCode> {
    let mut found: Option<&CurrencyCode> = None;
    for event in window {
        match found {
            None => found = Some(&event.currency),
            Some(current) if current != &event.currency => {
                return Err(PlatformError::CalculationError(format!(
                    "window mixes currencies {} and {}",
                    current, event.currency
                )));
            }
            Some(_) => {}
        }
    }
    Ok(found.cloned().unwrap_or_else(CurrencyCode::usd))
}
