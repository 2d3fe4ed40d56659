//! Live revenue signals fed incrementally from appended events.

use crate::event::{RevenueEvent, RevenueEventType};
use fairway_common::{DateRange, RevenuePeriod, SubscriptionId};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::watch;
use tracing::debug;

const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

/// Point-in-time view of the live signal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveRevenue {
    /// Net revenue across the whole ledger lifetime.
    pub total_revenue: Decimal,
    /// Monthly recurring revenue from subscription movements.
    pub mrr: Decimal,
    /// Annualized recurring revenue, `mrr * 12`.
    pub arr: Decimal,
    /// Fraction of month-start subscriptions cancelled so far this month.
    pub churn_rate: Decimal,
}

struct SignalState {
    lifetime_net: Decimal,
    mrr: Decimal,
    active_subscriptions: HashSet<SubscriptionId>,
    current_month: Option<DateRange>,
    cancelled_this_month: u64,
    active_at_month_start: u64,
}

impl SignalState {
    fn new() -> Self {
        Self {
            lifetime_net: Decimal::ZERO,
            mrr: Decimal::ZERO,
            active_subscriptions: HashSet::new(),
            current_month: None,
            cancelled_this_month: 0,
            active_at_month_start: 0,
        }
    }

    fn churn_rate(&self) -> Decimal {
        if self.active_at_month_start == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.cancelled_this_month) / Decimal::from(self.active_at_month_start)
    }
}

/// Publishes running revenue figures over watch channels.
///
/// Feed every accepted event through [`apply`](Self::apply); subscribers see
/// the latest value immediately and can await changes. MRR follows the
/// standard movement model: creations and upgrades add their amount,
/// downgrades and cancellations subtract it, renewals confirm the
/// subscription without moving MRR.
pub struct RevenueSignals {
    total_tx: watch::Sender<Decimal>,
    mrr_tx: watch::Sender<Decimal>,
    arr_tx: watch::Sender<Decimal>,
    churn_tx: watch::Sender<Decimal>,
    state: Mutex<SignalState>,
}

impl RevenueSignals {
    /// Creates a signal hub with all values at zero.
    pub fn new() -> Self {
        let (total_tx, _) = watch::channel(Decimal::ZERO);
        let (mrr_tx, _) = watch::channel(Decimal::ZERO);
        let (arr_tx, _) = watch::channel(Decimal::ZERO);
        let (churn_tx, _) = watch::channel(Decimal::ZERO);
        Self {
            total_tx,
            mrr_tx,
            arr_tx,
            churn_tx,
            state: Mutex::new(SignalState::new()),
        }
    }

    /// Folds one event into the running figures and publishes the result.
    ///
    /// The churn counters track the month the signals are currently in:
    /// the first event of a newer month snapshots the active-subscription
    /// count as that month's denominator. Events arriving late for an older
    /// month still adjust revenue and MRR but leave the churn counters alone.
    pub fn apply(&self, event: &RevenueEvent) {
        let mut state = self.state.lock();

        let bucket = RevenuePeriod::Monthly.bucket_for(event.occurred_at);
        let newer_month = match state.current_month {
            Some(current) => bucket.start > current.start,
            None => true,
        };
        if newer_month {
            state.active_at_month_start = state.active_subscriptions.len() as u64;
            state.cancelled_this_month = 0;
            state.current_month = Some(bucket);
        }
        let in_current_month = state.current_month == Some(bucket);

        state.lifetime_net += event.signed_amount();

        match event.event_type {
            RevenueEventType::SubscriptionCreated => {
                state.mrr += event.amount;
                if let Some(subscription) = event.subscription_id {
                    state.active_subscriptions.insert(subscription);
                }
            }
            RevenueEventType::SubscriptionRenewed => {
                if let Some(subscription) = event.subscription_id {
                    state.active_subscriptions.insert(subscription);
                }
            }
            RevenueEventType::SubscriptionUpgraded => {
                state.mrr += event.amount;
            }
            RevenueEventType::SubscriptionDowngraded => {
                state.mrr = (state.mrr - event.amount).max(Decimal::ZERO);
            }
            RevenueEventType::SubscriptionCancelled => {
                state.mrr = (state.mrr - event.amount).max(Decimal::ZERO);
                if let Some(subscription) = event.subscription_id {
                    state.active_subscriptions.remove(&subscription);
                }
                if in_current_month {
                    state.cancelled_this_month += 1;
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

        let mrr = state.mrr;
        let churn = state.churn_rate();
        self.total_tx.send_replace(state.lifetime_net);
        self.mrr_tx.send_replace(mrr);
        self.arr_tx.send_replace(mrr * MONTHS_PER_YEAR);
        self.churn_tx.send_replace(churn);

        debug!(event = %event.id, mrr = %mrr, "signals updated");
    }

    /// Receiver for lifetime net revenue.
    pub fn subscribe_total_revenue(&self) -> watch::Receiver<Decimal> {
        self.total_tx.subscribe()
    }

    /// Receiver for monthly recurring revenue.
    pub fn subscribe_mrr(&self) -> watch::Receiver<Decimal> {
        self.mrr_tx.subscribe()
    }

    /// Receiver for annualized recurring revenue.
    pub fn subscribe_arr(&self) -> watch::Receiver<Decimal> {
        self.arr_tx.subscribe()
    }

    /// Receiver for the in-month churn rate.
    pub fn subscribe_churn_rate(&self) -> watch::Receiver<Decimal> {
        self.churn_tx.subscribe()
    }

    /// Current value of every signal.
    pub fn live(&self) -> LiveRevenue {
        let mrr = *self.mrr_tx.borrow();
        LiveRevenue {
            total_revenue: *self.total_tx.borrow(),
            mrr,
            arr: *self.arr_tx.borrow(),
            churn_rate: *self.churn_tx.borrow(),
        }
    }
}

impl Default for RevenueSignals {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventSource;
    use chrono::{DateTime, TimeZone, Utc};
    use fairway_common::CurrencyCode;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn ts(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, month, day, 12, 0, 0).unwrap()
    }

    fn subscription_event(
        event_type: RevenueEventType,
        amount: Decimal,
        subscription: SubscriptionId,
        occurred_at: DateTime<Utc>,
    ) -> RevenueEvent {
        RevenueEvent::new(
            Uuid::new_v4(),
            event_type,
            amount,
            CurrencyCode::usd(),
            occurred_at,
            EventSource::BillingProvider,
        )
        .with_subscription(subscription)
    }

    #[test]
    fn test_creations_raise_mrr_and_total() {
        let signals = RevenueSignals::new();
        signals.apply(&subscription_event(
            RevenueEventType::SubscriptionCreated,
            dec!(100),
            Uuid::new_v4(),
            ts(1, 5),
        ));
        signals.apply(&subscription_event(
            RevenueEventType::SubscriptionCreated,
            dec!(50),
            Uuid::new_v4(),
            ts(1, 6),
        ));

        let live = signals.live();
        assert_eq!(live.total_revenue, dec!(150));
        assert_eq!(live.mrr, dec!(150));
        assert_eq!(live.arr, dec!(1800));
    }

    #[test]
    fn test_renewal_keeps_mrr_flat() {
        let signals = RevenueSignals::new();
        let subscription = Uuid::new_v4();
        signals.apply(&subscription_event(
            RevenueEventType::SubscriptionCreated,
            dec!(100),
            subscription,
            ts(1, 5),
        ));
        signals.apply(&subscription_event(
            RevenueEventType::SubscriptionRenewed,
            dec!(100),
            subscription,
            ts(2, 5),
        ));

        let live = signals.live();
        assert_eq!(live.mrr, dec!(100));
        assert_eq!(live.total_revenue, dec!(200));
    }

    #[test]
    fn test_refund_lowers_total_but_not_mrr() {
        let signals = RevenueSignals::new();
        signals.apply(&subscription_event(
            RevenueEventType::SubscriptionCreated,
            dec!(100),
            Uuid::new_v4(),
            ts(1, 5),
        ));
        let refund = RevenueEvent::new(
            Uuid::new_v4(),
            RevenueEventType::Refund,
            dec!(30),
            CurrencyCode::usd(),
            ts(1, 10),
            EventSource::Api,
        );
        signals.apply(&refund);

        let live = signals.live();
        assert_eq!(live.total_revenue, dec!(70));
        assert_eq!(live.mrr, dec!(100));
    }

    #[test]
    fn test_churn_uses_month_start_denominator() {
        let signals = RevenueSignals::new();
        let subscriptions: Vec<SubscriptionId> = (0..4).map(|_| Uuid::new_v4()).collect();
        for subscription in &subscriptions {
            signals.apply(&subscription_event(
                RevenueEventType::SubscriptionCreated,
                dec!(100),
                *subscription,
                ts(1, 5),
            ));
        }

        // First event of February snapshots 4 active subscriptions.
        signals.apply(&subscription_event(
            RevenueEventType::SubscriptionCancelled,
            dec!(100),
            subscriptions[0],
            ts(2, 3),
        ));

        let live = signals.live();
        assert_eq!(live.churn_rate, dec!(0.25));
        assert_eq!(live.mrr, dec!(300));
    }

    #[test]
    fn test_month_rollover_resets_churn_counters() {
        let signals = RevenueSignals::new();
        let subscriptions: Vec<SubscriptionId> = (0..2).map(|_| Uuid::new_v4()).collect();
        for subscription in &subscriptions {
            signals.apply(&subscription_event(
                RevenueEventType::SubscriptionCreated,
                dec!(100),
                *subscription,
                ts(1, 5),
            ));
        }
        signals.apply(&subscription_event(
            RevenueEventType::SubscriptionCancelled,
            dec!(100),
            subscriptions[0],
            ts(2, 3),
        ));
        assert_eq!(signals.live().churn_rate, dec!(0.5));

        // March starts with one active subscription and no cancellations.
        signals.apply(&subscription_event(
            RevenueEventType::SubscriptionRenewed,
            dec!(100),
            subscriptions[1],
            ts(3, 1),
        ));
        assert_eq!(signals.live().churn_rate, Decimal::ZERO);
    }

    #[test]
    fn test_downgrade_floors_mrr_at_zero() {
        let signals = RevenueSignals::new();
        signals.apply(&subscription_event(
            RevenueEventType::SubscriptionCreated,
            dec!(50),
            Uuid::new_v4(),
            ts(1, 5),
        ));
        signals.apply(&subscription_event(
            RevenueEventType::SubscriptionDowngraded,
            dec!(80),
            Uuid::new_v4(),
            ts(1, 6),
        ));
        assert_eq!(signals.live().mrr, Decimal::ZERO);
    }

    #[test]
    fn test_late_event_skips_churn_counters() {
        let signals = RevenueSignals::new();
        let early = Uuid::new_v4();
        let late = Uuid::new_v4();
        signals.apply(&subscription_event(
            RevenueEventType::SubscriptionCreated,
            dec!(100),
            early,
            ts(1, 5),
        ));
        signals.apply(&subscription_event(
            RevenueEventType::SubscriptionCreated,
            dec!(100),
            late,
            ts(2, 10),
        ));

        // A January cancellation arriving after February began.
        signals.apply(&subscription_event(
            RevenueEventType::SubscriptionCancelled,
            dec!(100),
            early,
            ts(1, 20),
        ));

        let live = signals.live();
        assert_eq!(live.churn_rate, Decimal::ZERO);
        assert_eq!(live.mrr, dec!(100));
    }

    #[tokio::test]
    async fn test_subscriber_observes_updates() {
        let signals = RevenueSignals::new();
        let mut mrr = signals.subscribe_mrr();
        assert_eq!(*mrr.borrow(), Decimal::ZERO);

        signals.apply(&subscription_event(
            RevenueEventType::SubscriptionCreated,
            dec!(75),
            Uuid::new_v4(),
            ts(1, 5),
        ));

        mrr.changed().await.unwrap();
        assert_eq!(*mrr.borrow(), dec!(75));
    }
}
