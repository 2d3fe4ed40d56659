//! Revenue event model: the immutable facts the ledger records.

use chrono::{DateTime, Utc};
use fairway_common::{
    CurrencyCode, CustomerId, EventId, InvoiceId, LedgerPolicy, PlatformError, PlatformResult,
    SubscriptionId, TenantId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Direction in which an event moves net revenue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Adds to net revenue.
    Positive,
    /// Subtracts from net revenue.
    Negative,
    /// Recorded for lifecycle tracking only; no revenue movement.
    Neutral,
}

/// Closed set of revenue event types the ledger accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueEventType {
    SubscriptionCreated,
    SubscriptionRenewed,
    SubscriptionUpgraded,
    SubscriptionDowngraded,
    SubscriptionCancelled,
    OneTimePayment,
    SetupFee,
    AddOnPurchase,
    UsageCharge,
    Refund,
    Chargeback,
    Credit,
}

impl RevenueEventType {
    /// How this event type moves net revenue. Amounts are stored as
    /// non-negative magnitudes; the polarity supplies the sign.
    pub fn polarity(&self) -> Polarity {
        match self {
            Self::SubscriptionCreated
            | Self::SubscriptionRenewed
            | Self::SubscriptionUpgraded
            | Self::OneTimePayment
            | Self::SetupFee
            | Self::AddOnPurchase
            | Self::UsageCharge => Polarity::Positive,
            Self::Refund | Self::Chargeback | Self::Credit => Polarity::Negative,
            // A downgrade shrinks future recurring revenue but moves no money
            // now; a cancellation is pure lifecycle.
            Self::SubscriptionDowngraded | Self::SubscriptionCancelled => Polarity::Neutral,
        }
    }

    /// True for events that represent recurring subscription revenue.
    pub fn is_recurring(&self) -> bool {
        matches!(
            self,
            Self::SubscriptionCreated
                | Self::SubscriptionRenewed
                | Self::SubscriptionUpgraded
                | Self::SubscriptionDowngraded
        )
    }

    /// True for non-recurring charges collected once.
    pub fn is_one_time(&self) -> bool {
        matches!(
            self,
            Self::OneTimePayment | Self::SetupFee | Self::AddOnPurchase
        )
    }

    /// True for metered usage charges.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::UsageCharge)
    }

    /// True for money returned to the customer.
    pub fn is_reversal(&self) -> bool {
        matches!(self, Self::Refund | Self::Chargeback)
    }

    /// True for goodwill or promotional credits.
    pub fn is_credit(&self) -> bool {
        matches!(self, Self::Credit)
    }

    /// All event types, in a stable order. Useful for breakdown tables.
    pub fn all() -> [RevenueEventType; 12] {
        [
            Self::SubscriptionCreated,
            Self::SubscriptionRenewed,
            Self::SubscriptionUpgraded,
            Self::SubscriptionDowngraded,
            Self::SubscriptionCancelled,
            Self::OneTimePayment,
            Self::SetupFee,
            Self::AddOnPurchase,
            Self::UsageCharge,
            Self::Refund,
            Self::Chargeback,
            Self::Credit,
        ]
    }
}

impl std::fmt::Display for RevenueEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::SubscriptionCreated => "subscription_created",
            Self::SubscriptionRenewed => "subscription_renewed",
            Self::SubscriptionUpgraded => "subscription_upgraded",
            Self::SubscriptionDowngraded => "subscription_downgraded",
            Self::SubscriptionCancelled => "subscription_cancelled",
            Self::OneTimePayment => "one_time_payment",
            Self::SetupFee => "setup_fee",
            Self::AddOnPurchase => "add_on_purchase",
            Self::UsageCharge => "usage_charge",
            Self::Refund => "refund",
            Self::Chargeback => "chargeback",
            Self::Credit => "credit",
        };
        write!(f, "{}", label)
    }
}

/// Channel through which an event entered the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Web,
    MobileApp,
    Api,
    BillingProvider,
    Import,
}

impl EventSource {
    /// All sources, in a stable order.
    pub fn all() -> [EventSource; 5] {
        [
            Self::Web,
            Self::MobileApp,
            Self::Api,
            Self::BillingProvider,
            Self::Import,
        ]
    }
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Web => "web",
            Self::MobileApp => "mobile_app",
            Self::Api => "api",
            Self::BillingProvider => "billing_provider",
            Self::Import => "import",
        };
        write!(f, "{}", label)
    }
}

/// A single immutable revenue fact.
///
/// Amounts are non-negative magnitudes in the event's currency; the sign
/// applied during aggregation comes from [`RevenueEventType::polarity`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueEvent {
    pub id: EventId,
    pub tenant_id: TenantId,
    pub event_type: RevenueEventType,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub occurred_at: DateTime<Utc>,
    pub source: EventSource,
    pub customer_id: Option<CustomerId>,
    pub subscription_id: Option<SubscriptionId>,
    pub invoice_id: Option<InvoiceId>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl RevenueEvent {
    /// Creates an event with a fresh id and no linked records.
    pub fn new(
        tenant_id: TenantId,
        event_type: RevenueEventType,
        amount: Decimal,
        currency: CurrencyCode,
        occurred_at: DateTime<Utc>,
        source: EventSource,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            event_type,
            amount,
            currency,
            occurred_at,
            source,
            customer_id: None,
            subscription_id: None,
            invoice_id: None,
            metadata: HashMap::new(),
        }
    }

    /// Links the event to the customer it concerns.
    pub fn with_customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    /// Links the event to a subscription.
    pub fn with_subscription(mut self, subscription_id: SubscriptionId) -> Self {
        self.subscription_id = Some(subscription_id);
        self
    }

    /// Links the event to the invoice that billed it.
    pub fn with_invoice(mut self, invoice_id: InvoiceId) -> Self {
        self.invoice_id = Some(invoice_id);
        self
    }

    /// Attaches a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The amount with the event type's polarity applied.
    pub fn signed_amount(&self) -> Decimal {
        match self.event_type.polarity() {
            Polarity::Positive => self.amount,
            Polarity::Negative => -self.amount,
            Polarity::Neutral => Decimal::ZERO,
        }
    }

    /// Checks the event against ledger admission rules.
    ///
    /// Rejects negative amounts (the polarity encodes direction), and
    /// timestamps further in the future than the configured skew tolerance.
    pub fn validate(&self, policy: &LedgerPolicy, now: DateTime<Utc>) -> PlatformResult<()> {
        if self.amount < Decimal::ZERO {
            return Err(PlatformError::InvalidEvent(format!(
                "amount must be a non-negative magnitude, got {}",
                self.amount
            )));
        }
        let horizon = now + policy.clock_skew_tolerance();
        if self.occurred_at > horizon {
            return Err(PlatformError::InvalidEvent(format!(
                "occurred_at {} is beyond the accepted clock skew (now {})",
                self.occurred_at, now
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn sample(event_type: RevenueEventType, amount: Decimal) -> RevenueEvent {
        RevenueEvent::new(
            Uuid::new_v4(),
            event_type,
            amount,
            CurrencyCode::usd(),
            Utc::now(),
            EventSource::Api,
        )
    }

    #[test]
    fn test_polarity_covers_every_type() {
        for event_type in RevenueEventType::all() {
            // Every type maps to exactly one of the three directions.
            let _ = event_type.polarity();
        }
        assert_eq!(
            RevenueEventType::SubscriptionRenewed.polarity(),
            Polarity::Positive
        );
        assert_eq!(RevenueEventType::Chargeback.polarity(), Polarity::Negative);
        assert_eq!(
            RevenueEventType::SubscriptionCancelled.polarity(),
            Polarity::Neutral
        );
    }

    #[test]
    fn test_signed_amount_applies_polarity() {
        assert_eq!(
            sample(RevenueEventType::OneTimePayment, dec!(49.99)).signed_amount(),
            dec!(49.99)
        );
        assert_eq!(
            sample(RevenueEventType::Refund, dec!(20)).signed_amount(),
            dec!(-20)
        );
        assert_eq!(
            sample(RevenueEventType::SubscriptionCancelled, dec!(99)).signed_amount(),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_negative_amount_rejected() {
        let event = sample(RevenueEventType::Refund, dec!(-5));
        let err = event.validate(&LedgerPolicy::default(), Utc::now());
        assert!(matches!(err, Err(PlatformError::InvalidEvent(_))));
    }

    #[test]
    fn test_future_timestamp_within_skew_accepted() {
        let now = Utc::now();
        let mut event = sample(RevenueEventType::UsageCharge, dec!(3.50));
        event.occurred_at = now + Duration::seconds(120);
        assert!(event.validate(&LedgerPolicy::default(), now).is_ok());
    }

    #[test]
    fn test_far_future_timestamp_rejected() {
        let now = Utc::now();
        let mut event = sample(RevenueEventType::UsageCharge, dec!(3.50));
        event.occurred_at = now + Duration::hours(2);
        let err = event.validate(&LedgerPolicy::default(), now);
        assert!(matches!(err, Err(PlatformError::InvalidEvent(_))));
    }

    #[test]
    fn test_category_helpers_partition_types() {
        for event_type in RevenueEventType::all() {
            let buckets = [
                event_type.is_recurring(),
                event_type.is_one_time(),
                event_type.is_usage(),
                event_type.is_reversal(),
                event_type.is_credit(),
                event_type == RevenueEventType::SubscriptionCancelled,
            ];
            let hits = buckets.iter().filter(|hit| **hit).count();
            assert_eq!(hits, 1, "{} should land in one category", event_type);
        }
    }

    #[test]
    fn test_builder_helpers_attach_links() {
        let customer = Uuid::new_v4();
        let subscription = Uuid::new_v4();
        let event = sample(RevenueEventType::SubscriptionCreated, dec!(100))
            .with_customer(customer)
            .with_subscription(subscription)
            .with_metadata("plan", "pro");
        assert_eq!(event.customer_id, Some(customer));
        assert_eq!(event.subscription_id, Some(subscription));
        assert_eq!(event.metadata.get("plan").map(String::as_str), Some("pro"));
    }
}
