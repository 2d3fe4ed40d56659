//! Append-only revenue ledger.
//!
//! Events are immutable facts partitioned by tenant and ordered by
//! `(occurred_at, id)`. The store rejects duplicates and future-dated
//! events beyond the configured skew; [`RevenueSignals`] folds accepted
//! events into live totals that downstream consumers can watch.

pub mod event;
pub mod signals;
pub mod store;

pub use event::{EventSource, Polarity, RevenueEvent, RevenueEventType};
pub use signals::{LiveRevenue, RevenueSignals};
pub use store::{full_history, history_until, EventStore, InMemoryEventStore};
