//! Cross-tenant batch execution.
//!
//! One tenant's failure never aborts its siblings; cancellation is
//! cooperative and honored between tenants, never mid-computation.

use chrono::{DateTime, Utc};
use fairway_common::{RevenuePeriod, TenantId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Work to perform for each tenant in a batch.
#[derive(Debug, Clone)]
pub enum BatchJob {
    /// Project future net revenue
    Forecast {
        months_ahead: u32,
        as_of: DateTime<Utc>,
    },
    /// Scan the trailing window for anomalies
    AnomalyScan { as_of: DateTime<Utc> },
    /// Assemble a full revenue report
    Report {
        period: RevenuePeriod,
        as_of: DateTime<Utc>,
    },
}

impl BatchJob {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Forecast { .. } => "forecast",
            Self::AnomalyScan { .. } => "anomaly_scan",
            Self::Report { .. } => "report",
        }
    }
}

/// Cooperative cancellation flag shared with a running batch.
#[derive(Clone, Default)]
pub struct BatchHandle {
    cancelled: Arc<AtomicBool>,
}

impl BatchHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the batch stop before its next tenant.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Pass/fail for one tenant inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Passed,
    Failed(String),
}

/// Result row for one tenant.
#[derive(Debug, Clone)]
pub struct TenantRun {
    pub tenant_id: TenantId,
    pub outcome: RunOutcome,
}

/// Collected results of a batch, with explicit counts rather than a
/// collapsed boolean.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub job: &'static str,
    pub results: Vec<TenantRun>,
    pub succeeded: u64,
    pub failed: u64,
    /// Tenants never attempted because the batch was cancelled first
    pub skipped: u64,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchOutcome {
    pub(crate) fn collect(
        job: &BatchJob,
        started_at: DateTime<Utc>,
        results: Vec<TenantRun>,
        skipped: u64,
        cancelled: bool,
    ) -> Self {
        let succeeded = results
            .iter()
            .filter(|run| run.outcome == RunOutcome::Passed)
            .count() as u64;
        let failed = results.len() as u64 - succeeded;
        Self {
            job: job.name(),
            results,
            succeeded,
            failed,
            skipped,
            cancelled,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn outcome_for(&self, tenant_id: &TenantId) -> Option<&RunOutcome> {
        self.results
            .iter()
            .find(|run| run.tenant_id == *tenant_id)
            .map(|run| &run.outcome)
    }
}
