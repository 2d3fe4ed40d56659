//! Error types for the Fairway core

use crate::{EventId, TenantId};
use std::time::Duration;
use thiserror::Error;

/// Result type for Fairway operations
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Machine-distinguishable failure classification.
///
/// Every [`PlatformError`] maps to exactly one kind; callers branch on the
/// kind, humans read the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Rejected before any state change; never retried automatically
    Validation,
    /// The named resource does not exist
    NotFound,
    /// Caller lacks permission; must not reveal whether the resource exists
    Authorization,
    /// A derivation could not be computed (insufficient data, math failure)
    Computation,
    /// An external collaborator failed; original cause preserved, retry is
    /// the caller's decision
    Upstream,
}

/// Fairway platform error type
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Period granularity or bucket is unusable for the requested operation
    #[error("invalid period: {0}")]
    InvalidPeriod(String),

    /// Date range with start after end
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Requested range start
        start: chrono::DateTime<chrono::Utc>,
        /// Requested range end
        end: chrono::DateTime<chrono::Utc>,
    },

    /// Event failed basic validation (amount, currency, timestamp)
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// An event with this identity already exists in the ledger
    #[error("duplicate event: {0}")]
    DuplicateEvent(EventId),

    /// Disallowed state-machine transition
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Suspending a tenant without giving a reason
    #[error("suspension requires a reason")]
    SuspensionReasonRequired,

    /// Child limit would exceed the parent's remaining allocation
    #[error("hierarchy limit exceeded: {0}")]
    HierarchyLimitExceeded(String),

    /// Request shape is unusable before reaching any store
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Unknown tenant
    #[error("tenant not found: {0}")]
    TenantNotFound(TenantId),

    /// Unknown migration
    #[error("migration not found: {0}")]
    MigrationNotFound(uuid::Uuid),

    /// Caller is not allowed to perform the operation
    #[error("not authorized to {0}")]
    Unauthorized(String),

    /// Window holds no events and no baseline was requested
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Aggregation arithmetic could not produce a result
    #[error("calculation error: {0}")]
    CalculationError(String),

    /// Forecast could not be produced
    #[error("forecast failed: {0}")]
    ForecastFailed(String),

    /// Anomaly detection could not run over the window
    #[error("anomaly detection failed: {0}")]
    AnomalyDetectionFailed(String),

    /// External collaborator reported a failure
    #[error("upstream failure in {operation}")]
    Upstream {
        /// Operation that invoked the collaborator
        operation: String,
        /// Original cause, preserved for the caller
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// External collaborator exceeded its time budget
    #[error("{operation} timed out after {timeout:?}")]
    CollaboratorTimeout {
        /// Operation that invoked the collaborator
        operation: String,
        /// Configured bound that was exceeded
        timeout: Duration,
    },
}

impl PlatformError {
    /// Classify this error into the fixed taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPeriod(_)
            | Self::InvalidDateRange { .. }
            | Self::InvalidEvent(_)
            | Self::DuplicateEvent(_)
            | Self::InvalidTransition(_)
            | Self::SuspensionReasonRequired
            | Self::HierarchyLimitExceeded(_)
            | Self::MalformedRequest(_) => ErrorKind::Validation,
            Self::TenantNotFound(_) | Self::MigrationNotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized(_) => ErrorKind::Authorization,
            Self::InsufficientData(_)
            | Self::CalculationError(_)
            | Self::ForecastFailed(_)
            | Self::AnomalyDetectionFailed(_) => ErrorKind::Computation,
            Self::Upstream { .. } | Self::CollaboratorTimeout { .. } => ErrorKind::Upstream,
        }
    }

    /// Wrap a collaborator failure, keeping the original cause.
    pub fn upstream(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Upstream {
            operation: operation.into(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_kind_classification() {
        let err = PlatformError::InvalidDateRange {
            start: Utc::now(),
            end: Utc::now(),
        };
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert_eq!(
            PlatformError::TenantNotFound(uuid::Uuid::new_v4()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            PlatformError::InsufficientData("empty window".into()).kind(),
            ErrorKind::Computation
        );
        assert_eq!(
            PlatformError::Unauthorized("delete tenant".into()).kind(),
            ErrorKind::Authorization
        );
    }

    #[test]
    fn test_upstream_preserves_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset");
        let err = PlatformError::upstream("export_revenue_data", cause);

        assert_eq!(err.kind(), ErrorKind::Upstream);
        let source = std::error::Error::source(&err).expect("cause kept");
        assert!(source.to_string().contains("peer reset"));
    }

    #[test]
    fn test_messages_are_human_readable() {
        let err = PlatformError::SuspensionReasonRequired;
        assert_eq!(err.to_string(), "suspension requires a reason");
    }
}
