//! Append-only audit trail of command operations.

use chrono::{DateTime, Utc};
use fairway_common::{PlatformResult, TenantId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How an audited command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Succeeded,
    Failed,
}

impl AuditOutcome {
    /// Outcome of a platform result, ignoring the payload.
    pub fn of<T>(result: &PlatformResult<T>) -> Self {
        match result {
            Ok(_) => Self::Succeeded,
            Err(_) => Self::Failed,
        }
    }
}

/// One audited command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    /// Operation name, e.g. `suspend_tenant`
    pub operation: String,
    pub tenant_id: Option<TenantId>,
    pub outcome: AuditOutcome,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only sink for command records. Disabled trails drop everything.
pub struct AuditTrail {
    enabled: bool,
    records: RwLock<Vec<AuditRecord>>,
}

impl AuditTrail {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Append one record. No-op when the trail is disabled.
    pub fn record(&self, operation: &str, tenant_id: Option<TenantId>, outcome: AuditOutcome) {
        if !self.enabled {
            return;
        }
        self.records.write().push(AuditRecord {
            id: Uuid::new_v4(),
            operation: operation.to_string(),
            tenant_id,
            outcome,
            recorded_at: Utc::now(),
        });
    }

    /// Snapshot of all records, oldest first.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairway_common::PlatformError;

    #[test]
    fn test_enabled_trail_appends_in_order() {
        let trail = AuditTrail::new(true);
        let tenant = TenantId::new_v4();

        trail.record("create_tenant", Some(tenant), AuditOutcome::Succeeded);
        trail.record("suspend_tenant", Some(tenant), AuditOutcome::Failed);

        let records = trail.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].operation, "create_tenant");
        assert_eq!(records[1].outcome, AuditOutcome::Failed);
    }

    #[test]
    fn test_disabled_trail_is_a_noop() {
        let trail = AuditTrail::new(false);
        trail.record("create_tenant", None, AuditOutcome::Succeeded);

        assert!(trail.is_empty());
        assert!(!trail.is_enabled());
    }

    #[test]
    fn test_outcome_of_result() {
        let ok: PlatformResult<u32> = Ok(7);
        let err: PlatformResult<u32> = Err(PlatformError::MalformedRequest("x".into()));

        assert_eq!(AuditOutcome::of(&ok), AuditOutcome::Succeeded);
        assert_eq!(AuditOutcome::of(&err), AuditOutcome::Failed);
    }
}
