//! Tenant migration tracking.
//!
//! Migrations move a tenant's data between plans, regions, or parents. The
//! core only tracks item-level progress; moving the bytes is the caller's
//! job. Outcomes always report succeeded/failed counts, never a collapsed
//! boolean.

use chrono::{DateTime, Utc};
use fairway_common::{PlatformError, PlatformResult, TenantId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Migration lifecycle state. All outcomes are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    Pending,
    InProgress,
    Completed,
    PartiallyCompleted,
    Failed,
    Cancelled,
}

impl MigrationStatus {
    pub fn is_terminal(self) -> bool {
        match self {
            Self::Pending | Self::InProgress => false,
            Self::Completed | Self::PartiallyCompleted | Self::Failed | Self::Cancelled => true,
        }
    }
}

impl std::fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::PartiallyCompleted => "partially_completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One tracked migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantMigration {
    pub id: Uuid,
    pub tenant_id: TenantId,
    /// What is being migrated, for humans
    pub description: String,
    pub status: MigrationStatus,
    /// Items the migration intends to move
    pub total_items: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TenantMigration {
    pub fn new(tenant_id: TenantId, description: &str, total_items: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            description: description.to_string(),
            status: MigrationStatus::Pending,
            total_items,
            succeeded: 0,
            failed: 0,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Begin executing. Only pending migrations can start.
    pub fn start(&mut self) -> PlatformResult<()> {
        if self.status != MigrationStatus::Pending {
            return Err(self.bad_transition("start"));
        }
        self.status = MigrationStatus::InProgress;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn record_success(&mut self) -> PlatformResult<()> {
        if self.status != MigrationStatus::InProgress {
            return Err(self.bad_transition("record item"));
        }
        self.succeeded += 1;
        Ok(())
    }

    pub fn record_failure(&mut self) -> PlatformResult<()> {
        if self.status != MigrationStatus::InProgress {
            return Err(self.bad_transition("record item"));
        }
        self.failed += 1;
        Ok(())
    }

    /// Close out an in-progress migration. The terminal state follows the
    /// counters: no failures completes, failures plus successes is partial,
    /// failures alone is failed.
    pub fn finish(&mut self) -> PlatformResult<()> {
        if self.status != MigrationStatus::InProgress {
            return Err(self.bad_transition("finish"));
        }
        self.status = if self.failed == 0 {
            MigrationStatus::Completed
        } else if self.succeeded >= 1 {
            MigrationStatus::PartiallyCompleted
        } else {
            MigrationStatus::Failed
        };
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Abandon a migration that has not reached a terminal state.
    pub fn cancel(&mut self) -> PlatformResult<()> {
        if self.status.is_terminal() {
            return Err(self.bad_transition("cancel"));
        }
        self.status = MigrationStatus::Cancelled;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    fn bad_transition(&self, action: &str) -> PlatformError {
        PlatformError::InvalidTransition(format!(
            "cannot {action} migration {} in state {}",
            self.id, self.status
        ))
    }
}

/// Registry of migrations across tenants.
pub struct MigrationTracker {
    migrations: RwLock<HashMap<Uuid, TenantMigration>>,
}

impl MigrationTracker {
    pub fn new() -> Self {
        Self {
            migrations: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new pending migration.
    pub fn begin(
        &self,
        tenant_id: TenantId,
        description: &str,
        total_items: u64,
    ) -> TenantMigration {
        let migration = TenantMigration::new(tenant_id, description, total_items);
        self.migrations
            .write()
            .insert(migration.id, migration.clone());
        migration
    }

    pub fn get(&self, id: &Uuid) -> PlatformResult<TenantMigration> {
        self.migrations
            .read()
            .get(id)
            .cloned()
            .ok_or(PlatformError::MigrationNotFound(*id))
    }

    pub fn for_tenant(&self, tenant_id: &TenantId) -> Vec<TenantMigration> {
        self.migrations
            .read()
            .values()
            .filter(|migration| migration.tenant_id == *tenant_id)
            .cloned()
            .collect()
    }

    pub fn start(&self, id: &Uuid) -> PlatformResult<TenantMigration> {
        self.mutate(id, TenantMigration::start)
    }

    pub fn record_success(&self, id: &Uuid) -> PlatformResult<TenantMigration> {
        self.mutate(id, TenantMigration::record_success)
    }

    pub fn record_failure(&self, id: &Uuid) -> PlatformResult<TenantMigration> {
        self.mutate(id, TenantMigration::record_failure)
    }

    pub fn finish(&self, id: &Uuid) -> PlatformResult<TenantMigration> {
        self.mutate(id, TenantMigration::finish)
    }

    pub fn cancel(&self, id: &Uuid) -> PlatformResult<TenantMigration> {
        self.mutate(id, TenantMigration::cancel)
    }

    fn mutate(
        &self,
        id: &Uuid,
        apply: impl FnOnce(&mut TenantMigration) -> PlatformResult<()>,
    ) -> PlatformResult<TenantMigration> {
        let mut migrations = self.migrations.write();
        let migration = migrations
            .get_mut(id)
            .ok_or(PlatformError::MigrationNotFound(*id))?;
        apply(migration)?;
        Ok(migration.clone())
    }
}

impl Default for MigrationTracker {
    fn default() -> Self {
        Self::new()
    }
}
