//! In-memory audit trail.

use std::sync::RwLock;

use chrono::Utc;

use stocktrail_audit::{AuditLog, AuditQuery, AuditRecorder, NewAuditEntry};
use stocktrail_core::{AuditLogId, DomainError, DomainResult, UserId};

/// Append-only in-memory audit store.
///
/// Intended for tests/dev. Records are never removed; `detach_actor` is the
/// single permitted in-place change (nulling the actor of a deleted user).
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    records: RwLock<Vec<AuditLog>>,
}

fn poisoned() -> DomainError {
    DomainError::fatal("audit store lock poisoned")
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: AuditLogId) -> Option<AuditLog> {
        let records = self.records.read().ok()?;
        records.iter().find(|r| r.id == id).cloned()
    }

    /// Matching records, newest first.
    pub fn list(&self, query: &AuditQuery) -> Vec<AuditLog> {
        match self.records.read() {
            Ok(records) => records
                .iter()
                .rev()
                .filter(|r| query.matches(r))
                .cloned()
                .collect(),
            Err(_) => vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditRecorder for InMemoryAuditStore {
    fn record_batch(&self, entries: Vec<NewAuditEntry>) -> DomainResult<Vec<AuditLog>> {
        // Validate everything before touching the trail: all-or-nothing.
        for entry in &entries {
            entry.validate()?;
        }
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let now = Utc::now();
        let committed: Vec<AuditLog> = entries
            .into_iter()
            .map(|e| AuditLog {
                id: AuditLogId::new(),
                actor: e.actor,
                action: e.action,
                object_type: e.object_type,
                object_id: e.object_id,
                timestamp: now,
                extra: e.extra,
            })
            .collect();
        records.extend(committed.iter().cloned());
        Ok(committed)
    }

    fn detach_actor(&self, user: UserId) -> DomainResult<usize> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let mut detached = 0;
        for record in records.iter_mut() {
            if record.actor == Some(user) {
                record.actor = None;
                detached += 1;
            }
        }
        Ok(detached)
    }
}
