//! Read-only access to the audit trail.

use std::sync::Arc;

use stocktrail_audit::{AuditLog, AuditQuery};
use stocktrail_auth::{ActorContext, Operation, ResourceKind, authorize};
use stocktrail_core::{AuditLogId, DomainError, DomainResult};

use crate::audit_store::InMemoryAuditStore;

/// Audit trail reads. The trail has no write surface here; records are only
/// produced as a side effect of the mutating services.
pub struct AuditService {
    store: Arc<InMemoryAuditStore>,
}

impl AuditService {
    pub(crate) fn new(store: Arc<InMemoryAuditStore>) -> Self {
        Self { store }
    }

    pub fn get(&self, ctx: &ActorContext, id: AuditLogId) -> DomainResult<AuditLog> {
        authorize(ctx, Operation::Read, ResourceKind::AuditLog)?;
        self.store.get(id).ok_or(DomainError::NotFound)
    }

    /// Matching records, newest first.
    pub fn list(&self, ctx: &ActorContext, query: &AuditQuery) -> DomainResult<Vec<AuditLog>> {
        authorize(ctx, Operation::Read, ResourceKind::AuditLog)?;
        Ok(self.store.list(query))
    }
}
