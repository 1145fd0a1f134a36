//! Role-gated, audited service surface exposed to the CRUD/HTTP shell.
//!
//! Each mutating method is one unit of work: authorize → validate → stage →
//! audit record → infallible commit. Errors at any step leave both the domain
//! state and the audit trail untouched.

mod audit;
mod entities;
mod stock;
mod transfers;

use std::sync::Arc;

use stocktrail_audit::AuditRecorder;
use stocktrail_auth::ActorContext;
use stocktrail_core::{DomainError, DomainResult, UserId};

use crate::audit_store::InMemoryAuditStore;
use crate::backend::Backend;

pub use audit::AuditService;
pub use entities::EntityService;
pub use stock::StockService;
pub use transfers::TransferService;

/// The assembled application services over one shared backend.
pub struct AppServices {
    pub entities: EntityService,
    pub stock: StockService,
    pub transfers: TransferService,
    pub audit: AuditService,
    backend: Arc<Backend>,
}

impl AppServices {
    /// Fully in-memory assembly: the audit store doubles as the recorder.
    pub fn in_memory() -> Self {
        let audit_store = Arc::new(InMemoryAuditStore::new());
        Self::assemble(Arc::clone(&audit_store) as Arc<dyn AuditRecorder>, audit_store)
    }

    /// Assembly with a custom recorder for the mutation path (reads still go
    /// to the given store). Used to exercise audit-failure atomicity.
    pub fn with_recorder(
        recorder: Arc<dyn AuditRecorder>,
        audit_store: Arc<InMemoryAuditStore>,
    ) -> Self {
        Self::assemble(recorder, audit_store)
    }

    fn assemble(recorder: Arc<dyn AuditRecorder>, audit_store: Arc<InMemoryAuditStore>) -> Self {
        let backend = Arc::new(Backend::new());
        Self {
            entities: EntityService::new(Arc::clone(&backend), Arc::clone(&recorder)),
            stock: StockService::new(Arc::clone(&backend), Arc::clone(&recorder)),
            transfers: TransferService::new(Arc::clone(&backend), recorder),
            audit: AuditService::new(audit_store),
            backend,
        }
    }

    pub fn backend(&self) -> &Arc<Backend> {
        &self.backend
    }
}

/// The acting user's id. Callers authorize first, so an anonymous context has
/// already been rejected; this is the belt-and-suspenders check.
pub(crate) fn acting_user(ctx: &ActorContext) -> DomainResult<UserId> {
    ctx.user_id().ok_or(DomainError::Forbidden)
}

/// Audit snapshot payload: `{"data": <detail representation>}`.
pub(crate) fn snapshot<T: serde::Serialize>(value: &T) -> DomainResult<serde_json::Value> {
    let data = serde_json::to_value(value)
        .map_err(|e| DomainError::fatal(format!("snapshot serialization failed: {e}")))?;
    Ok(serde_json::json!({ "data": data }))
}
