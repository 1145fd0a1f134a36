//! Audit record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stocktrail_core::{AuditLogId, DomainError, DomainResult, UserId};

/// Kind of mutation an audit record documents.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
        }
    }
}

impl core::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One committed, immutable audit trail entry.
///
/// `actor` is optional: it survives deletion of the originating user, in which
/// case it is reset to `None` while every other field stays intact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: AuditLogId,
    pub actor: Option<UserId>,
    pub action: AuditAction,
    pub object_type: String,
    pub object_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Opaque structured snapshot of the affected entity (post-mutation, or
    /// pre-mutation for deletes). The recorder persists it without
    /// interpreting its contents.
    pub extra: Option<serde_json::Value>,
}

/// Uncommitted audit entry handed to the recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub actor: Option<UserId>,
    pub action: AuditAction,
    pub object_type: String,
    pub object_id: Uuid,
    pub extra: Option<serde_json::Value>,
}

impl NewAuditEntry {
    pub fn new(
        actor: Option<UserId>,
        action: AuditAction,
        object_type: impl Into<String>,
        object_id: Uuid,
        extra: Option<serde_json::Value>,
    ) -> Self {
        Self {
            actor,
            action,
            object_type: object_type.into(),
            object_id,
            extra,
        }
    }

    /// Action, object_type and object_id are mandatory; only the actor and
    /// snapshot are optional.
    pub fn validate(&self) -> DomainResult<()> {
        if self.object_type.trim().is_empty() {
            return Err(DomainError::validation("object_type", "must not be empty"));
        }
        Ok(())
    }
}
