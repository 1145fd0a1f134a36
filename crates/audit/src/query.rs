//! Read-side filtering over the audit trail.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use stocktrail_core::UserId;

use crate::record::{AuditAction, AuditLog};

/// Filter for listing audit records. All fields are conjunctive; `None` means
/// "don't filter on this axis". Results are always ordered newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQuery {
    pub actor: Option<UserId>,
    pub action: Option<AuditAction>,
    pub object_type: Option<String>,
    pub object_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl AuditQuery {
    pub fn matches(&self, record: &AuditLog) -> bool {
        if let Some(actor) = self.actor {
            if record.actor != Some(actor) {
                return false;
            }
        }
        if let Some(action) = self.action {
            if record.action != action {
                return false;
            }
        }
        if let Some(object_type) = &self.object_type {
            if &record.object_type != object_type {
                return false;
            }
        }
        if let Some(object_id) = self.object_id {
            if record.object_id != object_id {
                return false;
            }
        }
        if let Some(from) = self.from {
            if record.timestamp < from {
                return false;
            }
        }
        if let Some(until) = self.until {
            if record.timestamp > until {
                return false;
            }
        }
        true
    }
}
