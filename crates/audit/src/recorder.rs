//! Port for persisting append-only audit records.

use stocktrail_core::{DomainError, DomainResult, UserId};

use crate::record::{AuditLog, NewAuditEntry};

/// Append-only audit recorder.
///
/// Implementations persist entries synchronously, inside the unit of work of
/// the mutation being documented: callers invoke the recorder *before*
/// committing their own state, so a failed audit write aborts the whole
/// operation. There are no retries — dropping the trail silently is worse
/// than failing the mutation.
pub trait AuditRecorder: Send + Sync {
    /// Persist a batch of entries, all-or-nothing. An error leaves the trail
    /// untouched.
    fn record_batch(&self, entries: Vec<NewAuditEntry>) -> DomainResult<Vec<AuditLog>>;

    /// Persist one entry.
    fn record(&self, entry: NewAuditEntry) -> DomainResult<AuditLog> {
        let mut committed = self.record_batch(vec![entry])?;
        // An implementation returning fewer records than entries has dropped
        // part of the trail; surface that instead of panicking.
        committed
            .pop()
            .ok_or_else(|| DomainError::fatal("audit recorder returned a short batch"))
    }

    /// Null the actor on every record attributed to `user`, keeping all other
    /// fields intact. Invoked when a user is deleted; the trail itself
    /// survives. Returns the number of records detached.
    fn detach_actor(&self, user: UserId) -> DomainResult<usize>;
}
