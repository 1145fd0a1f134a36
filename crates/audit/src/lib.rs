//! `stocktrail-audit` — the immutable audit trail contract.
//!
//! Every mutating operation in the system appends one record here, explicitly
//! and synchronously, within the same unit of work as the mutation it
//! documents. There is no hidden signal/observer wiring: components call the
//! recorder port directly, which keeps the dependency visible and testable in
//! isolation.

pub mod query;
pub mod record;
pub mod recorder;

pub use query::AuditQuery;
pub use record::{AuditAction, AuditLog, NewAuditEntry};
pub use recorder::AuditRecorder;
