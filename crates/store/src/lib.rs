//! `stocktrail-store` — in-memory transactional backend and service surface.
//!
//! Every mutating service call runs the same unit of work:
//!
//! ```text
//! authorize → validate → stage → audit record → commit
//! ```
//!
//! The audit write happens *before* the staged state is committed, and every
//! commit after a successful audit write is infallible in-memory, so a failed
//! step anywhere leaves neither a stock delta nor an orphaned audit entry
//! behind. Per-(product, location) mutexes serialize concurrent deltas against
//! the same pair; distinct pairs do not contend.
//!
//! Intended for tests/dev and as the reference semantics for a SQL-backed
//! implementation (per-pair mutex ↔ `SELECT ... FOR UPDATE`).

pub mod audit_store;
pub mod backend;
pub mod ledger;
pub mod services;
pub mod table;

#[cfg(test)]
mod integration_tests;

pub use audit_store::InMemoryAuditStore;
pub use backend::Backend;
pub use ledger::{AdjustmentLog, StockLedger};
pub use services::{AppServices, AuditService, EntityService, StockService, TransferService};
pub use table::Table;
