//! `stocktrail-stock` — the stock mutation domain.
//!
//! Three entities with real invariants:
//!
//! - [`StockLevel`]: current quantity per (product, location). At most one row
//!   per pair; quantity may legitimately go negative (backorder/oversell).
//! - [`StockAdjustment`]: an immutable, nonzero signed delta applied to one
//!   product at one location. Transfer-typed adjustments must reference the
//!   transfer that produced them.
//! - [`StockTransfer`]: a workflow moving a fixed quantity between two
//!   locations through an approval gate, with a strictly monotonic status
//!   state machine.
//!
//! All types here are pure data + deterministic transition logic. Locking,
//! atomic commit and the audit trail live in `stocktrail-store`.

pub mod adjustment;
pub mod level;
pub mod transfer;

pub use adjustment::{AdjustmentType, NewAdjustment, StockAdjustment};
pub use level::{NewStockLevel, StockLevel};
pub use transfer::{NewTransfer, StockTransfer, TransferStatus};
