//! `stocktrail-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult, FieldViolation};
pub use id::{
    AdjustmentId, AuditLogId, LocationId, OrderId, ProductId, ProductSupplierId, StockLevelId,
    SupplierId, TransferId, UserId,
};
