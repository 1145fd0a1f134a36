//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! impl_uuid_newtype {
    ($(#[$meta:meta])* $t:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(Uuid);

        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::validation("id", format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(
    /// Identifier of a user (actor identity).
    UserId,
    "UserId"
);
impl_uuid_newtype!(
    /// Identifier of a product.
    ProductId,
    "ProductId"
);
impl_uuid_newtype!(
    /// Identifier of a supplier.
    SupplierId,
    "SupplierId"
);
impl_uuid_newtype!(
    /// Identifier of a product/supplier sourcing link.
    ProductSupplierId,
    "ProductSupplierId"
);
impl_uuid_newtype!(
    /// Identifier of a stock location (warehouse, store, ...).
    LocationId,
    "LocationId"
);
impl_uuid_newtype!(
    /// Identifier of a purchase order.
    OrderId,
    "OrderId"
);
impl_uuid_newtype!(
    /// Identifier of a stock level row.
    StockLevelId,
    "StockLevelId"
);
impl_uuid_newtype!(
    /// Identifier of a stock adjustment record.
    AdjustmentId,
    "AdjustmentId"
);
impl_uuid_newtype!(
    /// Identifier of a stock transfer.
    TransferId,
    "TransferId"
);
impl_uuid_newtype!(
    /// Identifier of an audit log entry.
    AuditLogId,
    "AuditLogId"
);
