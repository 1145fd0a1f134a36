//! Stock level rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocktrail_core::{DomainError, DomainResult, LocationId, ProductId, StockLevelId};

/// Current quantity of one product at one location.
///
/// Owned exclusively by the stock ledger: rows are created on first use of a
/// (product, location) pair, mutated only through apply-delta, and deleted
/// only when their product or location is deleted.
///
/// Quantity is a signed integer and may go negative. That represents
/// backorder/oversell and is intentional; the ledger never clamps at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub id: StockLevelId,
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub quantity: i64,
    pub updated_at: DateTime<Utc>,
}

impl StockLevel {
    /// Fresh row for a pair that has never been adjusted.
    pub fn empty(product_id: ProductId, location_id: LocationId) -> Self {
        Self {
            id: StockLevelId::new(),
            product_id,
            location_id,
            quantity: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn with_quantity(product_id: ProductId, location_id: LocationId, quantity: i64) -> Self {
        Self {
            quantity,
            ..Self::empty(product_id, location_id)
        }
    }
}

/// Payload for the direct write path (create/update of a row by the shell).
///
/// Direct writes floor at zero; only adjustments may take a level negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStockLevel {
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub quantity: i64,
}

impl NewStockLevel {
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity < 0 {
            return Err(DomainError::validation("quantity", "cannot be negative"));
        }
        Ok(())
    }
}
