//! Stock adjustment records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocktrail_core::{
    AdjustmentId, DomainError, DomainResult, FieldViolation, LocationId, ProductId, TransferId,
    UserId,
};

/// Why a quantity changed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    /// Goods received into stock.
    Receive,
    /// Goods removed from stock.
    Remove,
    /// Manual correction of a counting error.
    Correct,
    /// Result of a physical stock audit.
    Audit,
    /// Shrinkage, damage, theft.
    Loss,
    /// Inbound half of a transfer.
    TransferIn,
    /// Outbound half of a transfer.
    TransferOut,
}

impl AdjustmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentType::Receive => "receive",
            AdjustmentType::Remove => "remove",
            AdjustmentType::Correct => "correct",
            AdjustmentType::Audit => "audit",
            AdjustmentType::Loss => "loss",
            AdjustmentType::TransferIn => "transfer_in",
            AdjustmentType::TransferOut => "transfer_out",
        }
    }

    /// Transfer-typed adjustments must carry a transfer reference.
    pub fn is_transfer(&self) -> bool {
        matches!(self, AdjustmentType::TransferIn | AdjustmentType::TransferOut)
    }
}

impl core::fmt::Display for AdjustmentType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable signed quantity change, attributed to the actor who made it.
///
/// Adjustments are permanent history: there is no update or delete operation
/// for them anywhere in the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub id: AdjustmentId,
    pub product_id: ProductId,
    pub location_id: LocationId,
    /// Nonzero signed delta.
    pub quantity: i64,
    pub adjustment_type: AdjustmentType,
    pub reason: Option<String>,
    /// Mandatory for transfer_in / transfer_out, absent otherwise.
    pub stock_transfer: Option<TransferId>,
    pub adjusted_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// Payload for requesting an adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAdjustment {
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub quantity: i64,
    pub adjustment_type: AdjustmentType,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub stock_transfer: Option<TransferId>,
}

impl NewAdjustment {
    /// Validation order: quantity first, then the transfer reference rule.
    pub fn validate(&self) -> DomainResult<()> {
        let mut violations = Vec::new();
        if self.quantity == 0 {
            violations.push(FieldViolation::new("quantity", "adjustment cannot be 0"));
        }
        if self.adjustment_type.is_transfer() && self.stock_transfer.is_none() {
            violations.push(FieldViolation::new(
                "stock_transfer",
                "must be provided for transfer adjustments",
            ));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(violations))
        }
    }
}

impl StockAdjustment {
    /// Build the immutable record from a validated payload.
    pub fn create(new: NewAdjustment, adjusted_by: UserId) -> DomainResult<Self> {
        new.validate()?;
        Ok(Self {
            id: AdjustmentId::new(),
            product_id: new.product_id,
            location_id: new.location_id,
            quantity: new.quantity,
            adjustment_type: new.adjustment_type,
            reason: new.reason,
            stock_transfer: new.stock_transfer,
            adjusted_by,
            created_at: Utc::now(),
        })
    }
}
