//! Purchase order entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocktrail_core::{DomainError, DomainResult, FieldViolation, OrderId, ProductId, SupplierId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Canceled,
}

/// One product line on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Purchase order against a supplier.
///
/// `order_number` is unique (store-enforced). Order lines protect their
/// products from deletion while the order exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub supplier_id: SupplierId,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_number: String,
    pub supplier_id: SupplierId,
    #[serde(default)]
    pub lines: Vec<OrderLine>,
}

impl NewOrder {
    pub fn validate(&self) -> DomainResult<()> {
        let mut violations = Vec::new();
        if self.order_number.trim().is_empty() {
            violations.push(FieldViolation::new("order_number", "must not be empty"));
        }
        for (idx, line) in self.lines.iter().enumerate() {
            if line.quantity <= 0 {
                violations.push(FieldViolation::new(
                    format!("lines[{idx}].quantity"),
                    "must be greater than zero",
                ));
            }
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(violations))
        }
    }
}

impl Order {
    pub fn create(new: NewOrder) -> DomainResult<Self> {
        new.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: OrderId::new(),
            order_number: new.order_number,
            supplier_id: new.supplier_id,
            status: OrderStatus::Pending,
            lines: new.lines,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_update(&mut self, new: NewOrder) -> DomainResult<()> {
        new.validate()?;
        self.order_number = new.order_number;
        self.supplier_id = new.supplier_id;
        self.lines = new.lines;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn references_product(&self, product_id: ProductId) -> bool {
        self.lines.iter().any(|l| l.product_id == product_id)
    }
}
