//! Product/supplier sourcing link.
//!
//! An explicit join entity with its own identity and commercial fields
//! (supplier price, lead time, preference flag) rather than a bare
//! many-to-many association. Unique per (product, supplier), enforced by the
//! store layer.

use serde::{Deserialize, Serialize};

use stocktrail_core::{
    DomainError, DomainResult, FieldViolation, ProductId, ProductSupplierId, SupplierId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSupplier {
    pub id: ProductSupplierId,
    pub product_id: ProductId,
    pub supplier_id: SupplierId,
    /// The supplier's own article number for this product.
    pub supplier_sku: String,
    pub supplier_price_cents: i64,
    pub lead_time_days: i32,
    pub is_preferred: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProductSupplier {
    pub product_id: ProductId,
    pub supplier_id: SupplierId,
    pub supplier_sku: String,
    pub supplier_price_cents: i64,
    #[serde(default)]
    pub lead_time_days: i32,
    #[serde(default)]
    pub is_preferred: bool,
}

impl NewProductSupplier {
    pub fn validate(&self) -> DomainResult<()> {
        let mut violations = Vec::new();
        if self.supplier_price_cents < 0 {
            violations.push(FieldViolation::new(
                "supplier_price_cents",
                "must not be negative",
            ));
        }
        if self.lead_time_days < 0 {
            violations.push(FieldViolation::new("lead_time_days", "must not be negative"));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(violations))
        }
    }
}

impl ProductSupplier {
    pub fn create(new: NewProductSupplier) -> DomainResult<Self> {
        new.validate()?;
        Ok(Self {
            id: ProductSupplierId::new(),
            product_id: new.product_id,
            supplier_id: new.supplier_id,
            supplier_sku: new.supplier_sku,
            supplier_price_cents: new.supplier_price_cents,
            lead_time_days: new.lead_time_days,
            is_preferred: new.is_preferred,
        })
    }

    /// Commercial terms may change; the (product, supplier) pair is stable.
    pub fn apply_update(&mut self, new: NewProductSupplier) -> DomainResult<()> {
        new.validate()?;
        if new.product_id != self.product_id || new.supplier_id != self.supplier_id {
            return Err(DomainError::validation(
                "product_id",
                "sourcing link endpoints cannot be reassigned",
            ));
        }
        self.supplier_sku = new.supplier_sku;
        self.supplier_price_cents = new.supplier_price_cents;
        self.lead_time_days = new.lead_time_days;
        self.is_preferred = new.is_preferred;
        Ok(())
    }
}
