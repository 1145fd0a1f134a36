//! Product entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocktrail_core::{DomainResult, FieldViolation, ProductId};

/// A sellable/stockable product.
///
/// `sku` is unique across the catalog (enforced by the store layer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub description: String,
    pub category: String,
    /// Unit price in cents.
    pub price_cents: i64,
    /// Reorder threshold; purely informational for the stock core.
    pub minimum_stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating or fully updating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub price_cents: i64,
    #[serde(default)]
    pub minimum_stock: i64,
}

impl NewProduct {
    pub fn validate(&self) -> DomainResult<()> {
        let mut violations = Vec::new();
        if self.name.trim().is_empty() {
            violations.push(FieldViolation::new("name", "must not be empty"));
        }
        if self.sku.trim().is_empty() {
            violations.push(FieldViolation::new("sku", "must not be empty"));
        }
        if self.price_cents < 0 {
            violations.push(FieldViolation::new("price_cents", "must not be negative"));
        }
        if self.minimum_stock < 0 {
            violations.push(FieldViolation::new("minimum_stock", "must not be negative"));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(stocktrail_core::DomainError::Validation(violations))
        }
    }
}

impl Product {
    pub fn create(new: NewProduct) -> DomainResult<Self> {
        new.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: ProductId::new(),
            name: new.name,
            sku: new.sku,
            description: new.description,
            category: new.category,
            price_cents: new.price_cents,
            minimum_stock: new.minimum_stock,
            created_at: now,
            updated_at: now,
        })
    }

    /// Full-payload update; the id and creation timestamp are stable.
    pub fn apply_update(&mut self, new: NewProduct) -> DomainResult<()> {
        new.validate()?;
        self.name = new.name;
        self.sku = new.sku;
        self.description = new.description;
        self.category = new.category;
        self.price_cents = new.price_cents;
        self.minimum_stock = new.minimum_stock;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> NewProduct {
        NewProduct {
            name: "Widget".to_string(),
            sku: "WIDG-001".to_string(),
            description: String::new(),
            category: "widgets".to_string(),
            price_cents: 9_99,
            minimum_stock: 10,
        }
    }

    #[test]
    fn create_product_stamps_id_and_timestamps() {
        let product = Product::create(valid()).unwrap();
        assert_eq!(product.sku, "WIDG-001");
        assert_eq!(product.created_at, product.updated_at);
    }

    #[test]
    fn negative_price_is_rejected_per_field() {
        let new = NewProduct {
            price_cents: -1,
            ..valid()
        };
        let err = new.validate().unwrap_err();
        match err {
            stocktrail_core::DomainError::Validation(v) => {
                assert_eq!(v.len(), 1);
                assert_eq!(v[0].field, "price_cents");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn all_violations_are_reported_together() {
        let new = NewProduct {
            name: "  ".to_string(),
            sku: String::new(),
            price_cents: -5,
            ..valid()
        };
        match new.validate().unwrap_err() {
            stocktrail_core::DomainError::Validation(v) => assert_eq!(v.len(), 3),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
