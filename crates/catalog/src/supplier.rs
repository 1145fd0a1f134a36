//! Supplier entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocktrail_core::{DomainError, DomainResult, FieldViolation, SupplierId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub rating: i32,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    pub contact_name: String,
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: String,
    pub address: String,
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub rating: i32,
    #[serde(default)]
    pub notes: String,
}

impl NewSupplier {
    pub fn validate(&self) -> DomainResult<()> {
        let mut violations = Vec::new();
        if self.name.trim().is_empty() {
            violations.push(FieldViolation::new("name", "must not be empty"));
        }
        if !self.contact_email.contains('@') {
            violations.push(FieldViolation::new(
                "contact_email",
                "must be a valid email address",
            ));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(violations))
        }
    }
}

impl Supplier {
    pub fn create(new: NewSupplier) -> DomainResult<Self> {
        new.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: SupplierId::new(),
            name: new.name,
            contact_name: new.contact_name,
            contact_email: new.contact_email,
            contact_phone: new.contact_phone,
            address: new.address,
            city: new.city,
            country: new.country,
            rating: new.rating,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_update(&mut self, new: NewSupplier) -> DomainResult<()> {
        new.validate()?;
        self.name = new.name;
        self.contact_name = new.contact_name;
        self.contact_email = new.contact_email;
        self.contact_phone = new.contact_phone;
        self.address = new.address;
        self.city = new.city;
        self.country = new.country;
        self.rating = new.rating;
        self.notes = new.notes;
        self.updated_at = Utc::now();
        Ok(())
    }
}
