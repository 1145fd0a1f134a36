//! Stock location entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocktrail_core::{DomainError, DomainResult, FieldViolation, LocationId};

/// A physical place stock can sit: warehouse, store, staging area.
///
/// `code` is the short unique handle used in transfer displays and searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub code: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
}

impl NewLocation {
    pub fn validate(&self) -> DomainResult<()> {
        let mut violations = Vec::new();
        if self.name.trim().is_empty() {
            violations.push(FieldViolation::new("name", "must not be empty"));
        }
        if self.code.trim().is_empty() {
            violations.push(FieldViolation::new("code", "must not be empty"));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(violations))
        }
    }
}

impl Location {
    pub fn create(new: NewLocation) -> DomainResult<Self> {
        new.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: LocationId::new(),
            name: new.name,
            code: new.code,
            address: new.address,
            city: new.city,
            country: new.country,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_update(&mut self, new: NewLocation) -> DomainResult<()> {
        new.validate()?;
        self.name = new.name;
        self.code = new.code;
        self.address = new.address;
        self.city = new.city;
        self.country = new.country;
        self.updated_at = Utc::now();
        Ok(())
    }
}
