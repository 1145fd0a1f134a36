//! Minimal user record.
//!
//! Authentication lives in the surrounding shell; this record exists so the
//! store can enforce protective deletion (users with adjustment or transfer
//! history cannot be removed) and so audit records can be detached from
//! deleted users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocktrail_core::{DomainError, DomainResult, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
}

impl NewUser {
    pub fn validate(&self) -> DomainResult<()> {
        if self.username.trim().is_empty() {
            return Err(DomainError::validation("username", "must not be empty"));
        }
        Ok(())
    }
}

impl User {
    pub fn create(new: NewUser) -> DomainResult<Self> {
        new.validate()?;
        Ok(Self {
            id: UserId::new(),
            username: new.username,
            created_at: Utc::now(),
        })
    }
}
