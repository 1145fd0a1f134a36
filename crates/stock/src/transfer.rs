//! Stock transfer workflow.
//!
//! Status lifecycle:
//!
//! ```text
//! pending ──► approved ──► completed
//!    │            │
//!    └────────────┴──────► canceled
//! ```
//!
//! Completed and canceled are terminal. Transitions are strictly enforced
//! here: completing a transfer that was never approved, or touching a
//! terminal transfer, is a conflict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocktrail_core::{
    DomainError, DomainResult, FieldViolation, LocationId, ProductId, TransferId, UserId,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Approved,
    Completed,
    Canceled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Approved => "approved",
            TransferStatus::Completed => "completed",
            TransferStatus::Canceled => "canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Canceled)
    }
}

impl core::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested movement of one product between two locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTransfer {
    pub id: TransferId,
    pub product_id: ProductId,
    pub from_location: LocationId,
    pub to_location: LocationId,
    /// Always positive; the signs are applied by the paired adjustments.
    pub quantity: i64,
    pub status: TransferStatus,
    pub reason: Option<String>,
    pub requested_by: UserId,
    pub approved_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for requesting a transfer.
///
/// Deliberately has no status or requested_by field: the request operation
/// forces status to pending and attributes the transfer to the acting user,
/// so neither can be spoofed by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransfer {
    pub product_id: ProductId,
    pub from_location: LocationId,
    pub to_location: LocationId,
    pub quantity: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

impl NewTransfer {
    pub fn validate(&self) -> DomainResult<()> {
        let mut violations = Vec::new();
        if self.quantity <= 0 {
            violations.push(FieldViolation::new(
                "quantity",
                "must be greater than zero",
            ));
        }
        if self.from_location == self.to_location {
            violations.push(FieldViolation::new(
                "to_location",
                "source and destination locations must be different",
            ));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(violations))
        }
    }
}

impl StockTransfer {
    /// Request a transfer: status forced to pending, attribution forced to
    /// the acting user.
    pub fn request(new: NewTransfer, requested_by: UserId) -> DomainResult<Self> {
        new.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: TransferId::new(),
            product_id: new.product_id,
            from_location: new.from_location,
            to_location: new.to_location,
            quantity: new.quantity,
            status: TransferStatus::Pending,
            reason: new.reason,
            requested_by,
            approved_by: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn stale(&self, attempted: &str) -> DomainError {
        DomainError::conflict(format!(
            "cannot {attempted} a {} transfer",
            self.status.as_str()
        ))
    }

    /// pending → approved. Records the approver. No stock movement.
    pub fn approve(&mut self, approved_by: UserId) -> DomainResult<()> {
        if self.status != TransferStatus::Pending {
            return Err(self.stale("approve"));
        }
        self.status = TransferStatus::Approved;
        self.approved_by = Some(approved_by);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// approved → completed. The caller is responsible for applying the
    /// paired adjustments in the same unit of work.
    pub fn complete(&mut self) -> DomainResult<()> {
        if self.status != TransferStatus::Approved {
            return Err(self.stale("complete"));
        }
        self.status = TransferStatus::Completed;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// pending | approved → canceled. No stock movement.
    pub fn cancel(&mut self) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(self.stale("cancel"));
        }
        self.status = TransferStatus::Canceled;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn valid() -> NewTransfer {
        NewTransfer {
            product_id: ProductId::new(),
            from_location: LocationId::new(),
            to_location: LocationId::new(),
            quantity: 5,
            reason: None,
        }
    }

    fn requested() -> StockTransfer {
        StockTransfer::request(valid(), UserId::new()).unwrap()
    }

    #[test]
    fn request_forces_pending_and_attribution() {
        let requester = UserId::new();
        let transfer = StockTransfer::request(valid(), requester).unwrap();
        assert_eq!(transfer.status, TransferStatus::Pending);
        assert_eq!(transfer.requested_by, requester);
        assert!(transfer.approved_by.is_none());
    }

    #[test]
    fn same_location_transfer_is_rejected() {
        let mut new = valid();
        new.to_location = new.from_location;
        match new.validate().unwrap_err() {
            DomainError::Validation(v) => assert_eq!(v[0].field, "to_location"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        for q in [0, -4] {
            let new = NewTransfer {
                quantity: q,
                ..valid()
            };
            assert!(new.validate().unwrap_err().is_validation());
        }
    }

    #[test]
    fn approve_records_the_approver() {
        let mut transfer = requested();
        let approver = UserId::new();
        transfer.approve(approver).unwrap();
        assert_eq!(transfer.status, TransferStatus::Approved);
        assert_eq!(transfer.approved_by, Some(approver));
    }

    #[test]
    fn complete_requires_prior_approval() {
        let mut transfer = requested();
        let err = transfer.complete().unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(transfer.status, TransferStatus::Pending);
    }

    #[test]
    fn canceled_transfer_rejects_everything() {
        let mut transfer = requested();
        transfer.cancel().unwrap();
        assert!(transfer.approve(UserId::new()).unwrap_err().is_conflict());
        assert!(transfer.complete().unwrap_err().is_conflict());
        assert!(transfer.cancel().unwrap_err().is_conflict());
        assert_eq!(transfer.status, TransferStatus::Canceled);
    }

    #[test]
    fn completed_transfer_is_terminal() {
        let mut transfer = requested();
        transfer.approve(UserId::new()).unwrap();
        transfer.complete().unwrap();
        assert!(transfer.complete().unwrap_err().is_conflict());
        assert!(transfer.cancel().unwrap_err().is_conflict());
    }

    #[test]
    fn cancel_is_reachable_from_approved() {
        let mut transfer = requested();
        transfer.approve(UserId::new()).unwrap();
        transfer.cancel().unwrap();
        assert_eq!(transfer.status, TransferStatus::Canceled);
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Approve,
        Complete,
        Cancel,
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: no sequence of transition attempts can move a transfer
        /// out of a terminal state, and completed is only reachable through
        /// approved.
        #[test]
        fn transitions_are_monotonic(
            ops in prop::collection::vec(
                prop_oneof![Just(Op::Approve), Just(Op::Complete), Just(Op::Cancel)],
                0..12,
            )
        ) {
            let mut transfer = requested();
            let mut was_approved = false;

            for op in ops {
                let before = transfer.status;
                let result = match op {
                    Op::Approve => transfer.approve(UserId::new()),
                    Op::Complete => transfer.complete(),
                    Op::Cancel => transfer.cancel(),
                };

                if before.is_terminal() {
                    prop_assert!(result.is_err());
                    prop_assert_eq!(transfer.status, before);
                }
                if transfer.status == TransferStatus::Approved {
                    was_approved = true;
                }
                if transfer.status == TransferStatus::Completed {
                    prop_assert!(was_approved);
                }
            }
        }
    }
}
