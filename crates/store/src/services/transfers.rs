//! Stock transfer workflow service.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use stocktrail_audit::{AuditAction, AuditRecorder, NewAuditEntry};
use stocktrail_auth::{ActorContext, Operation, ResourceKind, authorize};
use stocktrail_core::{DomainError, DomainResult, TransferId};
use stocktrail_stock::{
    AdjustmentType, NewAdjustment, NewTransfer, StockAdjustment, StockLevel, StockTransfer,
};

use crate::backend::{Backend, TransferCell};

use super::{acting_user, snapshot};

fn poisoned() -> DomainError {
    DomainError::fatal("transfer lock poisoned")
}

/// Transfers between locations.
///
/// Every transition stages a clone of the row under its lock, writes the audit
/// trail, and only then commits. Completion additionally takes both affected
/// level locks, in key order, so two completions touching the same pairs
/// cannot deadlock or interleave.
pub struct TransferService {
    backend: Arc<Backend>,
    audit: Arc<dyn AuditRecorder>,
}

impl TransferService {
    pub(crate) fn new(backend: Arc<Backend>, audit: Arc<dyn AuditRecorder>) -> Self {
        Self { backend, audit }
    }

    fn transfer_cell(&self, id: TransferId) -> DomainResult<TransferCell> {
        self.backend.transfers.cell(id).ok_or(DomainError::NotFound)
    }

    fn record_update(&self, ctx: &ActorContext, staged: &StockTransfer) -> DomainResult<()> {
        self.audit.record(NewAuditEntry::new(
            ctx.user_id(),
            AuditAction::Update,
            ResourceKind::StockTransfer.as_str(),
            *staged.id.as_uuid(),
            Some(snapshot(staged)?),
        ))?;
        Ok(())
    }

    /// Request a transfer. Status and attribution are forced server-side:
    /// every transfer starts pending, requested by the acting user.
    pub fn request(&self, ctx: &ActorContext, new: NewTransfer) -> DomainResult<StockTransfer> {
        authorize(ctx, Operation::Create, ResourceKind::StockTransfer)?;
        let actor = acting_user(ctx)?;
        new.validate()?;
        self.backend
            .products
            .get(&new.product_id)
            .ok_or(DomainError::NotFound)?;
        self.backend
            .locations
            .get(&new.from_location)
            .ok_or(DomainError::NotFound)?;
        self.backend
            .locations
            .get(&new.to_location)
            .ok_or(DomainError::NotFound)?;

        let _attribution = self.backend.attribution_shared();
        let transfer = StockTransfer::request(new, actor)?;
        self.audit.record(NewAuditEntry::new(
            ctx.user_id(),
            AuditAction::Create,
            ResourceKind::StockTransfer.as_str(),
            *transfer.id.as_uuid(),
            Some(snapshot(&transfer)?),
        ))?;
        self.backend.transfers.insert(transfer.clone());
        info!(transfer_id = %transfer.id, quantity = transfer.quantity, "transfer requested");
        Ok(transfer)
    }

    pub fn get(&self, ctx: &ActorContext, id: TransferId) -> DomainResult<StockTransfer> {
        authorize(ctx, Operation::Read, ResourceKind::StockTransfer)?;
        self.backend.transfers.get(id).ok_or(DomainError::NotFound)
    }

    pub fn list(&self, ctx: &ActorContext) -> DomainResult<Vec<StockTransfer>> {
        authorize(ctx, Operation::Read, ResourceKind::StockTransfer)?;
        Ok(self.backend.transfers.list())
    }

    /// pending → approved. No stock moves.
    pub fn approve(&self, ctx: &ActorContext, id: TransferId) -> DomainResult<StockTransfer> {
        authorize(ctx, Operation::Update, ResourceKind::StockTransfer)?;
        let approver = acting_user(ctx)?;

        let _attribution = self.backend.attribution_shared();
        let cell = self.transfer_cell(id)?;
        let mut guard = cell.lock().map_err(|_| poisoned())?;
        let mut staged = guard.clone();
        staged.approve(approver)?;
        self.record_update(ctx, &staged)?;
        *guard = staged.clone();
        info!(transfer_id = %id, approved_by = %approver, "transfer approved");
        Ok(staged)
    }

    /// pending | approved → canceled. No stock moves.
    pub fn cancel(&self, ctx: &ActorContext, id: TransferId) -> DomainResult<StockTransfer> {
        authorize(ctx, Operation::Update, ResourceKind::StockTransfer)?;
        acting_user(ctx)?;

        let cell = self.transfer_cell(id)?;
        let mut guard = cell.lock().map_err(|_| poisoned())?;
        let mut staged = guard.clone();
        staged.cancel()?;
        self.record_update(ctx, &staged)?;
        *guard = staged.clone();
        info!(transfer_id = %id, "transfer canceled");
        Ok(staged)
    }

    /// approved → completed, moving the stock: a transfer_out adjustment at
    /// the source and a transfer_in at the destination, both referencing the
    /// transfer, all in one unit of work.
    pub fn complete(&self, ctx: &ActorContext, id: TransferId) -> DomainResult<StockTransfer> {
        authorize(ctx, Operation::Update, ResourceKind::StockTransfer)?;
        let actor = acting_user(ctx)?;

        let _attribution = self.backend.attribution_shared();
        let cell = self.transfer_cell(id)?;
        let mut transfer_guard = cell.lock().map_err(|_| poisoned())?;
        let mut staged = transfer_guard.clone();
        staged.complete()?;

        let out = StockAdjustment::create(
            NewAdjustment {
                product_id: staged.product_id,
                location_id: staged.from_location,
                quantity: -staged.quantity,
                adjustment_type: AdjustmentType::TransferOut,
                reason: staged.reason.clone(),
                stock_transfer: Some(staged.id),
            },
            actor,
        )?;
        let incoming = StockAdjustment::create(
            NewAdjustment {
                product_id: staged.product_id,
                location_id: staged.to_location,
                quantity: staged.quantity,
                adjustment_type: AdjustmentType::TransferIn,
                reason: staged.reason.clone(),
                stock_transfer: Some(staged.id),
            },
            actor,
        )?;

        // Both level locks, always in key order. The two keys differ because
        // a transfer's locations differ.
        let key_out = (staged.product_id, staged.from_location);
        let key_in = (staged.product_id, staged.to_location);
        let cell_out = self.backend.ledger.cell(key_out.0, key_out.1);
        let cell_in = self.backend.ledger.cell(key_in.0, key_in.1);
        let (first, second, out_first) = if key_out < key_in {
            (&cell_out, &cell_in, true)
        } else {
            (&cell_in, &cell_out, false)
        };
        let mut first_guard = first
            .lock()
            .map_err(|_| DomainError::fatal("stock level lock poisoned"))?;
        let mut second_guard = second
            .lock()
            .map_err(|_| DomainError::fatal("stock level lock poisoned"))?;
        let (out_guard, in_guard) = if out_first {
            (&mut first_guard, &mut second_guard)
        } else {
            (&mut second_guard, &mut first_guard)
        };

        let mut out_level = out_guard
            .clone()
            .unwrap_or_else(|| StockLevel::empty(staged.product_id, staged.from_location));
        out_level.quantity -= staged.quantity;
        out_level.updated_at = Utc::now();
        let mut in_level = in_guard
            .clone()
            .unwrap_or_else(|| StockLevel::empty(staged.product_id, staged.to_location));
        in_level.quantity += staged.quantity;
        in_level.updated_at = Utc::now();

        // All-or-nothing audit write, then only infallible commits.
        self.audit.record_batch(vec![
            NewAuditEntry::new(
                ctx.user_id(),
                AuditAction::Create,
                ResourceKind::StockAdjustment.as_str(),
                *out.id.as_uuid(),
                Some(snapshot(&out)?),
            ),
            NewAuditEntry::new(
                ctx.user_id(),
                AuditAction::Create,
                ResourceKind::StockAdjustment.as_str(),
                *incoming.id.as_uuid(),
                Some(snapshot(&incoming)?),
            ),
            NewAuditEntry::new(
                ctx.user_id(),
                AuditAction::Update,
                ResourceKind::StockTransfer.as_str(),
                *staged.id.as_uuid(),
                Some(snapshot(&staged)?),
            ),
        ])?;

        **out_guard = Some(out_level);
        **in_guard = Some(in_level);
        self.backend.adjustments.append_all(&[out, incoming]);
        *transfer_guard = staged.clone();
        info!(
            transfer_id = %id,
            product_id = %staged.product_id,
            quantity = staged.quantity,
            "transfer completed"
        );
        Ok(staged)
    }

    /// Transfers with linked adjustments (i.e. completed ones) are protected.
    pub fn delete(&self, ctx: &ActorContext, id: TransferId) -> DomainResult<()> {
        authorize(ctx, Operation::Delete, ResourceKind::StockTransfer)?;
        let transfer = self.backend.transfers.get(id).ok_or(DomainError::NotFound)?;
        if self.backend.transfer_is_referenced(id) {
            return Err(DomainError::conflict(
                "transfer has linked adjustments and cannot be deleted",
            ));
        }
        self.audit.record(NewAuditEntry::new(
            ctx.user_id(),
            AuditAction::Delete,
            ResourceKind::StockTransfer.as_str(),
            *id.as_uuid(),
            Some(snapshot(&transfer)?),
        ))?;
        self.backend.transfers.remove(id);
        Ok(())
    }
}
