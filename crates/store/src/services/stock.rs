//! Stock levels and adjustments.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use stocktrail_audit::{AuditAction, AuditRecorder, NewAuditEntry};
use stocktrail_auth::{ActorContext, Operation, ResourceKind, authorize};
use stocktrail_core::{AdjustmentId, DomainError, DomainResult, LocationId, ProductId};
use stocktrail_stock::{NewAdjustment, NewStockLevel, StockAdjustment, StockLevel};

use crate::backend::Backend;

use super::{acting_user, snapshot};

/// Stock level rows and the adjustment history.
///
/// Level mutations hold the pair's lock across stage, audit and commit, so a
/// failed audit write leaves the level untouched and a committed level always
/// has a matching audit record.
pub struct StockService {
    backend: Arc<Backend>,
    audit: Arc<dyn AuditRecorder>,
}

impl StockService {
    pub(crate) fn new(backend: Arc<Backend>, audit: Arc<dyn AuditRecorder>) -> Self {
        Self { backend, audit }
    }

    fn require_product(&self, id: ProductId) -> DomainResult<()> {
        self.backend
            .products
            .get(&id)
            .map(|_| ())
            .ok_or(DomainError::NotFound)
    }

    fn require_location(&self, id: LocationId) -> DomainResult<()> {
        self.backend
            .locations
            .get(&id)
            .map(|_| ())
            .ok_or(DomainError::NotFound)
    }

    // ── Stock levels ─────────────────────────────────────────────────────

    /// Direct creation of a level row. One row per (product, location); the
    /// quantity floor here is zero, unlike the adjustment path.
    pub fn create_level(&self, ctx: &ActorContext, new: NewStockLevel) -> DomainResult<StockLevel> {
        authorize(ctx, Operation::Create, ResourceKind::StockLevel)?;
        new.validate()?;
        self.require_product(new.product_id)?;
        self.require_location(new.location_id)?;

        let cell = self.backend.ledger.cell(new.product_id, new.location_id);
        let mut guard = cell
            .lock()
            .map_err(|_| DomainError::fatal("stock level lock poisoned"))?;
        if guard.is_some() {
            return Err(DomainError::validation(
                "product_id",
                "stock level for this product at this location already exists",
            ));
        }
        let level = StockLevel::with_quantity(new.product_id, new.location_id, new.quantity);
        self.audit.record(NewAuditEntry::new(
            ctx.user_id(),
            AuditAction::Create,
            ResourceKind::StockLevel.as_str(),
            *level.id.as_uuid(),
            Some(snapshot(&level)?),
        ))?;
        *guard = Some(level.clone());
        Ok(level)
    }

    pub fn get_level(
        &self,
        ctx: &ActorContext,
        product_id: ProductId,
        location_id: LocationId,
    ) -> DomainResult<StockLevel> {
        authorize(ctx, Operation::Read, ResourceKind::StockLevel)?;
        self.backend
            .ledger
            .get(product_id, location_id)
            .ok_or(DomainError::NotFound)
    }

    pub fn list_levels(&self, ctx: &ActorContext) -> DomainResult<Vec<StockLevel>> {
        authorize(ctx, Operation::Read, ResourceKind::StockLevel)?;
        Ok(self.backend.ledger.list())
    }

    /// Direct overwrite of a level's quantity. Floors at zero; corrections
    /// below zero go through adjustments instead.
    pub fn update_level(
        &self,
        ctx: &ActorContext,
        product_id: ProductId,
        location_id: LocationId,
        quantity: i64,
    ) -> DomainResult<StockLevel> {
        authorize(ctx, Operation::Update, ResourceKind::StockLevel)?;
        NewStockLevel {
            product_id,
            location_id,
            quantity,
        }
        .validate()?;

        let cell = self.backend.ledger.cell(product_id, location_id);
        let mut guard = cell
            .lock()
            .map_err(|_| DomainError::fatal("stock level lock poisoned"))?;
        let mut level = guard.clone().ok_or(DomainError::NotFound)?;
        level.quantity = quantity;
        level.updated_at = Utc::now();
        self.audit.record(NewAuditEntry::new(
            ctx.user_id(),
            AuditAction::Update,
            ResourceKind::StockLevel.as_str(),
            *level.id.as_uuid(),
            Some(snapshot(&level)?),
        ))?;
        *guard = Some(level.clone());
        Ok(level)
    }

    /// Holds the pair's lock across snapshot, audit and removal, so an
    /// adjustment racing the delete serializes: it either lands before the
    /// snapshot or re-creates the row afterwards. An adjustment's effect is
    /// never silently discarded between the audited snapshot and the removal.
    pub fn delete_level(
        &self,
        ctx: &ActorContext,
        product_id: ProductId,
        location_id: LocationId,
    ) -> DomainResult<()> {
        authorize(ctx, Operation::Delete, ResourceKind::StockLevel)?;
        let cell = self.backend.ledger.cell(product_id, location_id);
        let mut guard = cell
            .lock()
            .map_err(|_| DomainError::fatal("stock level lock poisoned"))?;
        let level = guard.clone().ok_or(DomainError::NotFound)?;
        self.audit.record(NewAuditEntry::new(
            ctx.user_id(),
            AuditAction::Delete,
            ResourceKind::StockLevel.as_str(),
            *level.id.as_uuid(),
            Some(snapshot(&level)?),
        ))?;
        *guard = None;
        info!(product_id = %product_id, location_id = %location_id, "stock level deleted");
        Ok(())
    }

    // ── Adjustments ──────────────────────────────────────────────────────

    /// Record an adjustment and move the level by its signed quantity, as one
    /// unit of work. This path has no floor: the level may go negative.
    pub fn apply_adjustment(
        &self,
        ctx: &ActorContext,
        new: NewAdjustment,
    ) -> DomainResult<StockAdjustment> {
        authorize(ctx, Operation::Create, ResourceKind::StockAdjustment)?;
        let actor = acting_user(ctx)?;
        new.validate()?;
        self.require_product(new.product_id)?;
        self.require_location(new.location_id)?;
        if let Some(transfer_id) = new.stock_transfer {
            if self.backend.transfers.get(transfer_id).is_none() {
                return Err(DomainError::NotFound);
            }
        }

        let _attribution = self.backend.attribution_shared();
        let cell = self.backend.ledger.cell(new.product_id, new.location_id);
        let mut guard = cell
            .lock()
            .map_err(|_| DomainError::fatal("stock level lock poisoned"))?;
        let adjustment = StockAdjustment::create(new, actor)?;
        let mut level = guard
            .clone()
            .unwrap_or_else(|| StockLevel::empty(adjustment.product_id, adjustment.location_id));
        level.quantity += adjustment.quantity;
        level.updated_at = Utc::now();

        self.audit.record(NewAuditEntry::new(
            ctx.user_id(),
            AuditAction::Create,
            ResourceKind::StockAdjustment.as_str(),
            *adjustment.id.as_uuid(),
            Some(snapshot(&adjustment)?),
        ))?;

        *guard = Some(level);
        self.backend
            .adjustments
            .append_all(std::slice::from_ref(&adjustment));
        info!(
            adjustment_id = %adjustment.id,
            product_id = %adjustment.product_id,
            location_id = %adjustment.location_id,
            quantity = adjustment.quantity,
            adjustment_type = %adjustment.adjustment_type,
            "stock adjusted"
        );
        Ok(adjustment)
    }

    pub fn get_adjustment(
        &self,
        ctx: &ActorContext,
        id: AdjustmentId,
    ) -> DomainResult<StockAdjustment> {
        authorize(ctx, Operation::Read, ResourceKind::StockAdjustment)?;
        self.backend.adjustments.get(id).ok_or(DomainError::NotFound)
    }

    pub fn list_adjustments(&self, ctx: &ActorContext) -> DomainResult<Vec<StockAdjustment>> {
        authorize(ctx, Operation::Read, ResourceKind::StockAdjustment)?;
        Ok(self.backend.adjustments.list())
    }

    /// Adjustments are permanent history. Reaching this is a caller bug, not
    /// a recoverable condition.
    pub fn update_adjustment(&self, _ctx: &ActorContext, _id: AdjustmentId) -> DomainResult<()> {
        Err(DomainError::fatal(
            "stock adjustments are immutable and cannot be updated",
        ))
    }

    pub fn delete_adjustment(&self, _ctx: &ActorContext, _id: AdjustmentId) -> DomainResult<()> {
        Err(DomainError::fatal(
            "stock adjustments are immutable and cannot be deleted",
        ))
    }
}
