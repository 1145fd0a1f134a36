//! The stock ledger: current quantity per (product, location), plus the
//! append-only adjustment history.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;

use stocktrail_core::{AdjustmentId, DomainError, DomainResult, LocationId, ProductId, TransferId};
use stocktrail_stock::{StockAdjustment, StockLevel};

pub(crate) type LevelKey = (ProductId, LocationId);

/// One lockable slot per (product, location) pair.
///
/// `None` means "no row yet": a slot may be materialized for a unit of work
/// that subsequently fails, and a `None` slot stays invisible to readers, so
/// a rolled-back first adjustment leaves no row behind.
pub(crate) type LevelCell = Arc<Mutex<Option<StockLevel>>>;

/// Owns all `StockLevel` rows.
///
/// The keyed map makes the one-row-per-pair invariant structural. Each pair
/// has its own mutex, so concurrent deltas against the same pair serialize
/// (the loser blocks until the winner commits, then reads the updated value)
/// while distinct pairs never contend. This is the in-memory equivalent of a
/// per-row `SELECT ... FOR UPDATE`.
#[derive(Debug, Default)]
pub struct StockLedger {
    cells: RwLock<HashMap<LevelKey, LevelCell>>,
}

fn poisoned() -> DomainError {
    DomainError::fatal("stock level lock poisoned")
}

impl StockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the lockable slot for a pair.
    pub(crate) fn cell(&self, product_id: ProductId, location_id: LocationId) -> LevelCell {
        if let Ok(cells) = self.cells.read() {
            if let Some(cell) = cells.get(&(product_id, location_id)) {
                return Arc::clone(cell);
            }
        }
        let mut cells = match self.cells.write() {
            Ok(c) => c,
            Err(e) => e.into_inner(),
        };
        Arc::clone(
            cells
                .entry((product_id, location_id))
                .or_insert_with(|| Arc::new(Mutex::new(None))),
        )
    }

    pub fn get(&self, product_id: ProductId, location_id: LocationId) -> Option<StockLevel> {
        let cells = self.cells.read().ok()?;
        let cell = cells.get(&(product_id, location_id))?.clone();
        drop(cells);
        let guard = cell.lock().ok()?;
        guard.clone()
    }

    /// All existing rows, most recently updated first.
    pub fn list(&self) -> Vec<StockLevel> {
        let cells: Vec<LevelCell> = match self.cells.read() {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => return vec![],
        };
        let mut levels: Vec<StockLevel> = cells
            .iter()
            .filter_map(|cell| cell.lock().ok().and_then(|g| g.clone()))
            .collect();
        levels.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        levels
    }

    /// Apply a signed delta to a pair, creating the row at quantity 0 if
    /// absent, and return the new quantity.
    ///
    /// Negative results are permitted by design (backorder/oversell); there
    /// is no floor at zero. Internal to the store crate's services — the
    /// outside world moves stock through adjustments and transfers.
    pub fn apply_delta(
        &self,
        product_id: ProductId,
        location_id: LocationId,
        delta: i64,
    ) -> DomainResult<i64> {
        let cell = self.cell(product_id, location_id);
        let mut guard = cell.lock().map_err(|_| poisoned())?;
        let mut level = guard
            .clone()
            .unwrap_or_else(|| StockLevel::empty(product_id, location_id));
        level.quantity += delta;
        level.updated_at = Utc::now();
        let quantity = level.quantity;
        *guard = Some(level);
        Ok(quantity)
    }

    /// Insert a row created through the direct write path. Rejects a second
    /// row for an existing pair.
    pub(crate) fn insert(&self, level: StockLevel) -> DomainResult<()> {
        let cell = self.cell(level.product_id, level.location_id);
        let mut guard = cell.lock().map_err(|_| poisoned())?;
        if guard.is_some() {
            return Err(DomainError::validation(
                "product_id",
                "stock level for this product at this location already exists",
            ));
        }
        *guard = Some(level);
        Ok(())
    }

    /// Cascade used when a product is deleted.
    pub(crate) fn remove_for_product(&self, product_id: ProductId) {
        if let Ok(mut cells) = self.cells.write() {
            cells.retain(|(p, _), _| *p != product_id);
        }
    }

    /// Cascade used when a location is deleted.
    pub(crate) fn remove_for_location(&self, location_id: LocationId) {
        if let Ok(mut cells) = self.cells.write() {
            cells.retain(|(_, l), _| *l != location_id);
        }
    }
}

/// Append-only adjustment history.
///
/// Records are never updated or deleted; the log only grows. Listing is
/// newest first.
#[derive(Debug, Default)]
pub struct AdjustmentLog {
    records: RwLock<Vec<StockAdjustment>>,
}

impl AdjustmentLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append_all(&self, adjustments: &[StockAdjustment]) {
        if let Ok(mut records) = self.records.write() {
            records.extend_from_slice(adjustments);
        }
    }

    pub fn get(&self, id: AdjustmentId) -> Option<StockAdjustment> {
        let records = self.records.read().ok()?;
        records.iter().find(|a| a.id == id).cloned()
    }

    pub fn list(&self) -> Vec<StockAdjustment> {
        match self.records.read() {
            Ok(records) => records.iter().rev().cloned().collect(),
            Err(_) => vec![],
        }
    }

    pub fn any<F>(&self, mut predicate: F) -> bool
    where
        F: FnMut(&StockAdjustment) -> bool,
    {
        match self.records.read() {
            Ok(records) => records.iter().any(|a| predicate(a)),
            Err(_) => false,
        }
    }

    pub fn for_transfer(&self, transfer_id: TransferId) -> Vec<StockAdjustment> {
        match self.records.read() {
            Ok(records) => records
                .iter()
                .filter(|a| a.stock_transfer == Some(transfer_id))
                .cloned()
                .collect(),
            Err(_) => vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
