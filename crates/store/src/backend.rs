//! Shared in-memory tables for the service layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use stocktrail_core::{
    LocationId, OrderId, ProductId, ProductSupplierId, SupplierId, TransferId, UserId,
};
use stocktrail_catalog::{Location, Order, Product, ProductSupplier, Supplier, User};
use stocktrail_stock::StockTransfer;

use crate::ledger::{AdjustmentLog, StockLedger};
use crate::table::Table;

/// One lockable slot per transfer, so state transitions serialize per row and
/// two concurrent completions cannot both succeed.
pub(crate) type TransferCell = Arc<Mutex<StockTransfer>>;

/// Transfer rows with per-row locking.
#[derive(Debug, Default)]
pub struct TransferTable {
    inner: RwLock<HashMap<TransferId, TransferCell>>,
}

impl TransferTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, transfer: StockTransfer) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(transfer.id, Arc::new(Mutex::new(transfer)));
        }
    }

    pub(crate) fn cell(&self, id: TransferId) -> Option<TransferCell> {
        let map = self.inner.read().ok()?;
        map.get(&id).cloned()
    }

    pub fn get(&self, id: TransferId) -> Option<StockTransfer> {
        let cell = self.cell(id)?;
        let guard = cell.lock().ok()?;
        Some(guard.clone())
    }

    /// Snapshot of all transfers, newest first.
    pub fn list(&self) -> Vec<StockTransfer> {
        let cells: Vec<TransferCell> = match self.inner.read() {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => return vec![],
        };
        let mut transfers: Vec<StockTransfer> = cells
            .iter()
            .filter_map(|cell| cell.lock().ok().map(|g| g.clone()))
            .collect();
        transfers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        transfers
    }

    pub(crate) fn remove(&self, id: TransferId) -> Option<StockTransfer> {
        let mut map = self.inner.write().ok()?;
        let cell = map.remove(&id)?;
        let guard = cell.lock().ok()?;
        Some(guard.clone())
    }

    pub fn any<F>(&self, mut predicate: F) -> bool
    where
        F: FnMut(&StockTransfer) -> bool,
    {
        let cells: Vec<TransferCell> = match self.inner.read() {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => return false,
        };
        cells
            .iter()
            .any(|cell| cell.lock().map(|g| predicate(&g)).unwrap_or(false))
    }
}

/// All in-memory state shared by the services.
#[derive(Debug, Default)]
pub struct Backend {
    pub users: Table<UserId, User>,
    pub products: Table<ProductId, Product>,
    pub suppliers: Table<SupplierId, Supplier>,
    pub product_suppliers: Table<ProductSupplierId, ProductSupplier>,
    pub locations: Table<LocationId, Location>,
    pub orders: Table<OrderId, Order>,
    pub ledger: StockLedger,
    pub adjustments: AdjustmentLog,
    pub transfers: TransferTable,
    /// Held shared by units of work that attribute new records to the acting
    /// user, exclusively by user deletion. Without it, an attribution could
    /// commit between `user_is_referenced` and the removal of the user.
    attribution: RwLock<()>,
}

impl Backend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared hold for a unit of work that stamps the acting user into a new
    /// record (adjusted_by, requested_by, approved_by). Acquire before any
    /// other backend lock and keep until the commit is done.
    pub(crate) fn attribution_shared(&self) -> RwLockReadGuard<'_, ()> {
        match self.attribution.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Exclusive hold for user deletion: the reference check and the removal
    /// run with no attributing unit of work in flight.
    pub(crate) fn attribution_exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        match self.attribution.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Protective foreign keys: history referencing a product blocks its
    /// deletion.
    pub(crate) fn product_is_referenced(&self, id: ProductId) -> bool {
        self.adjustments.any(|a| a.product_id == id)
            || self.transfers.any(|t| t.product_id == id)
            || self.orders.any(|o| o.references_product(id))
    }

    pub(crate) fn location_is_referenced(&self, id: LocationId) -> bool {
        self.adjustments.any(|a| a.location_id == id)
            || self
                .transfers
                .any(|t| t.from_location == id || t.to_location == id)
    }

    pub(crate) fn supplier_is_referenced(&self, id: SupplierId) -> bool {
        self.orders.any(|o| o.supplier_id == id)
    }

    pub(crate) fn user_is_referenced(&self, id: UserId) -> bool {
        self.adjustments.any(|a| a.adjusted_by == id)
            || self
                .transfers
                .any(|t| t.requested_by == id || t.approved_by == Some(id))
    }

    pub(crate) fn transfer_is_referenced(&self, id: TransferId) -> bool {
        self.adjustments.any(|a| a.stock_transfer == Some(id))
    }
}
