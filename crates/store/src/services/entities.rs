//! CRUD over the entity catalog, with protective deletion semantics.

use std::sync::Arc;

use tracing::info;

use stocktrail_audit::{AuditAction, AuditRecorder, NewAuditEntry};
use stocktrail_auth::{ActorContext, Operation, ResourceKind, authorize};
use stocktrail_catalog::{
    Location, NewLocation, NewOrder, NewProduct, NewProductSupplier, NewSupplier, NewUser, Order,
    Product, ProductSupplier, Supplier, User,
};
use stocktrail_core::{
    DomainError, DomainResult, LocationId, OrderId, ProductId, ProductSupplierId, SupplierId,
    UserId,
};

use crate::backend::Backend;

use super::snapshot;

/// Generic persistence surface for the catalog entities.
///
/// Uniqueness (sku, location code, order number, product+supplier pair) and
/// referential integrity live here, since the service owns the tables.
pub struct EntityService {
    backend: Arc<Backend>,
    audit: Arc<dyn AuditRecorder>,
}

impl EntityService {
    pub(crate) fn new(backend: Arc<Backend>, audit: Arc<dyn AuditRecorder>) -> Self {
        Self { backend, audit }
    }

    fn record(
        &self,
        ctx: &ActorContext,
        action: AuditAction,
        kind: ResourceKind,
        object_id: uuid::Uuid,
        extra: serde_json::Value,
    ) -> DomainResult<()> {
        self.audit.record(NewAuditEntry::new(
            ctx.user_id(),
            action,
            kind.as_str(),
            object_id,
            Some(extra),
        ))?;
        Ok(())
    }

    // ── Products ─────────────────────────────────────────────────────────

    pub fn create_product(&self, ctx: &ActorContext, new: NewProduct) -> DomainResult<Product> {
        authorize(ctx, Operation::Create, ResourceKind::Product)?;
        // Uniqueness check and insert under one table hold, so a concurrent
        // create with the same sku serializes and the loser sees the winner.
        let mut products = self.backend.products.locked();
        if products.any(|p| p.sku == new.sku) {
            return Err(DomainError::validation(
                "sku",
                "product with this sku already exists",
            ));
        }
        let product = Product::create(new)?;
        self.record(
            ctx,
            AuditAction::Create,
            ResourceKind::Product,
            *product.id.as_uuid(),
            snapshot(&product)?,
        )?;
        products.insert(product.id, product.clone());
        info!(product_id = %product.id, sku = %product.sku, "product created");
        Ok(product)
    }

    pub fn get_product(&self, ctx: &ActorContext, id: ProductId) -> DomainResult<Product> {
        authorize(ctx, Operation::Read, ResourceKind::Product)?;
        self.backend.products.get(&id).ok_or(DomainError::NotFound)
    }

    pub fn list_products(&self, ctx: &ActorContext) -> DomainResult<Vec<Product>> {
        authorize(ctx, Operation::Read, ResourceKind::Product)?;
        Ok(self.backend.products.list())
    }

    pub fn update_product(
        &self,
        ctx: &ActorContext,
        id: ProductId,
        new: NewProduct,
    ) -> DomainResult<Product> {
        authorize(ctx, Operation::Update, ResourceKind::Product)?;
        let mut products = self.backend.products.locked();
        let mut product = products.get(&id).ok_or(DomainError::NotFound)?;
        if products.any(|p| p.sku == new.sku && p.id != id) {
            return Err(DomainError::validation(
                "sku",
                "product with this sku already exists",
            ));
        }
        product.apply_update(new)?;
        self.record(
            ctx,
            AuditAction::Update,
            ResourceKind::Product,
            *product.id.as_uuid(),
            snapshot(&product)?,
        )?;
        products.insert(id, product.clone());
        Ok(product)
    }

    /// Protective delete: any adjustment, transfer or order line referencing
    /// the product blocks removal. Stock levels and sourcing links cascade.
    pub fn delete_product(&self, ctx: &ActorContext, id: ProductId) -> DomainResult<()> {
        authorize(ctx, Operation::Delete, ResourceKind::Product)?;
        let product = self.backend.products.get(&id).ok_or(DomainError::NotFound)?;
        if self.backend.product_is_referenced(id) {
            return Err(DomainError::conflict(
                "product has stock or order history and cannot be deleted",
            ));
        }
        self.record(
            ctx,
            AuditAction::Delete,
            ResourceKind::Product,
            *id.as_uuid(),
            snapshot(&product)?,
        )?;
        self.backend.products.remove(&id);
        self.backend.ledger.remove_for_product(id);
        self.backend
            .product_suppliers
            .retain(|_, link| link.product_id != id);
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    // ── Suppliers ────────────────────────────────────────────────────────

    pub fn create_supplier(&self, ctx: &ActorContext, new: NewSupplier) -> DomainResult<Supplier> {
        authorize(ctx, Operation::Create, ResourceKind::Supplier)?;
        let supplier = Supplier::create(new)?;
        self.record(
            ctx,
            AuditAction::Create,
            ResourceKind::Supplier,
            *supplier.id.as_uuid(),
            snapshot(&supplier)?,
        )?;
        self.backend.suppliers.insert(supplier.id, supplier.clone());
        Ok(supplier)
    }

    pub fn get_supplier(&self, ctx: &ActorContext, id: SupplierId) -> DomainResult<Supplier> {
        authorize(ctx, Operation::Read, ResourceKind::Supplier)?;
        self.backend.suppliers.get(&id).ok_or(DomainError::NotFound)
    }

    pub fn list_suppliers(&self, ctx: &ActorContext) -> DomainResult<Vec<Supplier>> {
        authorize(ctx, Operation::Read, ResourceKind::Supplier)?;
        Ok(self.backend.suppliers.list())
    }

    pub fn update_supplier(
        &self,
        ctx: &ActorContext,
        id: SupplierId,
        new: NewSupplier,
    ) -> DomainResult<Supplier> {
        authorize(ctx, Operation::Update, ResourceKind::Supplier)?;
        let mut supplier = self.backend.suppliers.get(&id).ok_or(DomainError::NotFound)?;
        supplier.apply_update(new)?;
        self.record(
            ctx,
            AuditAction::Update,
            ResourceKind::Supplier,
            *id.as_uuid(),
            snapshot(&supplier)?,
        )?;
        self.backend.suppliers.insert(id, supplier.clone());
        Ok(supplier)
    }

    /// Suppliers with open orders are protected; sourcing links cascade.
    pub fn delete_supplier(&self, ctx: &ActorContext, id: SupplierId) -> DomainResult<()> {
        authorize(ctx, Operation::Delete, ResourceKind::Supplier)?;
        let supplier = self.backend.suppliers.get(&id).ok_or(DomainError::NotFound)?;
        if self.backend.supplier_is_referenced(id) {
            return Err(DomainError::conflict(
                "supplier has order history and cannot be deleted",
            ));
        }
        self.record(
            ctx,
            AuditAction::Delete,
            ResourceKind::Supplier,
            *id.as_uuid(),
            snapshot(&supplier)?,
        )?;
        self.backend.suppliers.remove(&id);
        self.backend
            .product_suppliers
            .retain(|_, link| link.supplier_id != id);
        Ok(())
    }

    // ── Product/supplier sourcing links ──────────────────────────────────

    pub fn create_product_supplier(
        &self,
        ctx: &ActorContext,
        new: NewProductSupplier,
    ) -> DomainResult<ProductSupplier> {
        authorize(ctx, Operation::Create, ResourceKind::ProductSupplier)?;
        self.backend
            .products
            .get(&new.product_id)
            .ok_or(DomainError::NotFound)?;
        self.backend
            .suppliers
            .get(&new.supplier_id)
            .ok_or(DomainError::NotFound)?;
        let mut links = self.backend.product_suppliers.locked();
        if links.any(|l| l.product_id == new.product_id && l.supplier_id == new.supplier_id) {
            return Err(DomainError::validation(
                "supplier_id",
                "sourcing link for this product and supplier already exists",
            ));
        }
        let link = ProductSupplier::create(new)?;
        self.record(
            ctx,
            AuditAction::Create,
            ResourceKind::ProductSupplier,
            *link.id.as_uuid(),
            snapshot(&link)?,
        )?;
        links.insert(link.id, link.clone());
        Ok(link)
    }

    pub fn get_product_supplier(
        &self,
        ctx: &ActorContext,
        id: ProductSupplierId,
    ) -> DomainResult<ProductSupplier> {
        authorize(ctx, Operation::Read, ResourceKind::ProductSupplier)?;
        self.backend
            .product_suppliers
            .get(&id)
            .ok_or(DomainError::NotFound)
    }

    pub fn list_product_suppliers(&self, ctx: &ActorContext) -> DomainResult<Vec<ProductSupplier>> {
        authorize(ctx, Operation::Read, ResourceKind::ProductSupplier)?;
        Ok(self.backend.product_suppliers.list())
    }

    pub fn update_product_supplier(
        &self,
        ctx: &ActorContext,
        id: ProductSupplierId,
        new: NewProductSupplier,
    ) -> DomainResult<ProductSupplier> {
        authorize(ctx, Operation::Update, ResourceKind::ProductSupplier)?;
        let mut link = self
            .backend
            .product_suppliers
            .get(&id)
            .ok_or(DomainError::NotFound)?;
        link.apply_update(new)?;
        self.record(
            ctx,
            AuditAction::Update,
            ResourceKind::ProductSupplier,
            *id.as_uuid(),
            snapshot(&link)?,
        )?;
        self.backend.product_suppliers.insert(id, link.clone());
        Ok(link)
    }

    pub fn delete_product_supplier(
        &self,
        ctx: &ActorContext,
        id: ProductSupplierId,
    ) -> DomainResult<()> {
        authorize(ctx, Operation::Delete, ResourceKind::ProductSupplier)?;
        let link = self
            .backend
            .product_suppliers
            .get(&id)
            .ok_or(DomainError::NotFound)?;
        self.record(
            ctx,
            AuditAction::Delete,
            ResourceKind::ProductSupplier,
            *id.as_uuid(),
            snapshot(&link)?,
        )?;
        self.backend.product_suppliers.remove(&id);
        Ok(())
    }

    // ── Locations ────────────────────────────────────────────────────────

    pub fn create_location(&self, ctx: &ActorContext, new: NewLocation) -> DomainResult<Location> {
        authorize(ctx, Operation::Create, ResourceKind::Location)?;
        let mut locations = self.backend.locations.locked();
        if locations.any(|l| l.code == new.code) {
            return Err(DomainError::validation(
                "code",
                "location with this code already exists",
            ));
        }
        let location = Location::create(new)?;
        self.record(
            ctx,
            AuditAction::Create,
            ResourceKind::Location,
            *location.id.as_uuid(),
            snapshot(&location)?,
        )?;
        locations.insert(location.id, location.clone());
        info!(location_id = %location.id, code = %location.code, "location created");
        Ok(location)
    }

    pub fn get_location(&self, ctx: &ActorContext, id: LocationId) -> DomainResult<Location> {
        authorize(ctx, Operation::Read, ResourceKind::Location)?;
        self.backend.locations.get(&id).ok_or(DomainError::NotFound)
    }

    pub fn list_locations(&self, ctx: &ActorContext) -> DomainResult<Vec<Location>> {
        authorize(ctx, Operation::Read, ResourceKind::Location)?;
        Ok(self.backend.locations.list())
    }

    pub fn update_location(
        &self,
        ctx: &ActorContext,
        id: LocationId,
        new: NewLocation,
    ) -> DomainResult<Location> {
        authorize(ctx, Operation::Update, ResourceKind::Location)?;
        let mut locations = self.backend.locations.locked();
        let mut location = locations.get(&id).ok_or(DomainError::NotFound)?;
        if locations.any(|l| l.code == new.code && l.id != id) {
            return Err(DomainError::validation(
                "code",
                "location with this code already exists",
            ));
        }
        location.apply_update(new)?;
        self.record(
            ctx,
            AuditAction::Update,
            ResourceKind::Location,
            *id.as_uuid(),
            snapshot(&location)?,
        )?;
        locations.insert(id, location.clone());
        Ok(location)
    }

    /// Protective delete: adjustment or transfer history blocks removal;
    /// stock levels at the location cascade.
    pub fn delete_location(&self, ctx: &ActorContext, id: LocationId) -> DomainResult<()> {
        authorize(ctx, Operation::Delete, ResourceKind::Location)?;
        let location = self.backend.locations.get(&id).ok_or(DomainError::NotFound)?;
        if self.backend.location_is_referenced(id) {
            return Err(DomainError::conflict(
                "location has stock history and cannot be deleted",
            ));
        }
        self.record(
            ctx,
            AuditAction::Delete,
            ResourceKind::Location,
            *id.as_uuid(),
            snapshot(&location)?,
        )?;
        self.backend.locations.remove(&id);
        self.backend.ledger.remove_for_location(id);
        Ok(())
    }

    // ── Orders ───────────────────────────────────────────────────────────

    pub fn create_order(&self, ctx: &ActorContext, new: NewOrder) -> DomainResult<Order> {
        authorize(ctx, Operation::Create, ResourceKind::Order)?;
        self.backend
            .suppliers
            .get(&new.supplier_id)
            .ok_or(DomainError::NotFound)?;
        for line in &new.lines {
            self.backend
                .products
                .get(&line.product_id)
                .ok_or(DomainError::NotFound)?;
        }
        let mut orders = self.backend.orders.locked();
        if orders.any(|o| o.order_number == new.order_number) {
            return Err(DomainError::validation(
                "order_number",
                "order with this number already exists",
            ));
        }
        let order = Order::create(new)?;
        self.record(
            ctx,
            AuditAction::Create,
            ResourceKind::Order,
            *order.id.as_uuid(),
            snapshot(&order)?,
        )?;
        orders.insert(order.id, order.clone());
        info!(order_id = %order.id, order_number = %order.order_number, "order created");
        Ok(order)
    }

    pub fn get_order(&self, ctx: &ActorContext, id: OrderId) -> DomainResult<Order> {
        authorize(ctx, Operation::Read, ResourceKind::Order)?;
        self.backend.orders.get(&id).ok_or(DomainError::NotFound)
    }

    pub fn list_orders(&self, ctx: &ActorContext) -> DomainResult<Vec<Order>> {
        authorize(ctx, Operation::Read, ResourceKind::Order)?;
        Ok(self.backend.orders.list())
    }

    pub fn update_order(
        &self,
        ctx: &ActorContext,
        id: OrderId,
        new: NewOrder,
    ) -> DomainResult<Order> {
        authorize(ctx, Operation::Update, ResourceKind::Order)?;
        self.backend
            .suppliers
            .get(&new.supplier_id)
            .ok_or(DomainError::NotFound)?;
        for line in &new.lines {
            self.backend
                .products
                .get(&line.product_id)
                .ok_or(DomainError::NotFound)?;
        }
        let mut orders = self.backend.orders.locked();
        let mut order = orders.get(&id).ok_or(DomainError::NotFound)?;
        if orders.any(|o| o.order_number == new.order_number && o.id != id) {
            return Err(DomainError::validation(
                "order_number",
                "order with this number already exists",
            ));
        }
        order.apply_update(new)?;
        self.record(
            ctx,
            AuditAction::Update,
            ResourceKind::Order,
            *id.as_uuid(),
            snapshot(&order)?,
        )?;
        orders.insert(id, order.clone());
        Ok(order)
    }

    pub fn delete_order(&self, ctx: &ActorContext, id: OrderId) -> DomainResult<()> {
        authorize(ctx, Operation::Delete, ResourceKind::Order)?;
        let order = self.backend.orders.get(&id).ok_or(DomainError::NotFound)?;
        self.record(
            ctx,
            AuditAction::Delete,
            ResourceKind::Order,
            *id.as_uuid(),
            snapshot(&order)?,
        )?;
        self.backend.orders.remove(&id);
        Ok(())
    }

    // ── Users ────────────────────────────────────────────────────────────

    pub fn create_user(&self, ctx: &ActorContext, new: NewUser) -> DomainResult<User> {
        authorize(ctx, Operation::Create, ResourceKind::User)?;
        let user = User::create(new)?;
        self.record(
            ctx,
            AuditAction::Create,
            ResourceKind::User,
            *user.id.as_uuid(),
            snapshot(&user)?,
        )?;
        self.backend.users.insert(user.id, user.clone());
        Ok(user)
    }

    pub fn get_user(&self, ctx: &ActorContext, id: UserId) -> DomainResult<User> {
        authorize(ctx, Operation::Read, ResourceKind::User)?;
        self.backend.users.get(&id).ok_or(DomainError::NotFound)
    }

    /// Users with adjustment or transfer history are protected. On success,
    /// the user's past audit records survive with their actor nulled.
    pub fn delete_user(&self, ctx: &ActorContext, id: UserId) -> DomainResult<()> {
        authorize(ctx, Operation::Delete, ResourceKind::User)?;
        // Exclusive against attributing units of work: an adjustment or
        // transfer stamped with this user either commits before the reference
        // check (and blocks the deletion) or runs after the removal.
        let _exclusive = self.backend.attribution_exclusive();
        let user = self.backend.users.get(&id).ok_or(DomainError::NotFound)?;
        if self.backend.user_is_referenced(id) {
            return Err(DomainError::conflict(
                "user has stock history and cannot be deleted",
            ));
        }
        self.record(
            ctx,
            AuditAction::Delete,
            ResourceKind::User,
            *id.as_uuid(),
            snapshot(&user)?,
        )?;
        self.audit.detach_actor(id)?;
        self.backend.users.remove(&id);
        info!(user_id = %id, "user deleted, audit records detached");
        Ok(())
    }
}
