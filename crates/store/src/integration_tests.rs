//! End-to-end scenarios across the service surface: role gating, audit
//! coupling, protective deletes, and the transfer workflow.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};

use stocktrail_audit::{AuditAction, AuditLog, AuditQuery, AuditRecorder, NewAuditEntry};
use stocktrail_auth::{ActorContext, Role};
use stocktrail_catalog::{
    Location, NewLocation, NewOrder, NewProduct, NewSupplier, NewUser, OrderLine, Product,
};
use stocktrail_core::{DomainError, DomainResult, UserId};
use stocktrail_stock::{
    AdjustmentType, NewAdjustment, NewStockLevel, NewTransfer, TransferStatus,
};

use crate::audit_store::InMemoryAuditStore;
use crate::services::AppServices;

fn ctx(role: Role) -> ActorContext {
    ActorContext::authenticated(UserId::new(), [role])
}

fn seed_product(app: &AppServices, admin: &ActorContext, sku: &str) -> Product {
    app.entities
        .create_product(
            admin,
            NewProduct {
                name: format!("Product {sku}"),
                sku: sku.to_string(),
                description: String::new(),
                category: "general".to_string(),
                price_cents: 12_50,
                minimum_stock: 0,
            },
        )
        .unwrap()
}

fn seed_location(app: &AppServices, admin: &ActorContext, code: &str) -> Location {
    app.entities
        .create_location(
            admin,
            NewLocation {
                name: format!("Location {code}"),
                code: code.to_string(),
                address: String::new(),
                city: String::new(),
                country: String::new(),
            },
        )
        .unwrap()
}

fn receive(
    app: &AppServices,
    actor: &ActorContext,
    product: &Product,
    location: &Location,
    quantity: i64,
) -> DomainResult<stocktrail_stock::StockAdjustment> {
    app.stock.apply_adjustment(
        actor,
        NewAdjustment {
            product_id: product.id,
            location_id: location.id,
            quantity,
            adjustment_type: AdjustmentType::Receive,
            reason: None,
            stock_transfer: None,
        },
    )
}

#[test]
fn transfer_lifecycle_moves_stock_between_locations() {
    let app = AppServices::in_memory();
    let admin = ctx(Role::Admin);
    let manager = ctx(Role::Manager);

    let product = seed_product(&app, &admin, "SKU-100");
    let from = seed_location(&app, &admin, "WH-A");
    let to = seed_location(&app, &admin, "WH-B");
    receive(&app, &manager, &product, &from, 20).unwrap();

    let transfer = app
        .transfers
        .request(
            &manager,
            NewTransfer {
                product_id: product.id,
                from_location: from.id,
                to_location: to.id,
                quantity: 5,
                reason: Some("rebalance".to_string()),
            },
        )
        .unwrap();
    assert_eq!(transfer.status, TransferStatus::Pending);
    assert_eq!(transfer.requested_by, manager.user_id().unwrap());

    let approved = app.transfers.approve(&admin, transfer.id).unwrap();
    assert_eq!(approved.status, TransferStatus::Approved);
    assert_eq!(approved.approved_by, admin.user_id());

    let completed = app.transfers.complete(&admin, transfer.id).unwrap();
    assert_eq!(completed.status, TransferStatus::Completed);

    let source = app.stock.get_level(&manager, product.id, from.id).unwrap();
    let destination = app.stock.get_level(&manager, product.id, to.id).unwrap();
    assert_eq!(source.quantity, 15);
    assert_eq!(destination.quantity, 5);

    let linked = app.backend().adjustments.for_transfer(transfer.id);
    assert_eq!(linked.len(), 2);
    let out = linked
        .iter()
        .find(|a| a.adjustment_type == AdjustmentType::TransferOut)
        .unwrap();
    let incoming = linked
        .iter()
        .find(|a| a.adjustment_type == AdjustmentType::TransferIn)
        .unwrap();
    assert_eq!(out.quantity, -5);
    assert_eq!(out.location_id, from.id);
    assert_eq!(incoming.quantity, 5);
    assert_eq!(incoming.location_id, to.id);
}

#[test]
fn completing_a_transfer_twice_is_a_conflict() {
    let app = AppServices::in_memory();
    let admin = ctx(Role::Admin);
    let product = seed_product(&app, &admin, "SKU-101");
    let from = seed_location(&app, &admin, "WH-C");
    let to = seed_location(&app, &admin, "WH-D");

    let transfer = app
        .transfers
        .request(
            &admin,
            NewTransfer {
                product_id: product.id,
                from_location: from.id,
                to_location: to.id,
                quantity: 3,
                reason: None,
            },
        )
        .unwrap();
    app.transfers.approve(&admin, transfer.id).unwrap();
    app.transfers.complete(&admin, transfer.id).unwrap();

    let err = app.transfers.complete(&admin, transfer.id).unwrap_err();
    assert!(err.is_conflict());

    // No double movement, no extra adjustments.
    assert_eq!(
        app.stock.get_level(&admin, product.id, from.id).unwrap().quantity,
        -3
    );
    assert_eq!(
        app.stock.get_level(&admin, product.id, to.id).unwrap().quantity,
        3
    );
    assert_eq!(app.backend().adjustments.for_transfer(transfer.id).len(), 2);
}

#[test]
fn completing_an_unapproved_transfer_is_a_conflict() {
    let app = AppServices::in_memory();
    let admin = ctx(Role::Admin);
    let product = seed_product(&app, &admin, "SKU-102");
    let from = seed_location(&app, &admin, "WH-E");
    let to = seed_location(&app, &admin, "WH-F");

    let transfer = app
        .transfers
        .request(
            &admin,
            NewTransfer {
                product_id: product.id,
                from_location: from.id,
                to_location: to.id,
                quantity: 4,
                reason: None,
            },
        )
        .unwrap();

    assert!(app.transfers.complete(&admin, transfer.id).unwrap_err().is_conflict());
    assert!(app.stock.get_level(&admin, product.id, from.id).is_err());
    assert!(app.backend().adjustments.is_empty());
}

#[test]
fn employee_reads_but_cannot_mutate() {
    let app = AppServices::in_memory();
    let admin = ctx(Role::Admin);
    let employee = ctx(Role::Employee);

    let err = app
        .entities
        .create_product(
            &employee,
            NewProduct {
                name: "Widget".to_string(),
                sku: "SKU-200".to_string(),
                description: String::new(),
                category: "general".to_string(),
                price_cents: 100,
                minimum_stock: 0,
            },
        )
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden));

    let product = seed_product(&app, &admin, "SKU-200");
    assert_eq!(app.entities.list_products(&employee).unwrap().len(), 1);
    assert_eq!(app.entities.get_product(&employee, product.id).unwrap().id, product.id);

    let location = seed_location(&app, &admin, "WH-G");
    let err = receive(&app, &employee, &product, &location, 5).unwrap_err();
    assert!(matches!(err, DomainError::Forbidden));
}

#[test]
fn anonymous_callers_are_rejected_everywhere() {
    let app = AppServices::in_memory();
    let admin = ctx(Role::Admin);
    let product = seed_product(&app, &admin, "SKU-201");

    let anon = ActorContext::Anonymous;
    assert!(matches!(
        app.entities.list_products(&anon).unwrap_err(),
        DomainError::Forbidden
    ));
    assert!(matches!(
        app.entities.get_product(&anon, product.id).unwrap_err(),
        DomainError::Forbidden
    ));
    assert!(matches!(
        app.audit.list(&anon, &AuditQuery::default()).unwrap_err(),
        DomainError::Forbidden
    ));
}

#[test]
fn product_with_adjustment_history_cannot_be_deleted() {
    let app = AppServices::in_memory();
    let admin = ctx(Role::Admin);
    let product = seed_product(&app, &admin, "SKU-300");
    let location = seed_location(&app, &admin, "WH-H");
    receive(&app, &admin, &product, &location, 10).unwrap();

    let err = app.entities.delete_product(&admin, product.id).unwrap_err();
    assert!(err.is_conflict());

    // Nothing was touched: product, level and history all survive.
    assert!(app.entities.get_product(&admin, product.id).is_ok());
    assert_eq!(
        app.stock.get_level(&admin, product.id, location.id).unwrap().quantity,
        10
    );
    assert_eq!(app.stock.list_adjustments(&admin).unwrap().len(), 1);
}

#[test]
fn unreferenced_product_delete_cascades_its_levels() {
    let app = AppServices::in_memory();
    let admin = ctx(Role::Admin);
    let product = seed_product(&app, &admin, "SKU-301");
    let location = seed_location(&app, &admin, "WH-I");
    app.stock
        .create_level(
            &admin,
            NewStockLevel {
                product_id: product.id,
                location_id: location.id,
                quantity: 7,
            },
        )
        .unwrap();

    app.entities.delete_product(&admin, product.id).unwrap();

    assert!(matches!(
        app.entities.get_product(&admin, product.id).unwrap_err(),
        DomainError::NotFound
    ));
    assert!(app.stock.get_level(&admin, product.id, location.id).is_err());
}

#[test]
fn supplier_with_orders_is_protected() {
    let app = AppServices::in_memory();
    let admin = ctx(Role::Admin);
    let product = seed_product(&app, &admin, "SKU-302");
    let supplier = app
        .entities
        .create_supplier(
            &admin,
            NewSupplier {
                name: "Acme".to_string(),
                contact_name: "Jo".to_string(),
                contact_email: "jo@acme.example".to_string(),
                contact_phone: String::new(),
                address: "1 Road".to_string(),
                city: "Town".to_string(),
                country: "Land".to_string(),
                rating: 4,
                notes: String::new(),
            },
        )
        .unwrap();
    app.entities
        .create_order(
            &admin,
            NewOrder {
                order_number: "PO-9000".to_string(),
                supplier_id: supplier.id,
                lines: vec![OrderLine {
                    product_id: product.id,
                    quantity: 2,
                }],
            },
        )
        .unwrap();

    assert!(app.entities.delete_supplier(&admin, supplier.id).unwrap_err().is_conflict());
    // The order line also protects the product.
    assert!(app.entities.delete_product(&admin, product.id).unwrap_err().is_conflict());
}

#[test]
fn deleting_a_user_detaches_their_audit_records() {
    let app = AppServices::in_memory();
    let admin = ctx(Role::Admin);
    let user = app
        .entities
        .create_user(
            &admin,
            NewUser {
                username: "casey".to_string(),
            },
        )
        .unwrap();
    let user_ctx = ActorContext::authenticated(user.id, [Role::Manager]);
    let product = seed_product(&app, &user_ctx, "SKU-400");

    app.entities.delete_user(&admin, user.id).unwrap();

    let records: Vec<AuditLog> = app
        .audit
        .list(
            &admin,
            &AuditQuery {
                object_id: Some(*product.id.as_uuid()),
                ..AuditQuery::default()
            },
        )
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].actor, None);
    assert_eq!(records[0].action, AuditAction::Create);
    assert_eq!(records[0].object_type, "Product");
    assert!(records[0].extra.is_some());
}

#[test]
fn user_with_stock_history_cannot_be_deleted() {
    let app = AppServices::in_memory();
    let admin = ctx(Role::Admin);
    let user = app
        .entities
        .create_user(
            &admin,
            NewUser {
                username: "riley".to_string(),
            },
        )
        .unwrap();
    let user_ctx = ActorContext::authenticated(user.id, [Role::Manager]);
    let product = seed_product(&app, &admin, "SKU-401");
    let location = seed_location(&app, &admin, "WH-J");
    receive(&app, &user_ctx, &product, &location, 1).unwrap();

    assert!(app.entities.delete_user(&admin, user.id).unwrap_err().is_conflict());
    assert!(app.entities.get_user(&admin, user.id).is_ok());
}

#[test]
fn transfer_typed_adjustment_requires_a_transfer_reference() {
    let app = AppServices::in_memory();
    let admin = ctx(Role::Admin);
    let product = seed_product(&app, &admin, "SKU-500");
    let location = seed_location(&app, &admin, "WH-K");

    let err = app
        .stock
        .apply_adjustment(
            &admin,
            NewAdjustment {
                product_id: product.id,
                location_id: location.id,
                quantity: 5,
                adjustment_type: AdjustmentType::TransferIn,
                reason: None,
                stock_transfer: None,
            },
        )
        .unwrap_err();
    match err {
        DomainError::Validation(v) => assert_eq!(v[0].field, "stock_transfer"),
        other => panic!("expected validation error, got {other:?}"),
    }

    // Rejected before anything was staged: no level, no history, no audit.
    assert!(app.stock.get_level(&admin, product.id, location.id).is_err());
    assert!(app.backend().adjustments.is_empty());
    let adjustment_records = app
        .audit
        .list(
            &admin,
            &AuditQuery {
                object_type: Some("StockAdjustment".to_string()),
                ..AuditQuery::default()
            },
        )
        .unwrap();
    assert!(adjustment_records.is_empty());
}

#[test]
fn adjustments_are_immutable_history() {
    let app = AppServices::in_memory();
    let admin = ctx(Role::Admin);
    let product = seed_product(&app, &admin, "SKU-501");
    let location = seed_location(&app, &admin, "WH-L");
    let adjustment = receive(&app, &admin, &product, &location, 5).unwrap();

    assert!(matches!(
        app.stock.update_adjustment(&admin, adjustment.id).unwrap_err(),
        DomainError::Fatal(_)
    ));
    assert!(matches!(
        app.stock.delete_adjustment(&admin, adjustment.id).unwrap_err(),
        DomainError::Fatal(_)
    ));
    assert_eq!(app.stock.list_adjustments(&admin).unwrap().len(), 1);
}

#[test]
fn direct_level_writes_floor_at_zero_but_adjustments_do_not() {
    let app = AppServices::in_memory();
    let admin = ctx(Role::Admin);
    let product = seed_product(&app, &admin, "SKU-502");
    let location = seed_location(&app, &admin, "WH-M");

    let err = app
        .stock
        .create_level(
            &admin,
            NewStockLevel {
                product_id: product.id,
                location_id: location.id,
                quantity: -1,
            },
        )
        .unwrap_err();
    assert!(err.is_validation());

    // A loss can take the level below zero; that is deliberate.
    receive(&app, &admin, &product, &location, 2).unwrap();
    app.stock
        .apply_adjustment(
            &admin,
            NewAdjustment {
                product_id: product.id,
                location_id: location.id,
                quantity: -6,
                adjustment_type: AdjustmentType::Loss,
                reason: Some("water damage".to_string()),
                stock_transfer: None,
            },
        )
        .unwrap();
    assert_eq!(
        app.stock.get_level(&admin, product.id, location.id).unwrap().quantity,
        -4
    );

    // But the direct update path still refuses to write a negative quantity.
    let err = app
        .stock
        .update_level(&admin, product.id, location.id, -2)
        .unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn duplicate_level_for_a_pair_is_rejected() {
    let app = AppServices::in_memory();
    let admin = ctx(Role::Admin);
    let product = seed_product(&app, &admin, "SKU-503");
    let location = seed_location(&app, &admin, "WH-N");
    app.stock
        .create_level(
            &admin,
            NewStockLevel {
                product_id: product.id,
                location_id: location.id,
                quantity: 3,
            },
        )
        .unwrap();

    let err = app
        .stock
        .create_level(
            &admin,
            NewStockLevel {
                product_id: product.id,
                location_id: location.id,
                quantity: 9,
            },
        )
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(
        app.stock.get_level(&admin, product.id, location.id).unwrap().quantity,
        3
    );
}

#[test]
fn audit_trail_reads_are_role_gated() {
    let app = AppServices::in_memory();
    let admin = ctx(Role::Admin);
    let auditor = ctx(Role::Auditor);
    let employee = ctx(Role::Employee);
    seed_product(&app, &admin, "SKU-600");

    assert!(matches!(
        app.audit.list(&employee, &AuditQuery::default()).unwrap_err(),
        DomainError::Forbidden
    ));

    let records = app.audit.list(&auditor, &AuditQuery::default()).unwrap();
    assert_eq!(records.len(), 1);

    // The auditor can see history but never write it.
    assert!(matches!(
        app.entities
            .create_product(
                &auditor,
                NewProduct {
                    name: "X".to_string(),
                    sku: "SKU-601".to_string(),
                    description: String::new(),
                    category: "general".to_string(),
                    price_cents: 1,
                    minimum_stock: 0,
                },
            )
            .unwrap_err(),
        DomainError::Forbidden
    ));
}

#[test]
fn audit_snapshot_carries_the_entity_data() {
    let app = AppServices::in_memory();
    let admin = ctx(Role::Admin);
    let product = seed_product(&app, &admin, "SKU-602");

    let records = app.audit.list(&admin, &AuditQuery::default()).unwrap();
    assert_eq!(records.len(), 1);
    let extra = records[0].extra.as_ref().unwrap();
    assert_eq!(extra["data"]["sku"], "SKU-602");
    assert_eq!(records[0].object_id, *product.id.as_uuid());
}

/// Recorder wrapper whose failure can be switched on mid-test, to observe
/// what a mutation does when the audit write fails.
struct FlakyRecorder {
    inner: Arc<InMemoryAuditStore>,
    failing: AtomicBool,
}

impl FlakyRecorder {
    fn new(inner: Arc<InMemoryAuditStore>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
        }
    }

    fn fail_from_now_on(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }
}

impl AuditRecorder for FlakyRecorder {
    fn record_batch(&self, entries: Vec<NewAuditEntry>) -> DomainResult<Vec<AuditLog>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::fatal("audit sink unavailable"));
        }
        self.inner.record_batch(entries)
    }

    fn detach_actor(&self, user: UserId) -> DomainResult<usize> {
        self.inner.detach_actor(user)
    }
}

#[test]
fn failed_audit_write_rolls_back_an_adjustment() {
    let store = Arc::new(InMemoryAuditStore::new());
    let recorder = Arc::new(FlakyRecorder::new(Arc::clone(&store)));
    let app = AppServices::with_recorder(
        Arc::clone(&recorder) as Arc<dyn AuditRecorder>,
        Arc::clone(&store),
    );
    let admin = ctx(Role::Admin);
    let product = seed_product(&app, &admin, "SKU-700");
    let location = seed_location(&app, &admin, "WH-O");
    receive(&app, &admin, &product, &location, 10).unwrap();
    let audit_len = store.len();

    recorder.fail_from_now_on();
    let err = receive(&app, &admin, &product, &location, 5).unwrap_err();
    assert!(matches!(err, DomainError::Fatal(_)));

    // The failed unit of work left no trace anywhere.
    assert_eq!(
        app.stock.get_level(&admin, product.id, location.id).unwrap().quantity,
        10
    );
    assert_eq!(app.stock.list_adjustments(&admin).unwrap().len(), 1);
    assert_eq!(store.len(), audit_len);
}

#[test]
fn failed_audit_write_rolls_back_a_transfer_completion() {
    let store = Arc::new(InMemoryAuditStore::new());
    let recorder = Arc::new(FlakyRecorder::new(Arc::clone(&store)));
    let app = AppServices::with_recorder(
        Arc::clone(&recorder) as Arc<dyn AuditRecorder>,
        Arc::clone(&store),
    );
    let admin = ctx(Role::Admin);
    let product = seed_product(&app, &admin, "SKU-701");
    let from = seed_location(&app, &admin, "WH-P");
    let to = seed_location(&app, &admin, "WH-Q");
    receive(&app, &admin, &product, &from, 8).unwrap();
    let transfer = app
        .transfers
        .request(
            &admin,
            NewTransfer {
                product_id: product.id,
                from_location: from.id,
                to_location: to.id,
                quantity: 8,
                reason: None,
            },
        )
        .unwrap();
    app.transfers.approve(&admin, transfer.id).unwrap();

    recorder.fail_from_now_on();
    assert!(matches!(
        app.transfers.complete(&admin, transfer.id).unwrap_err(),
        DomainError::Fatal(_)
    ));

    // Still approved, stock untouched, no linked adjustments.
    assert_eq!(
        app.transfers.get(&admin, transfer.id).unwrap().status,
        TransferStatus::Approved
    );
    assert_eq!(
        app.stock.get_level(&admin, product.id, from.id).unwrap().quantity,
        8
    );
    assert!(app.backend().adjustments.for_transfer(transfer.id).is_empty());

    // After the sink recovers, the same completion goes through.
    recorder.recover();
    app.transfers.complete(&admin, transfer.id).unwrap();
    assert_eq!(
        app.stock.get_level(&admin, product.id, to.id).unwrap().quantity,
        8
    );
}

#[test]
fn concurrent_adjustments_serialize_per_pair() {
    let app = Arc::new(AppServices::in_memory());
    let admin = ctx(Role::Admin);
    let product = seed_product(&app, &admin, "SKU-800");
    let location = seed_location(&app, &admin, "WH-R");

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let app = Arc::clone(&app);
            let manager = ctx(Role::Manager);
            let product = product.clone();
            let location = location.clone();
            std::thread::spawn(move || receive(&app, &manager, &product, &location, 1).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(
        app.stock.get_level(&admin, product.id, location.id).unwrap().quantity,
        16
    );
    assert_eq!(app.stock.list_adjustments(&admin).unwrap().len(), 16);
    // One audit record per adjustment.
    let records = app
        .audit
        .list(
            &admin,
            &AuditQuery {
                object_type: Some("StockAdjustment".to_string()),
                ..AuditQuery::default()
            },
        )
        .unwrap();
    assert_eq!(records.len(), 16);
}

#[test]
fn pending_transfer_can_be_deleted_but_completed_cannot() {
    let app = AppServices::in_memory();
    let admin = ctx(Role::Admin);
    let product = seed_product(&app, &admin, "SKU-801");
    let from = seed_location(&app, &admin, "WH-S");
    let to = seed_location(&app, &admin, "WH-T");

    let pending = app
        .transfers
        .request(
            &admin,
            NewTransfer {
                product_id: product.id,
                from_location: from.id,
                to_location: to.id,
                quantity: 1,
                reason: None,
            },
        )
        .unwrap();
    app.transfers.delete(&admin, pending.id).unwrap();
    assert!(matches!(
        app.transfers.get(&admin, pending.id).unwrap_err(),
        DomainError::NotFound
    ));

    let completed = app
        .transfers
        .request(
            &admin,
            NewTransfer {
                product_id: product.id,
                from_location: from.id,
                to_location: to.id,
                quantity: 2,
                reason: None,
            },
        )
        .unwrap();
    app.transfers.approve(&admin, completed.id).unwrap();
    app.transfers.complete(&admin, completed.id).unwrap();
    assert!(app.transfers.delete(&admin, completed.id).unwrap_err().is_conflict());
}

#[test]
fn concurrent_creates_with_one_sku_admit_exactly_one() {
    let app = Arc::new(AppServices::in_memory());
    let admin = ctx(Role::Admin);

    for round in 0..100 {
        let sku = format!("SKU-RACE-{round}");
        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let app = Arc::clone(&app);
                let barrier = Arc::clone(&barrier);
                let sku = sku.clone();
                std::thread::spawn(move || {
                    let admin = ctx(Role::Admin);
                    barrier.wait();
                    app.entities
                        .create_product(
                            &admin,
                            NewProduct {
                                name: "Racer".to_string(),
                                sku,
                                description: String::new(),
                                category: "general".to_string(),
                                price_cents: 1,
                                minimum_stock: 0,
                            },
                        )
                        .is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1, "sku {sku} was created twice");
    }

    assert_eq!(app.entities.list_products(&admin).unwrap().len(), 100);
}

#[test]
fn level_delete_serializes_with_a_racing_adjustment() {
    let app = Arc::new(AppServices::in_memory());
    let admin = ctx(Role::Admin);

    for round in 0..50 {
        let product = seed_product(&app, &admin, &format!("SKU-DEL-{round}"));
        let location = seed_location(&app, &admin, &format!("WH-DEL-{round}"));
        app.stock
            .create_level(
                &admin,
                NewStockLevel {
                    product_id: product.id,
                    location_id: location.id,
                    quantity: 5,
                },
            )
            .unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let adjust = {
            let app = Arc::clone(&app);
            let barrier = Arc::clone(&barrier);
            let product = product.clone();
            let location = location.clone();
            std::thread::spawn(move || {
                let manager = ctx(Role::Manager);
                barrier.wait();
                receive(&app, &manager, &product, &location, 1)
            })
        };
        let delete = {
            let app = Arc::clone(&app);
            let barrier = Arc::clone(&barrier);
            let (p, l) = (product.id, location.id);
            std::thread::spawn(move || {
                let admin = ctx(Role::Admin);
                barrier.wait();
                app.stock.delete_level(&admin, p, l)
            })
        };
        adjust.join().unwrap().unwrap();
        delete.join().unwrap().unwrap();

        // Serialized either way: the delete removed the adjusted row, or the
        // adjustment re-created a fresh row from zero. A row that reflects
        // neither (e.g. the pre-delete quantity) would mean the adjustment's
        // effect was discarded while its record survived.
        match app.backend().ledger.get(product.id, location.id) {
            None => {}
            Some(level) => assert_eq!(level.quantity, 1),
        }
        assert!(app.backend().adjustments.any(|a| a.product_id == product.id));
    }
}

#[test]
fn user_deletion_serializes_with_attributed_mutations() {
    let app = Arc::new(AppServices::in_memory());
    let admin = ctx(Role::Admin);

    for round in 0..50 {
        let user = app
            .entities
            .create_user(
                &admin,
                NewUser {
                    username: format!("worker-{round}"),
                },
            )
            .unwrap();
        let product = seed_product(&app, &admin, &format!("SKU-UDEL-{round}"));
        let location = seed_location(&app, &admin, &format!("WH-UDEL-{round}"));

        let barrier = Arc::new(Barrier::new(2));
        let adjust = {
            let app = Arc::clone(&app);
            let barrier = Arc::clone(&barrier);
            let user_ctx = ActorContext::authenticated(user.id, [Role::Manager]);
            let product = product.clone();
            let location = location.clone();
            std::thread::spawn(move || {
                barrier.wait();
                receive(&app, &user_ctx, &product, &location, 1)
            })
        };
        let delete = {
            let app = Arc::clone(&app);
            let barrier = Arc::clone(&barrier);
            let user_id = user.id;
            std::thread::spawn(move || {
                let admin = ctx(Role::Admin);
                barrier.wait();
                app.entities.delete_user(&admin, user_id)
            })
        };
        let adjustment = adjust.join().unwrap().unwrap();
        match delete.join().unwrap() {
            // Deletion won the race: the adjustment ran afterwards.
            Ok(()) => assert!(app.entities.get_user(&admin, user.id).is_err()),
            // The adjustment committed first, so the user now has history.
            Err(err) => {
                assert!(err.is_conflict());
                assert!(app.entities.get_user(&admin, user.id).is_ok());
            }
        }

        // Neither ordering interleaves, so the adjustment's audit record is
        // never caught by the deletion's actor detachment.
        let records = app
            .audit
            .list(
                &admin,
                &AuditQuery {
                    object_id: Some(*adjustment.id.as_uuid()),
                    ..AuditQuery::default()
                },
            )
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].actor, Some(user.id));
    }
}

#[test]
fn duplicate_sku_is_rejected_per_field() {
    let app = AppServices::in_memory();
    let admin = ctx(Role::Admin);
    seed_product(&app, &admin, "SKU-900");

    let err = app
        .entities
        .create_product(
            &admin,
            NewProduct {
                name: "Other".to_string(),
                sku: "SKU-900".to_string(),
                description: String::new(),
                category: "general".to_string(),
                price_cents: 1,
                minimum_stock: 0,
            },
        )
        .unwrap_err();
    match err {
        DomainError::Validation(v) => assert_eq!(v[0].field, "sku"),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(app.entities.list_products(&admin).unwrap().len(), 1);
}
