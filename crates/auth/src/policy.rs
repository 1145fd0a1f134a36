//! Data-driven permission policy.
//!
//! A fixed table maps an intended operation (and the resource kind it targets)
//! to the set of roles allowed to perform it. Most write operations are gated
//! by a disjunction of roles, so evaluation goes through a small any-of
//! combinator that short-circuits on the first matching predicate.

use serde::{Deserialize, Serialize};

use stocktrail_core::{DomainError, DomainResult};

use crate::actor::{Actor, ActorContext, Role};

/// Operation intent checked against the policy table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

/// Kind of resource an operation targets.
///
/// `as_str` doubles as the audit trail's `object_type` label.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Product,
    Supplier,
    ProductSupplier,
    Location,
    Order,
    User,
    StockLevel,
    StockAdjustment,
    StockTransfer,
    AuditLog,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Product => "Product",
            ResourceKind::Supplier => "Supplier",
            ResourceKind::ProductSupplier => "ProductSupplier",
            ResourceKind::Location => "Location",
            ResourceKind::Order => "Order",
            ResourceKind::User => "User",
            ResourceKind::StockLevel => "StockLevel",
            ResourceKind::StockAdjustment => "StockAdjustment",
            ResourceKind::StockTransfer => "StockTransfer",
            ResourceKind::AuditLog => "AuditLog",
        }
    }
}

impl core::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side-effect-free role check.
pub type RolePredicate = fn(&Actor) -> bool;

pub fn is_admin(actor: &Actor) -> bool {
    actor.has_role(Role::Admin)
}

pub fn is_manager(actor: &Actor) -> bool {
    actor.has_role(Role::Manager)
}

pub fn is_employee(actor: &Actor) -> bool {
    actor.has_role(Role::Employee)
}

pub fn is_auditor(actor: &Actor) -> bool {
    actor.has_role(Role::Auditor)
}

/// Any-of combinator: allows if any predicate allows.
///
/// `Iterator::any` stops at the first match, so remaining predicates are not
/// evaluated once one passes. The checks are cheap and side-effect-free, so
/// ordering is irrelevant for correctness.
pub fn any_of<'a>(predicates: &'a [RolePredicate]) -> impl Fn(&Actor) -> bool + 'a {
    move |actor| predicates.iter().any(|p| p(actor))
}

/// The fixed policy table. Not configurable at runtime.
fn allowed(operation: Operation, resource: ResourceKind) -> &'static [RolePredicate] {
    match (operation, resource) {
        // The audit trail is readable by oversight roles only.
        (Operation::Read, ResourceKind::AuditLog) => &[is_admin, is_manager, is_auditor],
        (Operation::Read, _) => &[is_admin, is_manager, is_employee, is_auditor],
        (Operation::Create | Operation::Update, _) => &[is_admin, is_manager],
        (Operation::Delete, _) => &[is_admin],
    }
}

/// Pure policy check for an already-resolved actor.
pub fn is_allowed(actor: &Actor, operation: Operation, resource: ResourceKind) -> bool {
    any_of(allowed(operation, resource))(actor)
}

/// Authorize an operation for the current request context.
///
/// - No IO
/// - No panics
/// - Unauthenticated contexts are always denied
///
/// Denials carry no detail about which role would have sufficed.
pub fn authorize(
    ctx: &ActorContext,
    operation: Operation,
    resource: ResourceKind,
) -> DomainResult<()> {
    let actor = ctx.actor().ok_or(DomainError::Forbidden)?;
    if is_allowed(actor, operation, resource) {
        Ok(())
    } else {
        Err(DomainError::Forbidden)
    }
}
