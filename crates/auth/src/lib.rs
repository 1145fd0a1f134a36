//! `stocktrail-auth` — actor identity and role-based authorization.
//!
//! The policy is a fixed data-driven table (operation × resource kind → allowed
//! roles) evaluated through a short-circuiting any-of combinator. Pure
//! functions only: no IO, no framework request objects.

pub mod actor;
pub mod policy;

pub use actor::{Actor, ActorContext, Role};
pub use policy::{Operation, ResourceKind, any_of, authorize, is_allowed};
