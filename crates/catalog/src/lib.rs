//! `stocktrail-catalog` — the entity catalog around the stock core.
//!
//! Products, suppliers, their sourcing links, locations, orders and users.
//! Field validation lives here; uniqueness and referential integrity are
//! enforced by the store layer, which owns the tables.
//!
//! Monetary amounts are integer cents throughout. No floating point.

pub mod location;
pub mod order;
pub mod product;
pub mod product_supplier;
pub mod supplier;
pub mod user;

pub use location::{Location, NewLocation};
pub use order::{NewOrder, Order, OrderLine, OrderStatus};
pub use product::{NewProduct, Product};
pub use product_supplier::{NewProductSupplier, ProductSupplier};
pub use supplier::{NewSupplier, Supplier};
pub use user::{NewUser, User};
