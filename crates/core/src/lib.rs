//! QuickBite Core - Domain library for the ordering backend.
//!
//! This crate holds the rules of the system, shared by the HTTP server, the
//! CLI and the integration tests:
//!
//! - [`types`] - Newtype ids, emails, money, and the status/role/payment labels
//! - [`cart`] - The per-user cart aggregate
//! - [`order`] - Checkout snapshots and the order status workflow
//! - [`policy`] - Role/action authorization
//!
//! # Architecture
//!
//! The core crate contains only types and rules - no I/O, no database access,
//! no HTTP. Enable the `postgres` feature for `sqlx` encodings of the types.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod order;
pub mod policy;
pub mod types;

pub use cart::{Cart, CartError, CartLine, MAX_LINE_QUANTITY, QuantityChange};
pub use order::{
    DeliveryDetails, NewOrder, Order, OrderError, OrderLine, TransitionPolicy, check_transition,
};
pub use policy::{Action, PolicyError, Principal, Subject, authorize, can_perform};
pub use types::*;
