//! Domain models and read models for the API.
//!
//! Aggregates (`Cart`, `Order`) live in `quickbite-core`; this module holds
//! the persisted records the server owns and the joined views it returns.

pub mod cart;
pub mod order;
pub mod product;
pub mod stats;
pub mod user;

pub use cart::{CartItemView, CartView};
pub use order::{OrderItemView, OrderView};
pub use product::{NewProduct, Product, ProductFilter, ProductUpdate};
pub use stats::{StatusCount, Stats};
pub use user::{CustomerSummary, NewUser, ProfileUpdate, User, UserSummary};
