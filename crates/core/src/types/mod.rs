//! Core value types for QuickBite.
//!
//! Type-safe wrappers for ids, emails, money and workflow labels.

pub mod email;
pub mod id;
pub mod money;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{Money, MoneyError};
pub use status::*;
