//! Core types for Cyber Shop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod permission;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use permission::{Permission, PermissionSet};
pub use price::{Price, format_money};
pub use status::*;
