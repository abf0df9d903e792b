//! Domain models for the shop.
//!
//! Row types derive `sqlx::FromRow` and serialize with camelCase field names,
//! which is what the JSON API returns.

pub mod cart;
pub mod order;
pub mod product;
pub mod role;
pub mod session;
pub mod user;

pub use cart::{CartItem, CartLine, CartProduct};
pub use order::{NewOrderItem, Order, OrderItem, OrderWithItems};
pub use product::{HostedImage, NewProduct, Product, ProductChanges, ProductImage};
pub use role::Role;
pub use session::CurrentUser;
pub use user::{User, UserChanges};
