//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Sign-up, sign-in, first user and password reset
//! - `cart` - The add-to-cart mutation
//! - `checkout` - The checkout mutation
//! - `payments` - Stripe charges
//! - `images` - Cloudinary uploads
//! - `email` - Transactional email

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod email;
pub mod images;
pub mod payments;
