//! Admin user management commands.
//!
//! ```bash
//! shop-cli admin create -e admin@example.com -n "Admin Name" -p 'a long password'
//! ```

use thiserror::Error;

use cyber_shop_api::services::auth::{AuthError, AuthService};
use cyber_shop_core::UserId;

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Name or email already taken.
    #[error("A user already exists with name or email: {0}")]
    UserExists(String),

    #[error("Failed to create user: {0}")]
    Auth(#[from] AuthError),
}

/// Create a user holding the all-permission Admin role.
///
/// The role is created on first use.
///
/// # Errors
///
/// Returns an error if the database is unreachable, the input is invalid
/// or the name or email is taken.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<UserId, AdminError> {
    let pool = connect().await?;

    tracing::info!("Creating admin user: {email}");

    let user = AuthService::new(&pool)
        .create_admin(name, email, password)
        .await
        .map_err(|e| match e {
            AuthError::UserAlreadyExists => AdminError::UserExists(email.to_owned()),
            other => AdminError::Auth(other),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );

    Ok(user.id)
}
