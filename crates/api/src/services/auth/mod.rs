//! Authentication service.
//!
//! Password sign-up and sign-in, first-user initialization and password
//! reset tokens.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use cyber_shop_core::{Email, PermissionSet, RoleId};

use crate::db::{PasswordResetRepository, RepositoryError, RoleRepository, UserRepository};
use crate::models::User;
use crate::models::role::ADMIN_ROLE_NAME;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Length of a password reset token.
const RESET_TOKEN_LENGTH: usize = 20;

/// Sign-up input.
#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role_id: Option<RoleId>,
}

/// A freshly issued reset token, to be emailed to the user.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub user: User,
    pub token: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    roles: RoleRepository<'a>,
    resets: PasswordResetRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
            roles: RoleRepository::new(pool),
            resets: PasswordResetRepository::new(pool),
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingName` if the name is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the name or email is taken.
    pub async fn sign_up(&self, account: NewAccount<'_>) -> Result<User, AuthError> {
        let name = validate_name(account.name)?;
        let email = Email::parse(account.email)?;
        validate_password(account.password)?;
        let password_hash = hash_password(account.password)?;

        let user = self
            .users
            .create(name, &email, &password_hash, account.role_id)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User signed up");
        Ok(user)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Create the very first user, holding an all-permission admin role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AlreadyInitialized` if any user exists.
    /// Otherwise fails like [`AuthService::sign_up`].
    pub async fn init_first_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        if self.users.count().await? > 0 {
            return Err(AuthError::AlreadyInitialized);
        }
        self.create_admin(name, email, password).await
    }

    /// Create a user with the all-permission admin role, creating the role
    /// if it doesn't exist yet.
    ///
    /// # Errors
    ///
    /// Fails like [`AuthService::sign_up`].
    pub async fn create_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let role = match self.roles.get_by_name(ADMIN_ROLE_NAME).await? {
            Some(role) => role,
            None => {
                self.roles
                    .create(ADMIN_ROLE_NAME, PermissionSet::all())
                    .await?
            }
        };

        self.sign_up(NewAccount {
            name,
            email,
            password,
            role_id: Some(role.id),
        })
        .await
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Issue a reset token for the account with this email.
    ///
    /// Returns `Ok(None)` for unknown emails so callers can respond the same
    /// way either way.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::Repository` if storing the token fails.
    pub async fn request_password_reset(
        &self,
        email: &str,
        lifetime_minutes: i64,
    ) -> Result<Option<ResetToken>, AuthError> {
        let email = Email::parse(email)?;
        let Some(user) = self.users.get_by_email(&email).await? else {
            tracing::info!("Password reset requested for unknown email");
            return Ok(None);
        };

        let pruned = self.resets.delete_stale().await?;
        if pruned > 0 {
            tracing::debug!(pruned, "Removed stale password reset tokens");
        }

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::minutes(lifetime_minutes);
        self.resets
            .create(user.id, &hash_token(&token), expires_at)
            .await?;

        tracing::info!(user_id = %user.id, "Password reset token issued");
        Ok(Some(ResetToken { user, token }))
    }

    /// Redeem a reset token and set a new password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetToken` if the email and token don't match
    /// a live token.
    /// Returns `AuthError::WeakPassword` if the new password doesn't meet requirements.
    pub async fn redeem_password_reset(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
    ) -> Result<User, AuthError> {
        validate_password(new_password)?;

        let email = Email::parse(email).map_err(|_| AuthError::InvalidResetToken)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        self.resets
            .redeem(user.id, &hash_token(token))
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        let password_hash = hash_password(new_password)?;
        self.users.set_password_hash(user.id, &password_hash).await?;

        tracing::info!(user_id = %user.id, "Password reset redeemed");
        Ok(user)
    }
}

fn validate_name(name: &str) -> Result<&str, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::MissingName);
    }
    Ok(name)
}

/// Check a password against the minimum requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` describing the failed requirement.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

fn generate_reset_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Reset tokens are stored as hex SHA-256 digests.
fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn test_validate_name_trims() {
        assert_eq!(validate_name("  Wes  ").unwrap(), "Wes");
        assert!(matches!(validate_name("   "), Err(AuthError::MissingName)));
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_reset_token_format() {
        let token = generate_reset_token();
        assert_eq!(token.len(), RESET_TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_reset_token());
    }

    #[test]
    fn test_hash_token_is_stable_hex() {
        let hash = hash_token("abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("abc"));
        assert_ne!(hash, hash_token("abd"));
    }
}
