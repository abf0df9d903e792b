//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use cyber_shop_core::{Email, RoleId, UserId};

/// A shop user.
///
/// The password hash is kept out of this type so it can never end up in a
/// response.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role_id: Option<RoleId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when updating a user. `None` leaves a field unchanged.
#[derive(Debug, Default, Clone)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub password_hash: Option<String>,
    /// `Some(None)` clears the role.
    pub role_id: Option<Option<RoleId>>,
}

impl UserChanges {
    /// Whether no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.role_id.is_none()
    }
}
