use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const USERS: &str = "users";

/// Explicit projection so row decoding never depends on table column order.
pub const USER_COLUMNS: &str = "id, email, password, name, role, is_active, refresh_token, \
     token_expiry, created_at, updated_at, deleted_at, created_by, updated_by, deleted_by";

/// A row of `users`. Credentials never serialize.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Password hash.
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
    pub role: String,
    pub is_active: bool,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing)]
    pub token_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<Uuid>,
}

kratify_db::impl_from_row!(User {
    id,
    email,
    password,
    name,
    role,
    is_active,
    refresh_token,
    token_expiry,
    created_at,
    updated_at,
    deleted_at,
    created_by,
    updated_by,
    deleted_by,
});

/// Input for [`crate::UserRepository::create`]. `password` must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
    /// Falls back to the column default when `None`.
    pub role: Option<String>,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.password.is_none()
            && self.role.is_none()
            && self.is_active.is_none()
    }
}
