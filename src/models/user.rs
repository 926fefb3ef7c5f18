//! User domain models

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::jwt::PrincipalId;

/// User account as stored
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: PrincipalId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// User ready to be inserted (password already hashed)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// User response (without sensitive data)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserResponse {
    pub id: PrincipalId,
    pub name: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}
