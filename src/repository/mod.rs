//! Database repository layer
//!
//! The auth flows only see [`UserRepository`]; PostgreSQL and in-memory
//! implementations live behind it.

pub mod memory;
pub mod user_repo;

pub use memory::InMemoryUserRepository;
pub use user_repo::PgUserRepository;

use crate::{
    auth::jwt::PrincipalId,
    error::AppError,
    models::user::{NewUser, User},
};
use async_trait::async_trait;

/// Persistence of user records
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by (normalized) email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Find a user by id
    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<User>, AppError>;

    /// Whether an account with this email exists
    async fn exists_by_email(&self, email: &str) -> Result<bool, AppError>;

    /// Insert a user and return it with its assigned id.
    ///
    /// Returns [`AppError::DuplicateCredential`] when the email is already taken,
    /// including when another insert won the race after an `exists_by_email` check.
    async fn insert(&self, user: NewUser) -> Result<User, AppError>;
}
