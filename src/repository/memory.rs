//! In-memory user repository for tests and database-less development runs

use super::UserRepository;
use crate::{
    auth::jwt::PrincipalId,
    error::AppError,
    models::user::{NewUser, User},
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Store {
    next_id: PrincipalId,
    users: HashMap<PrincipalId, User>,
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    store: RwLock<Store>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let store = self.store.read().await;
        Ok(store.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<User>, AppError> {
        Ok(self.store.read().await.users.get(&id).cloned())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, AppError> {
        let store = self.store.read().await;
        Ok(store.users.values().any(|u| u.email == email))
    }

    async fn insert(&self, user: NewUser) -> Result<User, AppError> {
        // Uniqueness check and insert under one write lock
        let mut store = self.store.write().await;
        if store.users.values().any(|u| u.email == user.email) {
            return Err(AppError::DuplicateCredential);
        }

        store.next_id += 1;
        let created = User {
            id: store.next_id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        store.users.insert(created.id, created.clone());

        tracing::debug!(user_id = created.id, "User stored in memory");
        Ok(created)
    }
}
