//! Persistence seam.
//!
//! Handlers only see these traits; [`MemoryStore`] is the bundled backend.
//! Every trait object is `Send + Sync` and safe to call concurrently.

mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AdminStats, Issue, IssueStatus, NewIssue, NewUser, User};

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The named record does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait IssueRepository: Send + Sync {
    async fn create(&self, issue: NewIssue) -> StoreResult<Issue>;

    async fn get(&self, id: i64) -> StoreResult<Issue>;

    /// Issues owned by `user_id`, oldest first.
    async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Issue>>;

    async fn update_status(&self, id: i64, status: IssueStatus) -> StoreResult<Issue>;

    async fn delete(&self, id: i64) -> StoreResult<()>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the email is already registered.
    async fn create(&self, user: NewUser) -> StoreResult<User>;

    async fn get_by_email(&self, email: &str) -> StoreResult<User>;
}

#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn stats(&self) -> StoreResult<AdminStats>;
}

/// Bundle of repositories shared through application state.
#[derive(Clone)]
pub struct Storage {
    pub issues: Arc<dyn IssueRepository>,
    pub users: Arc<dyn UserRepository>,
    pub admin: Arc<dyn AdminRepository>,
}

impl Storage {
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            issues: store.clone(),
            users: store.clone(),
            admin: store,
        }
    }
}
