use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AdminRepository, IssueRepository, StoreError, StoreResult, UserRepository};
use crate::models::{AdminStats, Issue, IssueStatus, NewIssue, NewUser, StatusCount, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    user_by_email: HashMap<String, Uuid>,
    issues: BTreeMap<i64, Issue>,
    last_issue_id: i64,
}

/// Process-local store behind a single reader/writer lock.
///
/// Issue ids are assigned sequentially from 1, like a serial column.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IssueRepository for MemoryStore {
    async fn create(&self, issue: NewIssue) -> StoreResult<Issue> {
        let mut tables = self.tables.write().await;
        let user_name = tables
            .users
            .get(&issue.user_id)
            .map(|u| u.name.clone())
            .ok_or(StoreError::NotFound("user"))?;

        tables.last_issue_id += 1;
        let now = Utc::now();
        let record = Issue {
            id: tables.last_issue_id,
            user_id: issue.user_id,
            user_name,
            title: issue.title,
            description: issue.description,
            status: IssueStatus::Incomplete,
            created_at: now,
            updated_at: now,
        };
        tables.issues.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: i64) -> StoreResult<Issue> {
        self.tables
            .read()
            .await
            .issues
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound("issue"))
    }

    async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Issue>> {
        let tables = self.tables.read().await;
        Ok(tables
            .issues
            .values()
            .filter(|issue| issue.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: i64, status: IssueStatus) -> StoreResult<Issue> {
        let mut tables = self.tables.write().await;
        let issue = tables
            .issues
            .get_mut(&id)
            .ok_or(StoreError::NotFound("issue"))?;
        issue.status = status;
        issue.updated_at = Utc::now();
        Ok(issue.clone())
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .issues
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("issue"))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.user_by_email.contains_key(&user.email) {
            return Err(StoreError::Conflict("email already taken".to_string()));
        }

        let now = Utc::now();
        let record = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            permissions: user.permissions,
            created_at: now,
            updated_at: now,
        };
        tables.user_by_email.insert(record.email.clone(), record.id);
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<User> {
        let tables = self.tables.read().await;
        tables
            .user_by_email
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned()
            .ok_or(StoreError::NotFound("user"))
    }
}

#[async_trait]
impl AdminRepository for MemoryStore {
    async fn stats(&self) -> StoreResult<AdminStats> {
        let tables = self.tables.read().await;

        let mut counts: BTreeMap<IssueStatus, u64> = BTreeMap::new();
        for issue in tables.issues.values() {
            *counts.entry(issue.status).or_default() += 1;
        }

        Ok(AdminStats {
            total_users: tables.users.len() as u64,
            total_issues: tables.issues.len() as u64,
            issues_by_status: counts
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect(),
        })
    }
}
