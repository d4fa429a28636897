use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Workflow state of an issue, spelled on the wire exactly as listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IssueStatus {
    #[serde(rename = "Incomplete")]
    Incomplete,
    #[serde(rename = "In-Progress")]
    InProgress,
    #[serde(rename = "Complete")]
    Complete,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 3] = [
        IssueStatus::Incomplete,
        IssueStatus::InProgress,
        IssueStatus::Complete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IssueStatus::Incomplete => "Incomplete",
            IssueStatus::InProgress => "In-Progress",
            IssueStatus::Complete => "Complete",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IssueStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or(())
    }
}

/// A stored issue, joined with its owner's display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: i64,
    pub user_id: Uuid,
    pub user_name: String,
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating an issue; the store assigns the rest.
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
}

/// Count of issues in one status, as reported by admin stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: IssueStatus,
    pub count: u64,
}

/// Aggregate figures for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminStats {
    pub total_users: u64,
    pub total_issues: u64,
    pub issues_by_status: Vec<StatusCount>,
}
