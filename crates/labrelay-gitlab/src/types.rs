//! GitLab resources, trimmed to the fields labrelay reads.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// The authenticated user (`GET /user`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub web_url: String,
}

/// A user as embedded in other resources.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserRef {
    pub name: String,
    #[serde(default)]
    pub username: String,
}

/// A repository commit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Commit {
    pub id: String,
    pub short_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    pub author_name: String,
    pub committed_date: DateTime<FixedOffset>,
}

/// One file of a commit diff.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileDiff {
    pub old_path: String,
    pub new_path: String,
    #[serde(default)]
    pub diff: String,
}

/// A project issue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Issue {
    pub iid: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub state: String,
    pub web_url: String,
    pub author: UserRef,
    #[serde(default)]
    pub assignees: Vec<UserRef>,
}

/// A comment on an issue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Note {
    pub id: u64,
    pub body: String,
    pub author: UserRef,
    pub created_at: DateTime<FixedOffset>,
    #[serde(default)]
    pub system: bool,
}

/// Payload for creating an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewIssue {
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// State transitions accepted by `PUT /issues/:iid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStateEvent {
    Close,
    Reopen,
}

/// Page selection for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }
}
