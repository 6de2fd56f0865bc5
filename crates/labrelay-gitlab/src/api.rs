//! Traits the chat commands are written against.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Commit, FileDiff, Issue, IssueStateEvent, NewIssue, Note, Page, User};

/// Operations on a GitLab instance, performed as one user.
///
/// `project` is a numeric ID or a `namespace/name` path.
#[async_trait]
pub trait GitlabApi: Send + Sync {
    /// `GET /user`
    async fn current_user(&self) -> Result<User>;

    /// `GET /projects/:id/repository/commits/:sha`
    async fn get_commit(&self, project: &str, sha: &str) -> Result<Commit>;

    /// `GET /projects/:id/repository/commits/:sha/diff`
    async fn get_commit_diff(&self, project: &str, sha: &str) -> Result<Vec<FileDiff>>;

    /// `GET /projects/:id/repository/commits`
    async fn list_commits(&self, project: &str, page: Page) -> Result<Vec<Commit>>;

    /// `GET /projects/:id/issues/:iid`
    async fn get_issue(&self, project: &str, iid: u64) -> Result<Issue>;

    /// `POST /projects/:id/issues`
    async fn create_issue(&self, project: &str, issue: &NewIssue) -> Result<Issue>;

    /// `PUT /projects/:id/issues/:iid` with a `state_event`.
    async fn update_issue_state(
        &self,
        project: &str,
        iid: u64,
        event: IssueStateEvent,
    ) -> Result<Issue>;

    /// `GET /projects/:id/issues/:iid/notes`, newest first.
    async fn list_issue_notes(&self, project: &str, iid: u64, page: Page) -> Result<Vec<Note>>;

    /// `POST /projects/:id/issues/:iid/notes`
    async fn create_issue_note(&self, project: &str, iid: u64, body: &str) -> Result<Note>;
}

/// Builds per-user clients for one configured GitLab instance.
pub trait ClientFactory: Send + Sync {
    /// A client that authenticates with `token`.
    fn connect(&self, token: &str) -> Arc<dyn GitlabApi>;

    /// Web base URL of the instance, without a trailing slash.
    fn domain(&self) -> &str;

    /// Host name of the instance.
    fn host(&self) -> &str;
}
