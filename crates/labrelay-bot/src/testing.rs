//! Test doubles for the GitLab seam.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::DateTime;
use labrelay_gitlab::{
    ClientFactory, Commit, FileDiff, GitlabApi, GitlabError, Issue, IssueStateEvent, NewIssue,
    Note, Page, Result, User, UserRef,
};

pub const DOMAIN: &str = "https://gitlab.example.org";
pub const HOST: &str = "gitlab.example.org";

/// Records every call and answers from canned data.
#[derive(Default)]
pub struct MockGitlab {
    pub calls: Mutex<Vec<String>>,
    /// When set, every call fails with this error.
    pub error: Option<fn() -> GitlabError>,
    pub user: Option<User>,
    pub commit: Option<Commit>,
    pub diffs: Option<Vec<FileDiff>>,
    pub commits: Option<Vec<Commit>>,
    pub issue: Option<Issue>,
    pub notes: Option<Vec<Note>>,
}

impl MockGitlab {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn respond<T: Clone>(&self, call: String, value: &Option<T>) -> Result<T> {
        self.calls.lock().unwrap().push(call);
        if let Some(make_error) = self.error {
            return Err(make_error());
        }
        value
            .clone()
            .ok_or_else(|| GitlabError::NotFound("no canned response".to_string()))
    }
}

#[async_trait]
impl GitlabApi for MockGitlab {
    async fn current_user(&self) -> Result<User> {
        self.respond("current_user".to_string(), &self.user)
    }

    async fn get_commit(&self, project: &str, sha: &str) -> Result<Commit> {
        self.respond(format!("get_commit {} {}", project, sha), &self.commit)
    }

    async fn get_commit_diff(&self, project: &str, sha: &str) -> Result<Vec<FileDiff>> {
        self.respond(format!("get_commit_diff {} {}", project, sha), &self.diffs)
    }

    async fn list_commits(&self, project: &str, page: Page) -> Result<Vec<Commit>> {
        let call = format!("list_commits {} {} {}", project, page.page, page.per_page);
        self.respond(call, &self.commits)
    }

    async fn get_issue(&self, project: &str, iid: u64) -> Result<Issue> {
        self.respond(format!("get_issue {} {}", project, iid), &self.issue)
    }

    async fn create_issue(&self, project: &str, issue: &NewIssue) -> Result<Issue> {
        let call = format!(
            "create_issue {} {:?} {:?}",
            project, issue.title, issue.description
        );
        self.respond(call, &self.issue)
    }

    async fn update_issue_state(
        &self,
        project: &str,
        iid: u64,
        event: IssueStateEvent,
    ) -> Result<Issue> {
        let call = format!("update_issue_state {} {} {:?}", project, iid, event);
        self.respond(call, &self.issue)
    }

    async fn list_issue_notes(&self, project: &str, iid: u64, page: Page) -> Result<Vec<Note>> {
        let call = format!(
            "list_issue_notes {} {} {} {}",
            project, iid, page.page, page.per_page
        );
        self.respond(call, &self.notes)
    }

    async fn create_issue_note(&self, project: &str, iid: u64, body: &str) -> Result<Note> {
        let call = format!("create_issue_note {} {} {:?}", project, iid, body);
        self.respond(call, &self.notes.as_ref().and_then(|n| n.first().cloned()))
    }
}

/// Hands out the same mock for every token and remembers the tokens.
pub struct MockFactory {
    pub api: Arc<MockGitlab>,
    pub tokens: Mutex<Vec<String>>,
}

impl MockFactory {
    pub fn new(api: MockGitlab) -> Self {
        Self {
            api: Arc::new(api),
            tokens: Mutex::new(Vec::new()),
        }
    }
}

impl ClientFactory for MockFactory {
    fn connect(&self, token: &str) -> Arc<dyn GitlabApi> {
        self.tokens.lock().unwrap().push(token.to_string());
        self.api.clone()
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn host(&self) -> &str {
        HOST
    }
}

pub fn user(name: &str, username: &str) -> User {
    User {
        id: 1,
        username: username.to_string(),
        name: name.to_string(),
        web_url: format!("{}/{}", DOMAIN, username),
    }
}

pub fn user_ref(name: &str) -> UserRef {
    UserRef {
        name: name.to_string(),
        username: name.to_lowercase(),
    }
}

pub fn commit(short_id: &str, author: &str, message: &str) -> Commit {
    Commit {
        id: format!("{}0000000000000000000000000000000000", short_id),
        short_id: short_id.to_string(),
        title: message.lines().next().unwrap_or_default().to_string(),
        message: message.to_string(),
        author_name: author.to_string(),
        committed_date: DateTime::parse_from_rfc3339("2024-03-01T10:15:30+00:00").unwrap(),
    }
}

pub fn issue(iid: u64, title: &str, assignees: &[&str], description: &str) -> Issue {
    Issue {
        iid,
        title: title.to_string(),
        description: Some(description.to_string()),
        state: "opened".to_string(),
        web_url: format!("{}/myorg/myrepo/-/issues/{}", DOMAIN, iid),
        author: user_ref("Jane"),
        assignees: assignees.iter().map(|name| user_ref(name)).collect(),
    }
}

pub fn note(id: u64, author: &str, body: &str, created_at: &str) -> Note {
    Note {
        id,
        body: body.to_string(),
        author: user_ref(author),
        created_at: DateTime::parse_from_rfc3339(created_at).unwrap(),
        system: false,
    }
}
