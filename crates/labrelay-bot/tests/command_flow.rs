//! Chat command round trip through the public API: login state, dispatch,
//! GitLab call and rendered reply.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use labrelay_bot::{CommandRouter, CommandSettings, Reply, SessionResolver};
use labrelay_gitlab::{
    ClientFactory, Commit, FileDiff, GitlabApi, GitlabError, Issue, IssueStateEvent, NewIssue,
    Note, Page, Result, User,
};
use labrelay_persistence::CredentialStore;
use tempfile::tempdir;

const ROOM: &str = "!ops:example.org";
const SENDER: &str = "@jane:example.org";

/// Knows one user and one commit; counts every call.
#[derive(Default)]
struct FakeGitlab {
    calls: AtomicUsize,
}

impl FakeGitlab {
    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn missing<T>(&self) -> Result<T> {
        self.hit();
        Err(GitlabError::NotFound("404 Not found".to_string()))
    }
}

#[async_trait]
impl GitlabApi for FakeGitlab {
    async fn current_user(&self) -> Result<User> {
        self.hit();
        Ok(User {
            id: 1,
            username: "jane".to_string(),
            name: "Jane".to_string(),
            web_url: "https://gitlab.example.org/jane".to_string(),
        })
    }

    async fn get_commit(&self, project: &str, sha: &str) -> Result<Commit> {
        self.hit();
        assert_eq!((project, sha), ("myorg/myrepo", "abc1234"));
        Ok(Commit {
            id: "abc1234ffee00112233445566778899aabbccdd".to_string(),
            short_id: "abc1234".to_string(),
            title: "Fix bug".to_string(),
            message: "Fix bug\n\nDetails".to_string(),
            author_name: "Jane".to_string(),
            committed_date: DateTime::parse_from_rfc3339("2024-03-01T10:15:30+00:00").unwrap(),
        })
    }

    async fn get_commit_diff(&self, _project: &str, _sha: &str) -> Result<Vec<FileDiff>> {
        self.missing()
    }

    async fn list_commits(&self, _project: &str, _page: Page) -> Result<Vec<Commit>> {
        self.missing()
    }

    async fn get_issue(&self, _project: &str, _iid: u64) -> Result<Issue> {
        self.missing()
    }

    async fn create_issue(&self, _project: &str, _issue: &NewIssue) -> Result<Issue> {
        self.missing()
    }

    async fn update_issue_state(
        &self,
        _project: &str,
        _iid: u64,
        _event: IssueStateEvent,
    ) -> Result<Issue> {
        self.missing()
    }

    async fn list_issue_notes(&self, _project: &str, _iid: u64, _page: Page) -> Result<Vec<Note>> {
        self.missing()
    }

    async fn create_issue_note(&self, _project: &str, _iid: u64, _body: &str) -> Result<Note> {
        self.missing()
    }
}

struct FakeFactory {
    api: Arc<FakeGitlab>,
}

impl ClientFactory for FakeFactory {
    fn connect(&self, _token: &str) -> Arc<dyn GitlabApi> {
        self.api.clone()
    }

    fn domain(&self) -> &str {
        "https://gitlab.example.org"
    }

    fn host(&self) -> &str {
        "gitlab.example.org"
    }
}

fn router(store: Arc<CredentialStore>, api: Arc<FakeGitlab>) -> CommandRouter {
    CommandRouter::new(
        SessionResolver::new(store, Arc::new(FakeFactory { api })),
        CommandSettings::default(),
    )
}

#[tokio::test]
async fn test_show_requires_login_then_renders_commit() {
    let dir = tempdir().unwrap();
    let store = Arc::new(CredentialStore::load(dir.path().join("tokens.json")).unwrap());
    let api = Arc::new(FakeGitlab::default());
    let router = router(store.clone(), api.clone());

    let reply = router
        .handle_message(ROOM, SENDER, "!gitlab show myorg/myrepo abc1234")
        .await
        .unwrap();
    assert_eq!(
        reply,
        Reply::html(
            "That command can only be used if you're logged in.\n\
             Try <code>!gitlab login &lt;access token&gt;</code>"
        )
    );
    assert_eq!(api.calls.load(Ordering::SeqCst), 0);

    store.put(SENDER, "glpat-jane");
    let reply = router
        .handle_message(ROOM, SENDER, "!gitlab show myorg/myrepo abc1234")
        .await
        .unwrap();
    let Reply::Html(body) = reply else {
        panic!("expected an HTML reply");
    };
    assert!(body.contains("Commit abc1234"));
    assert!(body.contains("by Jane"));
    assert!(body.contains("<blockquote>Fix bug<br/><br/>Details</blockquote>"));
    assert_eq!(api.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_login_persists_across_restarts() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tokens.json");
    let api = Arc::new(FakeGitlab::default());

    let store = Arc::new(CredentialStore::load(&path).unwrap());
    let reply = router(store, api.clone())
        .handle_message(ROOM, SENDER, "!gitlab login glpat-jane")
        .await
        .unwrap();
    assert_eq!(
        reply,
        Reply::text("Successfully logged into GitLab at gitlab.example.org as Jane")
    );

    let reloaded = Arc::new(CredentialStore::load(&path).unwrap());
    assert_eq!(reloaded.get(SENDER).as_deref(), Some("glpat-jane"));
    let reply = router(reloaded, api)
        .handle_message(ROOM, SENDER, "!gitlab issue read myorg/myrepo 3")
        .await;
    assert_eq!(reply, Some(Reply::text("Issue or repository not found.")));
}
