//! `reqwest` implementation of [`GitlabApi`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, trace};
use url::Url;

use crate::api::{ClientFactory, GitlabApi};
use crate::error::{GitlabError, Result};
use crate::types::{Commit, FileDiff, Issue, IssueStateEvent, NewIssue, Note, Page, User};

const USER_AGENT: &str = concat!("labrelay/", env!("CARGO_PKG_VERSION"));

/// Validated GitLab instance plus a shared HTTP connection pool.
#[derive(Debug, Clone)]
pub struct GitlabConnector {
    http: reqwest::Client,
    domain: String,
    host: String,
    api_base: Url,
}

impl GitlabConnector {
    /// Validates `domain` (e.g. `https://gitlab.com`) and prepares the pool.
    pub fn new(domain: &str) -> Result<Self> {
        let invalid = |reason: String| GitlabError::InvalidDomain {
            domain: domain.to_string(),
            reason,
        };

        let trimmed = domain.trim().trim_end_matches('/');
        let base = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {:?}", base.scheme())));
        }
        let host = base
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?
            .to_string();
        let api_base =
            Url::parse(&format!("{}/api/v4", trimmed)).map_err(|e| invalid(e.to_string()))?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GitlabError::Http(e.to_string()))?;

        Ok(Self {
            http,
            domain: trimmed.to_string(),
            host,
            api_base,
        })
    }

    /// A concrete client for `token`.
    pub fn client(&self, token: &str) -> GitlabClient {
        GitlabClient {
            http: self.http.clone(),
            api_base: self.api_base.clone(),
            token: token.to_string(),
        }
    }
}

impl ClientFactory for GitlabConnector {
    fn connect(&self, token: &str) -> Arc<dyn GitlabApi> {
        Arc::new(self.client(token))
    }

    fn domain(&self) -> &str {
        &self.domain
    }

    fn host(&self) -> &str {
        &self.host
    }
}

/// GitLab client bound to one access token.
#[derive(Clone)]
pub struct GitlabClient {
    http: reqwest::Client,
    api_base: Url,
    token: String,
}

impl fmt::Debug for GitlabClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitlabClient")
            .field("api_base", &self.api_base.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

impl GitlabClient {
    /// Shorthand for a one-off client without a shared pool.
    pub fn new(domain: &str, token: &str) -> Result<Self> {
        Ok(GitlabConnector::new(domain)?.client(token))
    }

    /// API URL for the given path segments. Each segment is percent-encoded,
    /// so `group/project` becomes `group%2Fproject`.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        trace!(method = %method, url = %url, "GitLab request");
        self.http
            .request(method, url)
            .header("PRIVATE-TOKEN", &self.token)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = %status, "GitLab request failed");
            return Err(GitlabError::from_status(status, &body));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl GitlabApi for GitlabClient {
    async fn current_user(&self) -> Result<User> {
        self.send(self.request(Method::GET, &["user"])).await
    }

    async fn get_commit(&self, project: &str, sha: &str) -> Result<Commit> {
        let segments = ["projects", project, "repository", "commits", sha];
        self.send(self.request(Method::GET, &segments)).await
    }

    async fn get_commit_diff(&self, project: &str, sha: &str) -> Result<Vec<FileDiff>> {
        let segments = ["projects", project, "repository", "commits", sha, "diff"];
        self.send(self.request(Method::GET, &segments)).await
    }

    async fn list_commits(&self, project: &str, page: Page) -> Result<Vec<Commit>> {
        let segments = ["projects", project, "repository", "commits"];
        let request = self
            .request(Method::GET, &segments)
            .query(&[("page", page.page), ("per_page", page.per_page)]);
        self.send(request).await
    }

    async fn get_issue(&self, project: &str, iid: u64) -> Result<Issue> {
        let iid = iid.to_string();
        self.send(self.request(Method::GET, &["projects", project, "issues", &iid]))
            .await
    }

    async fn create_issue(&self, project: &str, issue: &NewIssue) -> Result<Issue> {
        let request = self
            .request(Method::POST, &["projects", project, "issues"])
            .json(issue);
        self.send(request).await
    }

    async fn update_issue_state(
        &self,
        project: &str,
        iid: u64,
        event: IssueStateEvent,
    ) -> Result<Issue> {
        let iid = iid.to_string();
        let request = self
            .request(Method::PUT, &["projects", project, "issues", &iid])
            .json(&json!({ "state_event": event }));
        self.send(request).await
    }

    async fn list_issue_notes(&self, project: &str, iid: u64, page: Page) -> Result<Vec<Note>> {
        let iid = iid.to_string();
        let request = self
            .request(Method::GET, &["projects", project, "issues", &iid, "notes"])
            .query(&[
                ("page", page.page.to_string()),
                ("per_page", page.per_page.to_string()),
                ("sort", "desc".to_string()),
                ("order_by", "created_at".to_string()),
            ]);
        self.send(request).await
    }

    async fn create_issue_note(&self, project: &str, iid: u64, body: &str) -> Result<Note> {
        let iid = iid.to_string();
        let request = self
            .request(Method::POST, &["projects", project, "issues", &iid, "notes"])
            .json(&json!({ "body": body }));
        self.send(request).await
    }
}
