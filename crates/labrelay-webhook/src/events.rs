//! GitLab webhook payloads.
//!
//! Only the fields the renderers read are modelled; everything is defaulted
//! so that GitLab adding or omitting fields never rejects a delivery.

use std::fmt;

use serde::Deserialize;

/// Event kind as announced in the `X-Gitlab-Event` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Push,
    TagPush,
    Issue,
    ConfidentialIssue,
    MergeRequest,
    Note,
    ConfidentialNote,
    Pipeline,
    WikiPage,
}

impl EventKind {
    const ALL: [EventKind; 9] = [
        EventKind::Push,
        EventKind::TagPush,
        EventKind::Issue,
        EventKind::ConfidentialIssue,
        EventKind::MergeRequest,
        EventKind::Note,
        EventKind::ConfidentialNote,
        EventKind::Pipeline,
        EventKind::WikiPage,
    ];

    /// Header value GitLab sends for this kind.
    pub fn header_value(self) -> &'static str {
        match self {
            EventKind::Push => "Push Hook",
            EventKind::TagPush => "Tag Push Hook",
            EventKind::Issue => "Issue Hook",
            EventKind::ConfidentialIssue => "Confidential Issue Hook",
            EventKind::MergeRequest => "Merge Request Hook",
            EventKind::Note => "Note Hook",
            EventKind::ConfidentialNote => "Confidential Note Hook",
            EventKind::Pipeline => "Pipeline Hook",
            EventKind::WikiPage => "Wiki Page Hook",
        }
    }

    /// Parses an `X-Gitlab-Event` header value.
    pub fn from_header(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|kind| kind.header_value() == value)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_value())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Project {
    pub name: String,
    pub namespace: String,
    pub web_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct User {
    pub name: String,
    pub username: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PushCommit {
    pub id: String,
    pub message: String,
    pub url: String,
}

/// Body of push and tag push events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PushPayload {
    pub object_kind: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub checkout_sha: Option<String>,
    pub user_name: String,
    pub project: Project,
    /// Oldest first, capped by GitLab at 20 entries.
    pub commits: Vec<PushCommit>,
    pub total_commits_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IssueAttributes {
    pub iid: u64,
    pub title: String,
    pub url: String,
    pub action: String,
    pub confidential: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IssuePayload {
    pub user: User,
    pub project: Project,
    pub object_attributes: IssueAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MergeRequestAttributes {
    pub iid: u64,
    pub title: String,
    pub url: String,
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MergeRequestPayload {
    pub user: User,
    pub project: Project,
    pub object_attributes: MergeRequestAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NoteAttributes {
    pub note: String,
    pub noteable_type: String,
    pub url: String,
}

/// The issue or merge request a note is attached to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Noteable {
    pub iid: u64,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NotePayload {
    pub user: User,
    pub project: Project,
    pub object_attributes: NoteAttributes,
    pub issue: Option<Noteable>,
    pub merge_request: Option<Noteable>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineAttributes {
    pub id: u64,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub tag: bool,
    pub status: String,
    /// Seconds; `null` until the pipeline finishes.
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Build {
    pub id: u64,
    pub name: String,
    pub stage: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelinePayload {
    pub project: Project,
    pub object_attributes: PipelineAttributes,
    pub builds: Vec<Build>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WikiPageAttributes {
    pub title: String,
    pub url: String,
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WikiPagePayload {
    pub user: User,
    pub project: Project,
    pub object_attributes: WikiPageAttributes,
}

/// A decoded delivery.
///
/// Confidential issues and notes share the payload shape of their public
/// counterparts and only carry a flag.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    Push(PushPayload),
    Tag(PushPayload),
    Issue {
        payload: IssuePayload,
        confidential: bool,
    },
    MergeRequest(MergeRequestPayload),
    Comment {
        payload: NotePayload,
        confidential: bool,
    },
    Pipeline(PipelinePayload),
    WikiPage(WikiPagePayload),
}

impl WebhookEvent {
    /// Decodes `body` as the payload for `kind`.
    pub fn parse(kind: EventKind, body: &[u8]) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            EventKind::Push => WebhookEvent::Push(serde_json::from_slice(body)?),
            EventKind::TagPush => WebhookEvent::Tag(serde_json::from_slice(body)?),
            EventKind::Issue | EventKind::ConfidentialIssue => {
                let payload: IssuePayload = serde_json::from_slice(body)?;
                let confidential = kind == EventKind::ConfidentialIssue
                    || payload.object_attributes.confidential;
                WebhookEvent::Issue {
                    payload,
                    confidential,
                }
            }
            EventKind::MergeRequest => WebhookEvent::MergeRequest(serde_json::from_slice(body)?),
            EventKind::Note | EventKind::ConfidentialNote => WebhookEvent::Comment {
                payload: serde_json::from_slice(body)?,
                confidential: kind == EventKind::ConfidentialNote,
            },
            EventKind::Pipeline => WebhookEvent::Pipeline(serde_json::from_slice(body)?),
            EventKind::WikiPage => WebhookEvent::WikiPage(serde_json::from_slice(body)?),
        })
    }
}
