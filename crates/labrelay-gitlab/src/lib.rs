//! GitLab REST client for labrelay.
//!
//! Only the handful of endpoints the chat commands need are wrapped:
//! the current user, commits and their diffs, issues and issue notes.
//!
//! - [`GitlabApi`] is the seam the command handlers are written against.
//! - [`GitlabClient`] implements it over `reqwest` for one access token.
//! - [`GitlabConnector`] validates the configured domain once and hands out
//!   per-token clients that share one connection pool.

pub mod api;
pub mod client;
pub mod error;
pub mod types;

pub use api::{ClientFactory, GitlabApi};
pub use client::{GitlabClient, GitlabConnector};
pub use error::{GitlabError, Result};
pub use types::{Commit, FileDiff, Issue, IssueStateEvent, NewIssue, Note, Page, User, UserRef};
