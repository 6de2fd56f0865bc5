//! Matrix client-server API over `reqwest`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

use crate::error::{MatrixError, Result};
use crate::sender::{ChatTransport, RoomSender};
use crate::types::{LoginResponse, MessageContent, SyncBatch, SyncResponse};

/// Logged-in Matrix account.
pub struct MatrixClient {
    http: reqwest::Client,
    homeserver: Url,
    access_token: String,
    user_id: String,
    msgtype: &'static str,
    txn_counter: AtomicU64,
    txn_prefix: u64,
}

impl fmt::Debug for MatrixClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixClient")
            .field("homeserver", &self.homeserver.as_str())
            .field("user_id", &self.user_id)
            .field("msgtype", &self.msgtype)
            .finish()
    }
}

fn parse_homeserver(homeserver: &str) -> Result<Url> {
    let invalid = |reason: String| MatrixError::InvalidHomeserver {
        homeserver: homeserver.to_string(),
        reason,
    };
    let url = Url::parse(homeserver.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    Ok(url)
}

fn endpoint(homeserver: &Url, segments: &[&str]) -> Url {
    let mut url = homeserver.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(["_matrix", "client", "v3"]).extend(segments);
    }
    url
}

async fn decode<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(MatrixError::Status { status, body });
    }
    Ok(serde_json::from_str(&body)?)
}

impl MatrixClient {
    /// Logs in with a password and returns the new access token.
    pub async fn login(
        homeserver: &str,
        username: &str,
        password: &str,
        device_id: &str,
    ) -> Result<LoginResponse> {
        let base = parse_homeserver(homeserver)?;
        let mut body = json!({
            "type": "m.login.password",
            "identifier": { "type": "m.id.user", "user": username },
            "password": password,
            "initial_device_display_name": "labrelay",
        });
        if !device_id.is_empty() {
            body["device_id"] = Value::from(device_id);
        }

        let request = reqwest::Client::new()
            .post(endpoint(&base, &["login"]))
            .json(&body);
        let login: LoginResponse = decode(request).await.map_err(|e| match e {
            MatrixError::Status { status, body } => {
                MatrixError::Login(format!("{}: {}", status, body))
            }
            other => other,
        })?;
        info!(user_id = %login.user_id, "Logged into Matrix");
        Ok(login)
    }

    /// Connects with an existing access token and looks up the account it belongs to.
    pub async fn connect(homeserver: &str, access_token: &str) -> Result<Self> {
        let mut client = Self {
            http: reqwest::Client::new(),
            homeserver: parse_homeserver(homeserver)?,
            access_token: access_token.to_string(),
            user_id: String::new(),
            msgtype: "m.notice",
            txn_counter: AtomicU64::new(0),
            txn_prefix: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
        };
        let whoami: Value = decode(client.request(Method::GET, &["account", "whoami"])).await?;
        client.user_id = whoami["user_id"].as_str().unwrap_or_default().to_string();
        debug!(user_id = %client.user_id, "Matrix session ready");
        Ok(client)
    }

    /// Send messages as `m.notice` (default) or `m.text`.
    pub fn with_notices(mut self, as_notice: bool) -> Self {
        self.msgtype = if as_notice { "m.notice" } else { "m.text" };
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.http
            .request(method, endpoint(&self.homeserver, segments))
            .bearer_auth(&self.access_token)
    }

    fn next_txn_id(&self) -> String {
        let n = self.txn_counter.fetch_add(1, Ordering::Relaxed);
        format!("labrelay.{}.{}", self.txn_prefix, n)
    }

    /// One `/sync` long-poll.
    pub async fn sync(&self, since: Option<&str>, timeout: Duration) -> Result<SyncBatch> {
        let mut request = self
            .request(Method::GET, &["sync"])
            .query(&[("timeout", timeout.as_millis().to_string())]);
        if let Some(since) = since {
            request = request.query(&[("since", since)]);
        }
        let response: SyncResponse = decode(request).await?;
        Ok(response.into_batch(&self.user_id))
    }

    /// Accepts an invite.
    pub async fn join_room(&self, room_id: &str) -> Result<()> {
        let _: Value = decode(self.request(Method::POST, &["join", room_id]).json(&json!({}))).await?;
        info!(room = %room_id, "Joined room");
        Ok(())
    }

    async fn send_content(&self, room_id: &str, content: &MessageContent) -> Result<()> {
        let txn_id = self.next_txn_id();
        let request = self
            .request(
                Method::PUT,
                &["rooms", room_id, "send", "m.room.message", &txn_id],
            )
            .json(content);
        let _: Value = decode(request).await?;
        debug!(room = %room_id, "Message sent");
        Ok(())
    }
}

#[async_trait]
impl RoomSender for MatrixClient {
    async fn send_text(&self, room_id: &str, text: &str) -> Result<()> {
        self.send_content(room_id, &MessageContent::text(self.msgtype, text))
            .await
    }

    async fn send_html(&self, room_id: &str, html: &str) -> Result<()> {
        self.send_content(room_id, &MessageContent::html(self.msgtype, html))
            .await
    }
}

#[async_trait]
impl ChatTransport for MatrixClient {
    async fn sync(&self, since: Option<&str>, timeout: Duration) -> Result<SyncBatch> {
        MatrixClient::sync(self, since, timeout).await
    }

    async fn join_room(&self, room_id: &str) -> Result<()> {
        MatrixClient::join_room(self, room_id).await
    }
}
