//! HTTP endpoint GitLab delivers webhooks to.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::error::{Result, WebhookError};
use crate::events::{EventKind, WebhookEvent};
use crate::render::render;
use crate::state::WebhookState;

/// Header carrying the shared secret.
pub const TOKEN_HEADER: &str = "x-gitlab-token";

/// Header naming the event kind.
pub const EVENT_HEADER: &str = "x-gitlab-event";

#[derive(Debug, Deserialize)]
pub struct RoomQuery {
    room: Option<String>,
}

/// Creates the webhook router, serving `path`.
pub fn create_router(path: &str, state: WebhookState) -> Router {
    Router::new()
        .route(path, post(receive))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the webhook endpoint on an already bound listener.
pub async fn serve(listener: TcpListener, path: &str, state: WebhookState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, path = %path, "Webhook listener ready");
    }
    axum::serve(listener, create_router(path, state)).await
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// POST {path}?room=<room id>
pub async fn receive(
    State(state): State<WebhookState>,
    Query(query): Query<RoomQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode> {
    let room = query
        .room
        .filter(|room| !room.is_empty())
        .ok_or(WebhookError::MissingRoom)?;

    if !state.accepts_token(header(&headers, TOKEN_HEADER)) {
        warn!(room = %room, "Rejected webhook with invalid token");
        return Err(WebhookError::Unauthorized);
    }

    let kind_name = header(&headers, EVENT_HEADER).ok_or(WebhookError::MissingEventKind)?;
    let kind = EventKind::from_header(kind_name)
        .ok_or_else(|| WebhookError::UnknownEventKind(kind_name.to_string()))?;
    let event = WebhookEvent::parse(kind, &body)
        .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

    match render(&event, &state.render) {
        Some(message) => {
            if let Err(e) = state.sender.send_html(&room, &message).await {
                warn!(room = %room, kind = %kind, error = %e, "Dropped webhook notification");
            } else {
                debug!(room = %room, kind = %kind, "Webhook notification sent");
            }
        }
        None => debug!(room = %room, kind = %kind, "Webhook event needs no notification"),
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderOptions;
    use async_trait::async_trait;
    use axum::http::{HeaderName, HeaderValue};
    use axum_test::TestServer;
    use labrelay_matrix::{MatrixError, RoomSender};
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl RoomSender for RecordingSender {
        async fn send_text(&self, room_id: &str, text: &str) -> labrelay_matrix::Result<()> {
            self.send_html(room_id, text).await
        }

        async fn send_html(&self, room_id: &str, html: &str) -> labrelay_matrix::Result<()> {
            if self.fail {
                return Err(MatrixError::Http("homeserver unreachable".to_string()));
            }
            self.sent
                .lock()
                .await
                .push((room_id.to_string(), html.to_string()));
            Ok(())
        }
    }

    const ROOM: &str = "!room:example.org";

    fn make_server(sender: Arc<RecordingSender>, secret: &str) -> TestServer {
        let state = WebhookState::new(sender, secret, RenderOptions::default());
        TestServer::new(create_router("/webhooks", state)).unwrap()
    }

    fn event_header(value: &'static str) -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static(EVENT_HEADER),
            HeaderValue::from_static(value),
        )
    }

    fn push_body(count: u64) -> serde_json::Value {
        let commits: Vec<_> = (0..count)
            .map(|i| json!({"id": format!("{:040}", i), "message": format!("Commit {}", i)}))
            .collect();
        json!({
            "object_kind": "push",
            "ref": "refs/heads/main",
            "user_name": "Jane",
            "project": {"name": "myrepo", "namespace": "myorg", "web_url": "https://gitlab.example.org/myorg/myrepo"},
            "commits": commits,
            "total_commits_count": count
        })
    }

    #[tokio::test]
    async fn test_missing_room() {
        let sender = Arc::new(RecordingSender::default());
        let server = make_server(sender.clone(), "");
        let (name, value) = event_header("Push Hook");

        let response = server
            .post("/webhooks")
            .add_header(name, value)
            .json(&push_body(1))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.text(), "No room specified.");
        assert!(sender.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_push_is_relayed() {
        let sender = Arc::new(RecordingSender::default());
        let server = make_server(sender.clone(), "");
        let (name, value) = event_header("Push Hook");

        let response = server
            .post("/webhooks")
            .add_query_param("room", ROOM)
            .add_header(name, value)
            .json(&push_body(3))
            .await;

        response.assert_status(StatusCode::NO_CONTENT);
        let sent = sender.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ROOM);
        assert!(sent[0].1.contains("3 new commits by Jane"));
    }

    #[tokio::test]
    async fn test_secret_is_enforced() {
        let sender = Arc::new(RecordingSender::default());
        let server = make_server(sender.clone(), "s3cret");
        let (name, value) = event_header("Push Hook");

        let response = server
            .post("/webhooks")
            .add_query_param("room", ROOM)
            .add_header(name.clone(), value.clone())
            .json(&push_body(1))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let response = server
            .post("/webhooks")
            .add_query_param("room", ROOM)
            .add_header(name, value)
            .add_header(
                HeaderName::from_static(TOKEN_HEADER),
                HeaderValue::from_static("s3cret"),
            )
            .json(&push_body(1))
            .await;
        response.assert_status(StatusCode::NO_CONTENT);
        assert_eq!(sender.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_and_missing_event_kind() {
        let sender = Arc::new(RecordingSender::default());
        let server = make_server(sender.clone(), "");

        let response = server
            .post("/webhooks")
            .add_query_param("room", ROOM)
            .json(&push_body(1))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let (name, value) = event_header("Job Hook");
        let response = server
            .post("/webhooks")
            .add_query_param("room", ROOM)
            .add_header(name, value)
            .json(&json!({}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.text().contains("Job Hook"));
        assert!(sender.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let sender = Arc::new(RecordingSender::default());
        let server = make_server(sender.clone(), "");
        let (name, value) = event_header("Push Hook");

        let response = server
            .post("/webhooks")
            .add_query_param("room", ROOM)
            .add_header(name, value)
            .text("{not json")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(sender.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_issue_update_sends_nothing() {
        let sender = Arc::new(RecordingSender::default());
        let server = make_server(sender.clone(), "");
        let (name, value) = event_header("Issue Hook");

        let response = server
            .post("/webhooks")
            .add_query_param("room", ROOM)
            .add_header(name, value)
            .json(&json!({
                "user": {"name": "Jane"},
                "project": {"name": "myrepo", "namespace": "myorg"},
                "object_attributes": {"iid": 1, "title": "T", "action": "update"}
            }))
            .await;

        response.assert_status(StatusCode::NO_CONTENT);
        assert!(sender.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_still_acknowledged() {
        let sender = Arc::new(RecordingSender {
            fail: true,
            ..Default::default()
        });
        let server = make_server(sender, "");
        let (name, value) = event_header("Push Hook");

        let response = server
            .post("/webhooks")
            .add_query_param("room", ROOM)
            .add_header(name, value)
            .json(&push_body(1))
            .await;
        response.assert_status(StatusCode::NO_CONTENT);
    }
}
