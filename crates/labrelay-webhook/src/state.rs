//! State shared by webhook requests.

use std::sync::Arc;

use labrelay_matrix::RoomSender;

use crate::render::RenderOptions;

/// Shared state for the webhook handler.
#[derive(Clone)]
pub struct WebhookState {
    /// Where notifications go.
    pub sender: Arc<dyn RoomSender>,
    /// Expected `X-Gitlab-Token`; empty disables the check.
    pub secret: Arc<str>,
    pub render: RenderOptions,
}

impl WebhookState {
    pub fn new(sender: Arc<dyn RoomSender>, secret: &str, render: RenderOptions) -> Self {
        Self {
            sender,
            secret: Arc::from(secret),
            render,
        }
    }

    /// Whether a delivery carrying `token` may be processed.
    pub fn accepts_token(&self, token: Option<&str>) -> bool {
        if self.secret.is_empty() {
            return true;
        }
        token.is_some_and(|token| constant_time_eq(token.as_bytes(), self.secret.as_bytes()))
    }
}

/// Byte equality whose running time does not depend on where the inputs differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}
