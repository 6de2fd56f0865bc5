//! Seams between the Matrix client and the rest of the relay.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::SyncBatch;

/// Posts messages into a room.
///
/// Delivery is best effort: there is no retry, callers log failures.
#[async_trait]
pub trait RoomSender: Send + Sync {
    /// Plain text message.
    async fn send_text(&self, room_id: &str, text: &str) -> Result<()>;

    /// HTML message; the plain body is derived from the markup.
    async fn send_html(&self, room_id: &str, html: &str) -> Result<()>;
}

/// The receiving half the chat loop drives.
#[async_trait]
pub trait ChatTransport: RoomSender {
    /// One sync round starting after `since`.
    async fn sync(&self, since: Option<&str>, timeout: Duration) -> Result<SyncBatch>;

    /// Accepts an invite to `room_id`.
    async fn join_room(&self, room_id: &str) -> Result<()>;
}
