//! The chat loop: sync, accept invites, answer commands.

use std::sync::Arc;
use std::time::Duration;

use labrelay_matrix::{ChatEvent, ChatTransport};
use tracing::{debug, info, warn};

use crate::commands::{CommandRouter, Reply};
use crate::error::Result;

/// Long-poll timeout of one sync round.
pub const SYNC_TIMEOUT: Duration = Duration::from_secs(30);

/// Drives a [`ChatTransport`] and answers commands through a [`CommandRouter`].
pub struct RelayBot {
    transport: Arc<dyn ChatTransport>,
    router: CommandRouter,
}

impl RelayBot {
    pub fn new(transport: Arc<dyn ChatTransport>, router: CommandRouter) -> Self {
        Self { transport, router }
    }

    pub fn router(&self) -> &CommandRouter {
        &self.router
    }

    /// Runs until a sync fails.
    ///
    /// Messages already in the rooms at startup are skipped; pending invites
    /// are still accepted.
    pub async fn run(&self) -> Result<()> {
        let mut since = self.initial_sync().await?;
        info!(prefix = %self.router.settings().prefix, "Listening for commands");
        loop {
            since = self.sync_once(&since).await?;
        }
    }

    /// First sync round: returns the token to continue from.
    pub async fn initial_sync(&self) -> Result<String> {
        let batch = self.transport.sync(None, Duration::ZERO).await?;
        let skipped = batch
            .events
            .iter()
            .filter(|event| matches!(event, ChatEvent::Message { .. }))
            .count();
        debug!(skipped, "Skipping message backlog");
        for event in &batch.events {
            if let ChatEvent::Invite { .. } = event {
                self.handle_event(event).await;
            }
        }
        Ok(batch.next_batch)
    }

    /// One sync round after `since`; returns the next token.
    pub async fn sync_once(&self, since: &str) -> Result<String> {
        let batch = self.transport.sync(Some(since), SYNC_TIMEOUT).await?;
        for event in &batch.events {
            self.handle_event(event).await;
        }
        Ok(batch.next_batch)
    }

    /// Handles one event. Failures are logged, never returned.
    pub async fn handle_event(&self, event: &ChatEvent) {
        match event {
            ChatEvent::Invite { room_id } => match self.transport.join_room(room_id).await {
                Ok(()) => info!(room = %room_id, "Joined room after invite"),
                Err(e) => warn!(room = %room_id, error = %e, "Failed to join room"),
            },
            ChatEvent::Message {
                room_id,
                sender,
                body,
            } => {
                let Some(reply) = self.router.handle_message(room_id, sender, body).await else {
                    return;
                };
                for message in reply.messages() {
                    let sent = match message {
                        Reply::Text(text) => self.transport.send_text(room_id, text).await,
                        Reply::Html(html) => self.transport.send_html(room_id, html).await,
                        Reply::Many(_) => continue,
                    };
                    if let Err(e) = sent {
                        warn!(room = %room_id, error = %e, "Failed to send reply");
                        break;
                    }
                }
            }
        }
    }
}
