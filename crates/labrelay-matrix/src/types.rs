//! Client-server API payloads, trimmed to what the relay reads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of a password login.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    pub user_id: String,
    pub access_token: String,
    #[serde(default)]
    pub device_id: String,
}

/// `m.room.message` content sent by the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageContent {
    pub msgtype: &'static str,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_body: Option<String>,
}

impl MessageContent {
    pub const HTML_FORMAT: &'static str = "org.matrix.custom.html";

    /// Plain message.
    pub fn text(msgtype: &'static str, body: &str) -> Self {
        Self {
            msgtype,
            body: body.to_string(),
            format: None,
            formatted_body: None,
        }
    }

    /// HTML message with a derived plain-text body.
    pub fn html(msgtype: &'static str, html: &str) -> Self {
        Self {
            msgtype,
            body: labrelay_core::html_to_plain(html),
            format: Some(Self::HTML_FORMAT),
            formatted_body: Some(html.to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SyncResponse {
    pub next_batch: String,
    #[serde(default)]
    pub rooms: SyncRooms,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SyncRooms {
    #[serde(default)]
    pub join: HashMap<String, JoinedRoom>,
    #[serde(default)]
    pub invite: HashMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct JoinedRoom {
    #[serde(default)]
    pub timeline: Timeline,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Timeline {
    #[serde(default)]
    pub events: Vec<RoomEvent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RoomEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub content: Value,
}

/// Something the chat loop has to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A text message posted in a joined room.
    Message {
        room_id: String,
        sender: String,
        body: String,
    },
    /// The bot was invited to a room.
    Invite { room_id: String },
}

/// One `/sync` round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncBatch {
    /// Token to pass as `since` on the next round.
    pub next_batch: String,
    pub events: Vec<ChatEvent>,
}

impl SyncResponse {
    /// Flattens the response into chat events, dropping the bot's own messages.
    pub(crate) fn into_batch(self, own_user_id: &str) -> SyncBatch {
        let mut events: Vec<ChatEvent> = self
            .rooms
            .invite
            .into_keys()
            .map(|room_id| ChatEvent::Invite { room_id })
            .collect();

        for (room_id, room) in self.rooms.join {
            for event in room.timeline.events {
                if event.kind != "m.room.message" || event.sender == own_user_id {
                    continue;
                }
                let msgtype = event.content["msgtype"].as_str().unwrap_or_default();
                if msgtype != "m.text" {
                    continue;
                }
                if let Some(body) = event.content["body"].as_str() {
                    events.push(ChatEvent::Message {
                        room_id: room_id.clone(),
                        sender: event.sender,
                        body: body.to_string(),
                    });
                }
            }
        }

        SyncBatch {
            next_batch: self.next_batch,
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sync_into_batch() {
        let response: SyncResponse = serde_json::from_value(json!({
            "next_batch": "s72595_4483",
            "rooms": {
                "join": {
                    "!room:example.org": {
                        "timeline": {
                            "events": [
                                {"type": "m.room.message", "sender": "@jane:example.org",
                                 "content": {"msgtype": "m.text", "body": "!gitlab ping"}},
                                {"type": "m.room.message", "sender": "@bot:example.org",
                                 "content": {"msgtype": "m.notice", "body": "Pong."}},
                                {"type": "m.room.member", "sender": "@jane:example.org",
                                 "content": {"membership": "join"}},
                                {"type": "m.room.message", "sender": "@jane:example.org",
                                 "content": {"msgtype": "m.image", "body": "cat.png"}}
                            ]
                        }
                    }
                },
                "invite": { "!other:example.org": {} }
            }
        }))
        .unwrap();

        let batch = response.into_batch("@bot:example.org");
        assert_eq!(batch.next_batch, "s72595_4483");
        assert_eq!(
            batch.events,
            vec![
                ChatEvent::Invite {
                    room_id: "!other:example.org".to_string()
                },
                ChatEvent::Message {
                    room_id: "!room:example.org".to_string(),
                    sender: "@jane:example.org".to_string(),
                    body: "!gitlab ping".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_empty_sync() {
        let response: SyncResponse = serde_json::from_value(json!({"next_batch": "s1"})).unwrap();
        assert!(response.into_batch("@bot:example.org").events.is_empty());
    }

    #[test]
    fn test_html_content() {
        let content = MessageContent::html("m.notice", "<b>Pong.</b>");
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value["body"], "Pong.");
        assert_eq!(value["format"], "org.matrix.custom.html");
        assert_eq!(value["formatted_body"], "<b>Pong.</b>");

        let plain = serde_json::to_value(MessageContent::text("m.text", "Pong.")).unwrap();
        assert!(plain.get("format").is_none());
    }
}
