//! GitLab webhook receiver for labrelay.
//!
//! GitLab posts events to `{path}?room=<room id>`; each event is decoded into
//! a [`WebhookEvent`], rendered into one HTML notification and sent to the
//! room through a [`labrelay_matrix::RoomSender`].

pub mod error;
pub mod events;
pub mod render;
pub mod router;
pub mod state;

pub use error::{Result, WebhookError};
pub use events::{EventKind, WebhookEvent};
pub use render::{past_tense, render, PushLayout, RenderOptions};
pub use router::{create_router, serve};
pub use state::WebhookState;
