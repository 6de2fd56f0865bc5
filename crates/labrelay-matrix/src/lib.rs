//! Matrix transport for labrelay.
//!
//! A deliberately small client-server client: password login, `/sync`
//! long-polling, invite acceptance and `m.room.message` sending. The rest of
//! the workspace only depends on the [`RoomSender`] trait.

pub mod client;
pub mod error;
pub mod sender;
pub mod types;

pub use client::MatrixClient;
pub use error::{MatrixError, Result};
pub use sender::{ChatTransport, RoomSender};
pub use types::{ChatEvent, LoginResponse, MessageContent, SyncBatch};
