//! # Matrix Service Adapter
//!
//! Implements the `ChatProvider` trait for one Matrix room using the `matrix_sdk`.
//! Also maps Matrix room events onto the platform-neutral `IncomingMessage`.

use crate::domain::traits::ChatProvider;
use crate::domain::types::IncomingMessage;
use anyhow::Result;
use async_trait::async_trait;
use matrix_sdk::room::Room;
use matrix_sdk::ruma::EventId;
use matrix_sdk::ruma::events::relation::Replacement;
use matrix_sdk::ruma::events::room::message::{
    Relation, RoomMessageEventContent, RoomMessageEventContentWithoutRelation,
};
use std::convert::TryFrom;

#[derive(Clone)]
pub struct MatrixService {
    room: Room,
}

impl MatrixService {
    pub fn new(room: Room) -> Self {
        Self { room }
    }

    /// Helper to send markdown edits
    async fn internal_edit(&self, event_id: &str, new_content: &str) -> Result<()> {
        let event_id = <&EventId>::try_from(event_id)?;
        let mut content = RoomMessageEventContent::text_markdown(new_content);
        let replacement_content = RoomMessageEventContentWithoutRelation::from(content.clone());

        content.relates_to = Some(Relation::Replacement(Replacement::new(
            event_id.to_owned(),
            replacement_content,
        )));

        self.room.send(content).await?;
        Ok(())
    }

    /// Builds the neutral message view of a room event.
    /// Direct chats have no server; every other room counts under its homeserver.
    pub async fn incoming(&self, sender: &str, body: &str) -> IncomingMessage {
        let room_id = self.room_id();
        let is_direct = self.room.is_direct().await.unwrap_or(false);
        IncomingMessage {
            sender: sender.to_string(),
            server_id: (!is_direct).then(|| server_of(&room_id)),
            channel_id: room_id,
            content: body.to_string(),
        }
    }
}

/// Homeserver part of a room id (`!opaque:example.org` -> `example.org`).
pub fn server_of(room_id: &str) -> String {
    room_id
        .split_once(':')
        .map(|(_, server)| server.to_string())
        .unwrap_or_else(|| room_id.to_string())
}

#[async_trait]
impl ChatProvider for MatrixService {
    fn room_id(&self) -> String {
        self.room.room_id().as_str().to_string()
    }

    async fn send_message(&self, content: &str) -> Result<String, String> {
        tracing::info!("Bot sending message to {}: {}", self.room_id(), content);
        self.room
            .send(RoomMessageEventContent::text_markdown(content))
            .await
            .map(|resp| resp.event_id.to_string())
            .map_err(|e| e.to_string())
    }

    async fn edit_message(&self, message_id: &str, content: &str) -> Result<(), String> {
        self.internal_edit(message_id, content)
            .await
            .map_err(|e| e.to_string())
    }

    async fn typing(&self, active: bool) -> Result<(), String> {
        self.room
            .typing_notice(active)
            .await
            .map_err(|e| e.to_string())
    }
}
