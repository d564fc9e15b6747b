//! Shared fakes for unit tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::application::clock::ManualClock;
use crate::application::dispatcher::{Dispatcher, MessageHandler};
use crate::application::module::ModuleContext;
use crate::domain::config::AppConfig;
use crate::domain::traits::ChatProvider;
use crate::domain::types::IncomingMessage;

pub const SENDER: &str = "@alice:example.org";
pub const ROOM: &str = "!room:example.org";
pub const SERVER: &str = "example.org";

/// Friday, 2024-03-01 12:00 UTC.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub fn message(content: &str) -> IncomingMessage {
    IncomingMessage {
        sender: SENDER.to_string(),
        channel_id: ROOM.to_string(),
        server_id: Some(SERVER.to_string()),
        content: content.to_string(),
    }
}

pub fn message_in(channel_id: &str, content: &str) -> IncomingMessage {
    IncomingMessage {
        channel_id: channel_id.to_string(),
        ..message(content)
    }
}

pub fn test_context(data_dir: &Path) -> ModuleContext {
    context_with(data_dir, AppConfig::default(), Arc::new(ManualClock::at(t0())))
}

pub fn context_with(data_dir: &Path, config: AppConfig, clock: Arc<ManualClock>) -> ModuleContext {
    let dispatcher = Arc::new(Dispatcher::new(config.system.command_prefix.clone()));
    ModuleContext::new(dispatcher, Arc::new(config), data_dir, clock)
}

/// Handler that does nothing.
pub struct Silent;

#[async_trait]
impl MessageHandler for Silent {
    async fn handle(&self, _: &IncomingMessage, _: &str, _: &dyn ChatProvider) -> Result<()> {
        Ok(())
    }
}

/// Chat provider that records what the bot would have shown in the room.
/// Edits replace the text of the message they target.
pub struct RecordingChat {
    room_id: String,
    messages: Mutex<Vec<(String, String)>>,
    typing_fails: bool,
}

impl RecordingChat {
    pub fn new(room_id: &str) -> Self {
        Self {
            room_id: room_id.to_string(),
            messages: Mutex::new(Vec::new()),
            typing_fails: false,
        }
    }

    /// A room where typing notices are rejected, as when the bot lacks the permission.
    pub fn without_typing(room_id: &str) -> Self {
        Self {
            typing_fails: true,
            ..Self::new(room_id)
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn last(&self) -> Option<String> {
        self.sent().pop()
    }

    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }
}

#[async_trait]
impl ChatProvider for RecordingChat {
    async fn send_message(&self, content: &str) -> Result<String, String> {
        let mut messages = self.messages.lock().unwrap();
        let id = format!("$event{}", messages.len());
        messages.push((id.clone(), content.to_string()));
        Ok(id)
    }

    async fn edit_message(&self, message_id: &str, content: &str) -> Result<(), String> {
        let mut messages = self.messages.lock().unwrap();
        match messages.iter_mut().find(|(id, _)| id == message_id) {
            Some(entry) => {
                entry.1 = content.to_string();
                Ok(())
            }
            None => Err(format!("no message {}", message_id)),
        }
    }

    async fn typing(&self, _active: bool) -> Result<(), String> {
        if self.typing_fails {
            return Err("M_FORBIDDEN".to_string());
        }
        Ok(())
    }

    fn room_id(&self) -> String {
        self.room_id.clone()
    }
}
