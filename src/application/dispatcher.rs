//! # Dispatcher
//!
//! Registry of named commands and passive listeners that modules register against.
//! Every incoming message is offered to all listeners; if it starts with the command
//! prefix, the first word selects a command and the remainder becomes its arguments.
//! Handler errors are logged here and never reach the caller.

use anyhow::{Result, bail};
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::traits::ChatProvider;
use crate::domain::types::IncomingMessage;

/// A command or listener callback.
/// For commands `args` is the text after the command name; for listeners it is the
/// whole message.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(
        &self,
        message: &IncomingMessage,
        args: &str,
        chat: &dyn ChatProvider,
    ) -> Result<()>;
}

struct Registration {
    owner: String,
    handler: Arc<dyn MessageHandler>,
}

pub struct Dispatcher {
    prefix: String,
    commands: Mutex<HashMap<String, Registration>>,
    listeners: Mutex<Vec<Registration>>,
}

impl Dispatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            commands: Mutex::new(HashMap::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Registers `name` for `owner`. Fails if another registration already holds the name.
    pub async fn add_command(
        &self,
        owner: &str,
        name: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<()> {
        let mut commands = self.commands.lock().await;
        let key = name.to_lowercase();
        if let Some(existing) = commands.get(&key) {
            bail!(
                "command '{}' is already registered by module '{}'",
                name,
                existing.owner
            );
        }
        commands.insert(
            key,
            Registration {
                owner: owner.to_string(),
                handler,
            },
        );
        tracing::debug!("Registered command {}{} for {}", self.prefix, name, owner);
        Ok(())
    }

    pub async fn add_listener(&self, owner: &str, handler: Arc<dyn MessageHandler>) {
        self.listeners.lock().await.push(Registration {
            owner: owner.to_string(),
            handler,
        });
        tracing::debug!("Registered message listener for {}", owner);
    }

    /// Removes every listener `owner` registered. Returns how many were removed.
    pub async fn remove_listeners(&self, owner: &str) -> usize {
        let mut listeners = self.listeners.lock().await;
        let before = listeners.len();
        listeners.retain(|r| r.owner != owner);
        before - listeners.len()
    }

    /// Removes every command and listener `owner` registered.
    pub async fn unregister_owner(&self, owner: &str) -> usize {
        let commands_removed = {
            let mut commands = self.commands.lock().await;
            let before = commands.len();
            commands.retain(|_, r| r.owner != owner);
            before - commands.len()
        };
        commands_removed + self.remove_listeners(owner).await
    }

    pub async fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.lock().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn listener_count(&self) -> usize {
        self.listeners.lock().await.len()
    }

    /// Splits `content` into `(command, args)` if it carries the command prefix.
    pub fn parse_command<'a>(&self, content: &'a str) -> Option<(&'a str, &'a str)> {
        let rest = content.trim().strip_prefix(self.prefix.as_str())?;
        let (name, args) = match rest.find(char::is_whitespace) {
            Some(idx) => (&rest[..idx], rest[idx..].trim()),
            None => (rest, ""),
        };
        (!name.is_empty()).then_some((name, args))
    }

    /// Routes one message to listeners and, if prefixed, to its command.
    pub async fn dispatch(&self, message: &IncomingMessage, chat: &dyn ChatProvider) {
        // Handlers run without the registry locks held so they may register or await freely.
        let listeners: Vec<(String, Arc<dyn MessageHandler>)> = self
            .listeners
            .lock()
            .await
            .iter()
            .map(|r| (r.owner.clone(), r.handler.clone()))
            .collect();

        let results = join_all(
            listeners
                .iter()
                .map(|(_, handler)| handler.handle(message, &message.content, chat)),
        )
        .await;
        for ((owner, _), result) in listeners.iter().zip(results) {
            if let Err(e) = result {
                tracing::error!("Listener for {} failed: {:#}", owner, e);
            }
        }

        let Some((name, args)) = self.parse_command(&message.content) else {
            return;
        };

        let command = self
            .commands
            .lock()
            .await
            .get(&name.to_lowercase())
            .map(|r| (r.owner.clone(), r.handler.clone()));

        match command {
            Some((owner, handler)) => {
                tracing::info!(
                    "Dispatching cmd='{}' args='{}' sender='{}' module='{}'",
                    name,
                    args,
                    message.sender,
                    owner
                );
                if let Err(e) = handler.handle(message, args, chat).await {
                    tracing::error!("Command {}{} failed: {:#}", self.prefix, name, e);
                }
            }
            None => tracing::debug!("Ignoring unknown command {}{}", self.prefix, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{RecordingChat, message};

    struct Echo(&'static str);

    #[async_trait]
    impl MessageHandler for Echo {
        async fn handle(
            &self,
            _message: &IncomingMessage,
            args: &str,
            chat: &dyn ChatProvider,
        ) -> Result<()> {
            chat.send_message(&format!("{}:{}", self.0, args))
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl MessageHandler for Broken {
        async fn handle(&self, _: &IncomingMessage, _: &str, _: &dyn ChatProvider) -> Result<()> {
            bail!("boom")
        }
    }

    #[test]
    fn test_parse_command() {
        let dispatcher = Dispatcher::new("!");
        assert_eq!(dispatcher.parse_command("!stock aapl"), Some(("stock", "aapl")));
        assert_eq!(dispatcher.parse_command("  !count  "), Some(("count", "")));
        assert_eq!(
            dispatcher.parse_command("!chat  what is   rust "),
            Some(("chat", "what is   rust"))
        );
        assert_eq!(dispatcher.parse_command("! stock"), None);
        assert_eq!(dispatcher.parse_command("stock"), None);
    }

    #[tokio::test]
    async fn test_dispatch_routes_commands_and_listeners() {
        let dispatcher = Dispatcher::new("!");
        dispatcher
            .add_command("a", "ping", Arc::new(Echo("cmd")))
            .await
            .unwrap();
        dispatcher.add_listener("b", Arc::new(Echo("listen"))).await;

        let chat = RecordingChat::new("!room:x");
        dispatcher.dispatch(&message("!PING now"), &chat).await;
        dispatcher.dispatch(&message("hello"), &chat).await;

        assert_eq!(
            chat.sent(),
            vec!["listen:!PING now", "cmd:now", "listen:hello"]
        );
    }

    #[tokio::test]
    async fn test_duplicate_command_is_rejected() {
        let dispatcher = Dispatcher::new("!");
        dispatcher
            .add_command("a", "ping", Arc::new(Echo("a")))
            .await
            .unwrap();
        assert!(
            dispatcher
                .add_command("b", "ping", Arc::new(Echo("b")))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_unregister_owner_removes_only_its_handlers() {
        let dispatcher = Dispatcher::new("!");
        dispatcher
            .add_command("a", "one", Arc::new(Echo("a")))
            .await
            .unwrap();
        dispatcher
            .add_command("b", "two", Arc::new(Echo("b")))
            .await
            .unwrap();
        dispatcher.add_listener("a", Arc::new(Echo("a"))).await;

        assert_eq!(dispatcher.unregister_owner("a").await, 2);
        assert_eq!(dispatcher.command_names().await, vec!["two"]);
        assert_eq!(dispatcher.listener_count().await, 0);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_others() {
        let dispatcher = Dispatcher::new("!");
        dispatcher.add_listener("bad", Arc::new(Broken)).await;
        dispatcher.add_listener("good", Arc::new(Echo("ok"))).await;

        let chat = RecordingChat::new("!room:x");
        dispatcher.dispatch(&message("hi"), &chat).await;
        assert_eq!(chat.sent(), vec!["ok:hi"]);
    }
}
