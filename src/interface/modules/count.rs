//! # Count Command
//!
//! `!count` reports the nice tally for the current channel and server.
//! Reads the same counter map as `nice_trigger` once the orchestrator links them;
//! on its own it reads the persisted counts.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::application::counters::{NiceCounts, SharedCounters};
use crate::application::dispatcher::MessageHandler;
use crate::application::module::{BotModule, ModuleContext};
use crate::domain::paths::NICE_COUNTS_FILE;
use crate::domain::traits::ChatProvider;
use crate::domain::types::IncomingMessage;
use crate::interface::modules::reply;
use crate::strings::messages;

pub const NAME: &str = "count";
pub const DESCRIPTION: &str = "Display nice count statistics (!count)";

const BREAKDOWN_LIMIT: usize = 10;

/// The map the command currently reads; swapped when the writer's map is attached.
type CounterSlot = Arc<RwLock<Option<SharedCounters>>>;

pub fn factory(ctx: &ModuleContext) -> Result<Box<dyn BotModule>> {
    Ok(Box::new(CountModule {
        ctx: ctx.clone(),
        slot: Arc::new(RwLock::new(None)),
    }))
}

pub struct CountModule {
    ctx: ModuleContext,
    slot: CounterSlot,
}

fn current(slot: &CounterSlot) -> Option<SharedCounters> {
    match slot.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

struct CountCommand {
    slot: CounterSlot,
}

#[async_trait]
impl MessageHandler for CountCommand {
    async fn handle(
        &self,
        message: &IncomingMessage,
        _args: &str,
        chat: &dyn ChatProvider,
    ) -> Result<()> {
        let Some(counters) = current(&self.slot) else {
            return Ok(());
        };

        let text = {
            let counts = counters.lock().await;
            format_counts(&counts, message)
        };
        reply(chat, &text).await?;
        Ok(())
    }
}

pub fn format_counts(counts: &NiceCounts, message: &IncomingMessage) -> String {
    let server = message.server_key();
    let mut lines = vec![
        messages::COUNT_TITLE.to_string(),
        messages::count_channel(counts.channel_count(server, &message.channel_id)),
    ];

    if !message.is_direct() {
        lines.push(messages::count_server(counts.server_total(server)));

        let breakdown = counts.breakdown(server);
        if breakdown.len() > 1 {
            lines.push(String::new());
            lines.push(messages::COUNT_BREAKDOWN_TITLE.to_string());
            lines.extend(
                breakdown
                    .iter()
                    .take(BREAKDOWN_LIMIT)
                    .map(|(channel, count)| format!("* {}: {}", channel, count)),
            );
            if breakdown.len() > BREAKDOWN_LIMIT {
                lines.push("...".to_string());
            }
        }
    }

    lines.join("\n")
}

#[async_trait]
impl BotModule for CountModule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    async fn setup(&mut self) -> Result<()> {
        if current(&self.slot).is_none() {
            let own = NiceCounts::load(self.ctx.dataset(NICE_COUNTS_FILE)).shared();
            self.attach_shared_counters(own);
        }
        self.ctx
            .dispatcher
            .add_command(
                NAME,
                "count",
                Arc::new(CountCommand {
                    slot: self.slot.clone(),
                }),
            )
            .await
    }

    async fn teardown(&mut self) -> Result<()> {
        self.ctx.dispatcher.unregister_owner(NAME).await;
        Ok(())
    }

    fn attach_shared_counters(&mut self, counters: SharedCounters) {
        match self.slot.write() {
            Ok(mut guard) => *guard = Some(counters),
            Err(poisoned) => *poisoned.into_inner() = Some(counters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::Orchestrator;
    use crate::application::testing::{RecordingChat, ROOM, message, message_in, test_context};
    use crate::interface::modules::builtin_registry;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_count_sees_live_increments_from_nice_trigger() {
        let dir = TempDir::new().unwrap();
        let ctx = test_context(dir.path());
        let dispatcher = ctx.dispatcher.clone();
        let mut orchestrator = Orchestrator::new(builtin_registry(), ctx);
        orchestrator
            .setup_all(&["count".to_string(), "nice_trigger".to_string()])
            .await;

        let chat = RecordingChat::new(ROOM);
        dispatcher.dispatch(&message("nice"), &chat).await;
        dispatcher.dispatch(&message("nice one"), &chat).await;
        dispatcher
            .dispatch(&message_in("!other:example.org", "so nice"), &chat)
            .await;
        chat.clear();

        dispatcher.dispatch(&message("!count"), &chat).await;
        let text = chat.last().unwrap();
        assert!(text.contains("**This Channel**: **2 nices**"), "{text}");
        assert!(text.contains("**This Server**: **3 nices**"), "{text}");
        assert!(text.contains("* !room:example.org: 2"), "{text}");
    }

    #[tokio::test]
    async fn test_count_alone_reads_persisted_counts() {
        let dir = TempDir::new().unwrap();
        let mut seeded = NiceCounts::load(dir.path().join(NICE_COUNTS_FILE));
        seeded.increment("example.org", ROOM);

        let ctx = test_context(dir.path());
        let mut module = factory(&ctx).unwrap();
        module.setup().await.unwrap();

        let chat = RecordingChat::new(ROOM);
        ctx.dispatcher.dispatch(&message("!count"), &chat).await;
        let text = chat.last().unwrap();
        assert!(text.contains("**1 nice**"), "{text}");
        assert!(!text.contains("Channel Breakdown"));
    }

    #[test]
    fn test_direct_message_hides_server_lines() {
        let dir = TempDir::new().unwrap();
        let counts = NiceCounts::load(dir.path().join(NICE_COUNTS_FILE));
        let dm = IncomingMessage {
            server_id: None,
            ..message("!count")
        };
        let text = format_counts(&counts, &dm);
        assert!(text.contains("**0 nices**"));
        assert!(!text.contains("This Server"));
    }
}
