//! # AI Chat Command
//!
//! `!chat <prompt>` asks the language model, remembering each user's recent exchanges.
//! `!chat reset` forgets them and `!chat history` reports how much is remembered.
//! Without an API key the module stays loaded but only answers with a hint.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::clock::SharedClock;
use crate::application::dispatcher::MessageHandler;
use crate::application::history::ConversationStore;
use crate::application::module::{BotModule, ModuleContext};
use crate::domain::paths::CHAT_HISTORY_FILE;
use crate::domain::traits::{ChatProvider, LlmProvider};
use crate::domain::types::{ChatMessage, IncomingMessage, MessageRole};
use crate::infrastructure::openai::OpenAiProvider;
use crate::interface::modules::{edit, reply};
use crate::strings::messages;

pub const NAME: &str = "chatgpt";
pub const DESCRIPTION: &str = "ChatGPT integration command (!chat <prompt>)";

pub fn factory(ctx: &ModuleContext) -> Result<Box<dyn BotModule>> {
    let options = ctx.options();
    let provider = options
        .openai_api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(|key| {
            Arc::new(OpenAiProvider::new(
                key,
                options.openai_endpoint.as_deref(),
                &options.openai_model,
            )) as Arc<dyn LlmProvider>
        });
    Ok(Box::new(ChatModule::with_provider(ctx, provider)))
}

pub struct ChatModule {
    ctx: ModuleContext,
    provider: Option<Arc<dyn LlmProvider>>,
    history: Option<Arc<Mutex<ConversationStore>>>,
}

impl ChatModule {
    pub fn with_provider(ctx: &ModuleContext, provider: Option<Arc<dyn LlmProvider>>) -> Self {
        Self {
            ctx: ctx.clone(),
            provider,
            history: None,
        }
    }
}

/// Turns a provider error into the reply shown to the user.
pub fn describe_error(err: &str) -> String {
    let lower = err.to_lowercase();
    if lower.contains("429") || lower.contains("rate limit") {
        messages::CHAT_RATE_LIMITED.to_string()
    } else if lower.contains("quota") || lower.contains("billing") {
        messages::chat_quota_exceeded(err)
    } else if lower.contains("401") || (lower.contains("invalid") && lower.contains("key")) {
        messages::chat_invalid_key(err)
    } else {
        messages::chat_failed(err)
    }
}

struct ChatCommand {
    provider: Option<Arc<dyn LlmProvider>>,
    history: Arc<Mutex<ConversationStore>>,
    max_pairs: usize,
    clock: SharedClock,
}

impl ChatCommand {
    async fn reset(&self, user: &str, chat: &dyn ChatProvider) -> Result<()> {
        let cleared = self.history.lock().await.clear(user, self.clock.now());
        let text = if cleared {
            messages::CHAT_RESET
        } else {
            messages::CHAT_NOTHING_TO_RESET
        };
        reply(chat, text).await?;
        Ok(())
    }

    async fn history(&self, user: &str, chat: &dyn ChatProvider) -> Result<()> {
        let stats = self.history.lock().await.stats(user);
        let text = match stats {
            Some(stats) => messages::chat_history_stats(
                stats.exchanges,
                self.max_pairs,
                &stats.last_interaction.format("%Y-%m-%d %H:%M UTC").to_string(),
            ),
            None => messages::CHAT_NO_HISTORY.to_string(),
        };
        reply(chat, &text).await?;
        Ok(())
    }

    async fn ask(
        &self,
        provider: &dyn LlmProvider,
        user: &str,
        prompt: &str,
        chat: &dyn ChatProvider,
    ) -> Result<()> {
        let mut conversation = self.history.lock().await.messages(user, self.clock.now());
        conversation.push(ChatMessage::user(prompt));

        let pending = reply(chat, &messages::chat_thinking(prompt)).await?;
        if let Err(e) = chat.typing(true).await {
            tracing::debug!("Failed to start typing notice: {}", e);
        }
        let outcome = provider.completion(&conversation).await;
        if let Err(e) = chat.typing(false).await {
            tracing::debug!("Failed to stop typing notice: {}", e);
        }

        let text = match outcome {
            Ok(answer) if answer.trim().is_empty() => messages::CHAT_EMPTY_RESPONSE.to_string(),
            Ok(answer) => {
                {
                    let mut history = self.history.lock().await;
                    let now = self.clock.now();
                    history.append(user, MessageRole::User, prompt, now);
                    history.append(user, MessageRole::Assistant, answer.clone(), now);
                }
                messages::chat_response(&answer, provider.model())
            }
            Err(e) => {
                tracing::error!("Chat completion for {} failed: {}", user, e);
                describe_error(&e)
            }
        };
        edit(chat, &pending, &text).await
    }
}

#[async_trait]
impl MessageHandler for ChatCommand {
    async fn handle(
        &self,
        message: &IncomingMessage,
        args: &str,
        chat: &dyn ChatProvider,
    ) -> Result<()> {
        let prompt = args.trim();
        let user = message.sender.as_str();

        match prompt.to_lowercase().as_str() {
            "" => {
                reply(chat, messages::CHAT_USAGE).await?;
                Ok(())
            }
            "reset" => self.reset(user, chat).await,
            "history" => self.history(user, chat).await,
            _ => match &self.provider {
                Some(provider) => self.ask(provider.as_ref(), user, prompt, chat).await,
                None => {
                    reply(chat, messages::CHAT_DISABLED).await?;
                    Ok(())
                }
            },
        }
    }
}

#[async_trait]
impl BotModule for ChatModule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    async fn setup(&mut self) -> Result<()> {
        let options = self.ctx.options();
        if self.provider.is_none() {
            tracing::warn!("openai_api_key not configured; !chat will only reply with a hint");
        }

        let store = ConversationStore::load(
            self.ctx.dataset(CHAT_HISTORY_FILE),
            options.chat_system_prompt.clone(),
            options.chat_max_pairs,
            options.chat_history_retention()?,
        )?;
        tracing::info!("Loaded chat history for {} user(s)", store.users());
        let history = Arc::new(Mutex::new(store));

        let command = ChatCommand {
            provider: self.provider.clone(),
            history: history.clone(),
            max_pairs: options.chat_max_pairs,
            clock: self.ctx.clock.clone(),
        };
        self.ctx
            .dispatcher
            .add_command(NAME, "chat", Arc::new(command))
            .await?;
        self.history = Some(history);
        Ok(())
    }

    async fn teardown(&mut self) -> Result<()> {
        self.ctx.dispatcher.unregister_owner(NAME).await;
        self.history = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{RecordingChat, ROOM, SENDER, message, test_context};
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    struct FakeLlm {
        seen: StdMutex<Vec<Vec<ChatMessage>>>,
        answer: Result<String, String>,
    }

    impl FakeLlm {
        fn answering(answer: Result<&str, &str>) -> Arc<Self> {
            Arc::new(Self {
                seen: StdMutex::new(Vec::new()),
                answer: answer.map(str::to_string).map_err(str::to_string),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for FakeLlm {
        async fn completion(&self, messages: &[ChatMessage]) -> Result<String, String> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.answer.clone()
        }

        fn model(&self) -> &str {
            "fake-model"
        }
    }

    async fn setup(dir: &TempDir, llm: Option<Arc<FakeLlm>>) -> (ModuleContext, ChatModule) {
        let ctx = test_context(dir.path());
        let provider = llm.map(|l| l as Arc<dyn LlmProvider>);
        let mut module = ChatModule::with_provider(&ctx, provider);
        module.setup().await.unwrap();
        (ctx, module)
    }

    #[tokio::test]
    async fn test_conversation_is_remembered() {
        let dir = TempDir::new().unwrap();
        let llm = FakeLlm::answering(Ok("Paris"));
        let (ctx, _module) = setup(&dir, Some(llm.clone())).await;

        let chat = RecordingChat::new(ROOM);
        ctx.dispatcher
            .dispatch(&message("!chat capital of France?"), &chat)
            .await;
        assert!(chat.last().unwrap().contains("Paris"));
        assert!(chat.last().unwrap().contains("fake-model"));

        ctx.dispatcher.dispatch(&message("!chat and Spain?"), &chat).await;
        let seen = llm.seen.lock().unwrap().clone();
        assert_eq!(seen[0].len(), 2);
        assert_eq!(seen[1].len(), 4);
        assert_eq!(seen[1][0].role, MessageRole::System);
        assert_eq!(seen[1][2], ChatMessage::assistant("Paris"));
        assert_eq!(seen[1][3], ChatMessage::user("and Spain?"));

        ctx.dispatcher.dispatch(&message("!chat history"), &chat).await;
        assert!(chat.last().unwrap().contains("**2** / 10"));

        let raw = std::fs::read_to_string(dir.path().join(CHAT_HISTORY_FILE)).unwrap();
        assert!(raw.contains(SENDER));
    }

    #[tokio::test]
    async fn test_typing_failure_does_not_block_the_answer() {
        let dir = TempDir::new().unwrap();
        let llm = FakeLlm::answering(Ok("Paris"));
        let (ctx, _module) = setup(&dir, Some(llm.clone())).await;

        let chat = RecordingChat::without_typing(ROOM);
        ctx.dispatcher
            .dispatch(&message("!chat capital of France?"), &chat)
            .await;
        assert_eq!(chat.sent().len(), 1);
        assert!(chat.last().unwrap().contains("Paris"));

        ctx.dispatcher.dispatch(&message("!chat history"), &chat).await;
        assert!(chat.last().unwrap().contains("**1** / 10"));
    }

    #[tokio::test]
    async fn test_reset_and_history_without_key() {
        let dir = TempDir::new().unwrap();
        let (ctx, _module) = setup(&dir, None).await;

        let chat = RecordingChat::new(ROOM);
        ctx.dispatcher.dispatch(&message("!chat hello"), &chat).await;
        assert_eq!(chat.last().unwrap(), messages::CHAT_DISABLED);

        ctx.dispatcher.dispatch(&message("!chat"), &chat).await;
        assert_eq!(chat.last().unwrap(), messages::CHAT_USAGE);

        ctx.dispatcher.dispatch(&message("!chat history"), &chat).await;
        assert_eq!(chat.last().unwrap(), messages::CHAT_NO_HISTORY);

        ctx.dispatcher.dispatch(&message("!chat RESET"), &chat).await;
        assert_eq!(chat.last().unwrap(), messages::CHAT_NOTHING_TO_RESET);
    }

    #[tokio::test]
    async fn test_reset_clears_history() {
        let dir = TempDir::new().unwrap();
        let llm = FakeLlm::answering(Ok("hi"));
        let (ctx, _module) = setup(&dir, Some(llm.clone())).await;

        let chat = RecordingChat::new(ROOM);
        ctx.dispatcher.dispatch(&message("!chat hello"), &chat).await;
        ctx.dispatcher.dispatch(&message("!chat reset"), &chat).await;
        assert_eq!(chat.last().unwrap(), messages::CHAT_RESET);

        ctx.dispatcher.dispatch(&message("!chat again"), &chat).await;
        assert_eq!(llm.seen.lock().unwrap()[1].len(), 2);
    }

    #[tokio::test]
    async fn test_failures_leave_history_untouched() {
        let dir = TempDir::new().unwrap();
        let llm = FakeLlm::answering(Err("429 rate limit: slow down"));
        let (ctx, _module) = setup(&dir, Some(llm)).await;

        let chat = RecordingChat::new(ROOM);
        ctx.dispatcher.dispatch(&message("!chat hello"), &chat).await;
        assert_eq!(chat.last().unwrap(), messages::CHAT_RATE_LIMITED);

        ctx.dispatcher.dispatch(&message("!chat history"), &chat).await;
        assert!(chat.last().unwrap().contains("**0** / 10"));
    }

    #[tokio::test]
    async fn test_empty_answer() {
        let dir = TempDir::new().unwrap();
        let (ctx, _module) = setup(&dir, Some(FakeLlm::answering(Ok("  ")))).await;

        let chat = RecordingChat::new(ROOM);
        ctx.dispatcher.dispatch(&message("!chat hello"), &chat).await;
        assert_eq!(chat.last().unwrap(), messages::CHAT_EMPTY_RESPONSE);
    }

    #[test]
    fn test_describe_error() {
        assert!(describe_error("You exceeded your current quota").contains("Quota Exceeded"));
        assert!(describe_error("401 Unauthorized: Incorrect API key").contains("Invalid API Key"));
        assert!(describe_error("Invalid API key provided").contains("Invalid API Key"));
        assert!(describe_error("connection reset").contains("Error communicating"));
    }
}
