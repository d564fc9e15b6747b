#![recursion_limit = "256"]
//! # Main Entry Point
//!
//! Wires the bot together:
//! - Domain: Configuration and Types
//! - Infrastructure: Matrix, HTTP providers, Backup storage
//! - Application: Dispatcher, Module Registry, Keyed Stores
//! - Interface: Feature Modules
//!

mod application;
mod domain;
mod infrastructure;
mod interface;
mod strings;

use anyhow::{Context, Result};
use clap::Parser;
use matrix_sdk::{
    Client,
    config::SyncSettings,
    room::Room,
    ruma::events::room::{
        member::{MembershipState, StrippedRoomMemberEvent},
        message::{MessageType, SyncRoomMessageEvent},
    },
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::application::clock::SystemClock;
use crate::application::dispatcher::Dispatcher;
use crate::application::module::ModuleContext;
use crate::application::registry::Orchestrator;
use crate::domain::config::AppConfig;
use crate::domain::paths::SESSION_LOG_FILE;
use crate::infrastructure::matrix::MatrixService;
use crate::interface::modules::builtin_registry;

/// Modular Matrix chat bot.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "data/config.yaml")]
    config: PathBuf,

    /// Data directory (overrides system.data_dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load Configuration
    let mut config = AppConfig::load(&args.config)?;
    if let Some(dir) = &args.data_dir {
        config.system.data_dir = dir.to_string_lossy().to_string();
    }
    let data_dir = config.data_dir();
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    // 2. Logging Setup
    // Clear previous session log
    let log_path = data_dir.join(SESSION_LOG_FILE);
    if log_path.exists() {
        let _ = fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(&data_dir, SESSION_LOG_FILE);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(
            "info,matrix_sdk=warn,matrix_sdk_base=warn,matrix_sdk_crypto=error,ruma=warn,hyper=warn",
        )
    });

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::info!("Starting NiceBot...");

    // 3. Modules
    let config = Arc::new(config);
    let dispatcher = Arc::new(Dispatcher::new(config.system.command_prefix.clone()));
    let context = ModuleContext::new(
        dispatcher.clone(),
        config.clone(),
        data_dir,
        Arc::new(SystemClock::new(config.system.timezone)),
    );

    let mut orchestrator = Orchestrator::new(builtin_registry(), context);
    let report = orchestrator.setup_all(&config.modules.enabled).await;
    tracing::info!(
        "Loaded {} module(s): {}",
        report.loaded.len(),
        report.loaded.join(", ")
    );
    for (name, reason) in &report.failed {
        tracing::warn!("Module {} not loaded: {}", name, reason);
    }
    tracing::info!(
        "Commands: {} ({} listener(s))",
        dispatcher.command_names().await.join(", "),
        dispatcher.listener_count().await
    );

    // 4. Matrix Setup
    let matrix = &config.services.matrix;
    let client = Client::builder()
        .homeserver_url(&matrix.homeserver)
        .build()
        .await
        .context("Failed to build Matrix client")?;

    client
        .matrix_auth()
        .login_username(&matrix.username, &matrix.password)
        .initial_device_display_name("NiceBot")
        .send()
        .await
        .context("Matrix login failed")?;
    tracing::info!("Logged in as {}", matrix.username);

    if let Some(name) = &matrix.display_name
        && let Err(e) = client.account().set_display_name(Some(name.as_str())).await
    {
        tracing::warn!("Failed to set display name: {}", e);
    }

    // 5. Event Handlers
    let start_time = std::time::SystemTime::now();
    let loop_dispatcher = dispatcher.clone();

    client.add_event_handler(move |ev: SyncRoomMessageEvent, room: Room| {
        let dispatcher = loop_dispatcher.clone();

        async move {
            let Some(original_msg) = ev.as_original() else {
                return;
            };

            // Ignore events older than start_time
            let event_time = std::time::UNIX_EPOCH
                + std::time::Duration::from_millis(ev.origin_server_ts().get().into());
            if event_time < start_time {
                return;
            }
            if original_msg.sender == room.own_user_id() {
                return;
            }

            if let MessageType::Text(text_content) = &original_msg.content.msgtype {
                tracing::debug!(
                    "Received message from {}: {}",
                    original_msg.sender,
                    text_content.body
                );
                let chat = MatrixService::new(room);
                let message = chat
                    .incoming(original_msg.sender.as_str(), &text_content.body)
                    .await;
                dispatcher.dispatch(&message, &chat).await;
            }
        }
    });

    // Handle Invites
    client.add_event_handler(|ev: StrippedRoomMemberEvent, room: Room| async move {
        if ev.content.membership == MembershipState::Invite {
            match room.join().await {
                Ok(()) => tracing::info!("Joined {}", room.room_id()),
                Err(e) => tracing::warn!("Failed to join {}: {}", room.room_id(), e),
            }
        }
    });

    // 6. Run until interrupted
    let sync_client = client.clone();
    let sync_handle = tokio::spawn(async move { sync_client.sync(SyncSettings::default()).await });

    tokio::select! {
        result = sync_handle => match result {
            Ok(Ok(())) => tracing::info!("Sync loop finished"),
            Ok(Err(e)) => tracing::error!("Sync loop failed: {}", e),
            Err(e) => tracing::error!("Sync task panicked: {}", e),
        },
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down..."),
    }

    tracing::info!("Unloading {} module(s)", orchestrator.loaded_count());
    orchestrator.teardown_all().await;
    Ok(())
}
