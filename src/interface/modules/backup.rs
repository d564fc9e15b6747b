//! # Backup Module
//!
//! Zips the data directory into the backup sink on a schedule and on `!backup`.
//! A background task wakes hourly and runs a backup once `backup_interval_hours` have
//! passed since the last one. Archives older than `backup_retention_days` are pruned
//! after every successful upload.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::application::clock::SharedClock;
use crate::application::dispatcher::MessageHandler;
use crate::application::module::{BotModule, ModuleContext};
use crate::domain::config::AppConfig;
use crate::domain::traits::{BackupSink, ChatProvider};
use crate::domain::types::IncomingMessage;
use crate::infrastructure::backup::{LocalDirectorySink, archive_name, build_archive};
use crate::interface::modules::reply;
use crate::strings::messages;

pub const NAME: &str = "backup";
pub const DESCRIPTION: &str = "Automatic data directory backups (!backup for admins)";

const CHECK_EVERY: Duration = Duration::from_secs(60 * 60);

pub fn factory(ctx: &ModuleContext) -> Result<Box<dyn BotModule>> {
    let sink = LocalDirectorySink::new(backup_root(ctx));
    Ok(Box::new(BackupModule::with_sink(ctx, Arc::new(sink))?))
}

/// Backup folder, resolved against the data directory when relative.
fn backup_root(ctx: &ModuleContext) -> PathBuf {
    let folder = PathBuf::from(&ctx.options().backup_folder);
    if folder.is_absolute() {
        folder
    } else {
        ctx.data_dir().join(folder)
    }
}

pub struct BackupModule {
    ctx: ModuleContext,
    job: Arc<BackupJob>,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl BackupModule {
    pub fn with_sink(ctx: &ModuleContext, sink: Arc<dyn BackupSink>) -> Result<Self> {
        let options = ctx.options();
        let job = BackupJob {
            data_dir: ctx.data_dir().to_path_buf(),
            exclude: backup_root(ctx),
            sink,
            clock: ctx.clock.clone(),
            interval: options.backup_interval()?,
            retention: options.backup_retention()?,
            last_run: Mutex::new(None),
        };
        Ok(Self {
            ctx: ctx.clone(),
            job: Arc::new(job),
            shutdown: None,
            task: None,
        })
    }
}

struct BackupJob {
    data_dir: PathBuf,
    exclude: PathBuf,
    sink: Arc<dyn BackupSink>,
    clock: SharedClock,
    interval: TimeDelta,
    retention: TimeDelta,
    last_run: Mutex<Option<DateTime<Utc>>>,
}

impl BackupJob {
    async fn is_due(&self) -> bool {
        match *self.last_run.lock().await {
            Some(last) => self.clock.now() - last >= self.interval,
            None => true,
        }
    }

    /// Builds, uploads and prunes. Returns the archive name.
    async fn run(&self) -> Result<String> {
        let started = self.clock.now();
        let name = archive_name(started);

        let data_dir = self.data_dir.clone();
        let exclude = self.exclude.clone();
        let archive = tokio::task::spawn_blocking(move || build_archive(&data_dir, Some(&exclude)))
            .await
            .context("Backup archiving task failed")??;
        let size = archive.len();

        self.sink
            .upload(&name, archive)
            .await
            .map_err(|e| anyhow!("Failed to store {}: {}", name, e))?;
        *self.last_run.lock().await = Some(started);
        tracing::info!("Backup successful: {} ({} bytes)", name, size);

        // No cutoff means nothing can be old enough to prune.
        if let Some(cutoff) = started.checked_sub_signed(self.retention) {
            match self.sink.prune(cutoff).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!("Deleted {} old backup(s)", removed),
                Err(e) => tracing::warn!("Error cleaning up old backups: {}", e),
            }
        }
        Ok(name)
    }

    async fn run_logged(&self) -> Option<String> {
        match self.run().await {
            Ok(name) => Some(name),
            Err(e) => {
                tracing::error!("Backup failed: {:#}", e);
                None
            }
        }
    }
}

async fn schedule(job: Arc<BackupJob>, on_startup: bool, mut shutdown: watch::Receiver<bool>) {
    if on_startup {
        job.run_logged().await;
    }

    let mut ticker = tokio::time::interval(CHECK_EVERY);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if job.is_due().await {
                    job.run_logged().await;
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    tracing::debug!("Backup schedule stopped");
}

struct BackupCommand {
    job: Option<Arc<BackupJob>>,
    config: Arc<AppConfig>,
}

#[async_trait]
impl MessageHandler for BackupCommand {
    async fn handle(
        &self,
        message: &IncomingMessage,
        _args: &str,
        chat: &dyn ChatProvider,
    ) -> Result<()> {
        if !self.config.is_admin(&message.sender) {
            reply(chat, messages::AUTH_DENIED).await?;
            return Ok(());
        }
        let Some(job) = &self.job else {
            reply(chat, messages::BACKUP_DISABLED).await?;
            return Ok(());
        };

        reply(chat, messages::BACKUP_STARTED).await?;
        let text = match job.run_logged().await {
            Some(name) => {
                let at = job
                    .last_run
                    .lock()
                    .await
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_default();
                messages::backup_done(&name, &at)
            }
            None => messages::BACKUP_FAILED.to_string(),
        };
        reply(chat, &text).await?;
        Ok(())
    }
}

#[async_trait]
impl BotModule for BackupModule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    async fn setup(&mut self) -> Result<()> {
        let options = self.ctx.options();
        let enabled = options.backup_enabled;

        let command = BackupCommand {
            job: enabled.then(|| self.job.clone()),
            config: self.ctx.config.clone(),
        };
        self.ctx
            .dispatcher
            .add_command(NAME, "backup", Arc::new(command))
            .await?;

        if !enabled {
            tracing::info!("Backups disabled in config");
            return Ok(());
        }

        let (tx, rx) = watch::channel(false);
        self.task = Some(tokio::spawn(schedule(
            self.job.clone(),
            options.backup_on_startup,
            rx,
        )));
        self.shutdown = Some(tx);
        tracing::info!(
            "Backups every {}h into {}",
            options.backup_interval_hours,
            self.job.exclude.display()
        );
        Ok(())
    }

    async fn teardown(&mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!("Backup schedule ended abnormally: {}", e);
        }
        self.ctx.dispatcher.unregister_owner(NAME).await;
        Ok(())
    }
}
