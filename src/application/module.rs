//! # Feature Module Contract
//!
//! Every feature unit the orchestrator can load implements `BotModule`.
//! A module is constructed from a `ModuleContext` by its factory, registers its commands
//! and listeners in `setup`, and removes exactly those in `teardown`.

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::clock::SharedClock;
use crate::application::counters::SharedCounters;
use crate::application::dispatcher::Dispatcher;
use crate::domain::config::{AppConfig, ModulesConfig};
use crate::domain::paths::dataset_path;

/// Everything a module receives at construction time.
#[derive(Clone)]
pub struct ModuleContext {
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<AppConfig>,
    pub data_dir: PathBuf,
    pub clock: SharedClock,
}

impl ModuleContext {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        config: Arc<AppConfig>,
        data_dir: impl Into<PathBuf>,
        clock: SharedClock,
    ) -> Self {
        Self {
            dispatcher,
            config,
            data_dir: data_dir.into(),
            clock,
        }
    }

    pub fn options(&self) -> &ModulesConfig {
        &self.config.modules
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of a dataset file inside the shared data directory.
    pub fn dataset(&self, file: &str) -> PathBuf {
        dataset_path(&self.data_dir, file)
    }
}

#[async_trait]
pub trait BotModule: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Loads state and registers handlers with the dispatcher.
    async fn setup(&mut self) -> Result<()>;

    /// Flushes state and unregisters what `setup` registered.
    async fn teardown(&mut self) -> Result<()> {
        Ok(())
    }

    /// The counter map this module writes, if it owns one.
    fn shared_counters(&self) -> Option<SharedCounters> {
        None
    }

    /// Replaces this module's counter map with one owned by another module.
    fn attach_shared_counters(&mut self, _counters: SharedCounters) {}
}

/// Builds a module instance. Fails without side effects.
pub type ModuleFactory = fn(&ModuleContext) -> Result<Box<dyn BotModule>>;
