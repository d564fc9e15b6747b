//! # Module Registry & Orchestrator
//!
//! The registry maps module names to factories; the set is fixed at startup.
//! The orchestrator owns the loaded instances and walks each through
//! `Instantiated -> SetUp -> TornDown`. A module that fails at any step is logged and
//! skipped; it never takes the others down with it.

use anyhow::{Result, anyhow};
use std::collections::BTreeMap;

use crate::application::module::{BotModule, ModuleContext, ModuleFactory};

pub const COUNTER_WRITER: &str = "nice_trigger";
pub const COUNTER_READER: &str = "count";

#[derive(Debug, Clone, Copy)]
pub struct ModuleDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub factory: ModuleFactory,
}

#[derive(Default)]
pub struct ModuleRegistry {
    descriptors: BTreeMap<&'static str, ModuleDescriptor>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ModuleDescriptor) {
        if self
            .descriptors
            .insert(descriptor.name, descriptor)
            .is_some()
        {
            tracing::warn!("Module '{}' registered twice; keeping the latest", descriptor.name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.descriptors.get(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.descriptors.keys().copied().collect()
    }

    /// Builds a fresh instance of `name`.
    pub fn instantiate(&self, name: &str, context: &ModuleContext) -> Result<Box<dyn BotModule>> {
        let descriptor = self
            .get(name)
            .ok_or_else(|| anyhow!("Unknown module: {}", name))?;
        (descriptor.factory)(context)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Instantiated,
    SetUp,
    TornDown,
}

struct LoadedModule {
    name: String,
    module: Box<dyn BotModule>,
    state: ModuleState,
}

/// Outcome of `setup_all`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SetupReport {
    pub loaded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

pub struct Orchestrator {
    registry: ModuleRegistry,
    context: ModuleContext,
    modules: Vec<LoadedModule>,
}

impl Orchestrator {
    pub fn new(registry: ModuleRegistry, context: ModuleContext) -> Self {
        Self {
            registry,
            context,
            modules: Vec::new(),
        }
    }

    /// Instantiates and sets up each enabled module in order, then wires the counter link.
    pub async fn setup_all(&mut self, enabled: &[String]) -> SetupReport {
        let mut report = SetupReport::default();

        if enabled.is_empty() {
            tracing::warn!("No modules enabled; add names to modules.enabled in the config");
            return report;
        }

        tracing::info!("Loading {} module(s)...", enabled.len());

        for name in enabled {
            if self.modules.iter().any(|m| &m.name == name) {
                tracing::warn!("Module '{}' listed more than once; loading it once", name);
                continue;
            }

            let module = match self.registry.instantiate(name, &self.context) {
                Ok(module) => module,
                Err(e) => {
                    tracing::error!("Failed to instantiate module '{}': {:#}", name, e);
                    report.failed.push((name.clone(), format!("{:#}", e)));
                    continue;
                }
            };
            self.modules.push(LoadedModule {
                name: name.clone(),
                module,
                state: ModuleState::Instantiated,
            });

            let Some(loaded) = self.modules.last_mut() else {
                continue;
            };
            match loaded.module.setup().await {
                Ok(()) => {
                    tracing::info!("Loaded module: {} ({})", name, loaded.module.description());
                    loaded.state = ModuleState::SetUp;
                    report.loaded.push(name.clone());
                }
                Err(e) => {
                    tracing::error!("Failed to set up module '{}': {:#}", name, e);
                    self.modules.pop();
                    let removed = self.context.dispatcher.unregister_owner(name).await;
                    if removed > 0 {
                        tracing::debug!("Removed {} handler(s) left by '{}'", removed, name);
                    }
                    report.failed.push((name.clone(), format!("{:#}", e)));
                }
            }
        }

        self.wire_shared_counters();

        tracing::info!(
            "Successfully loaded {}/{} module(s)",
            report.loaded.len(),
            enabled.len()
        );
        report
    }

    /// Points the counter reader at the writer's map when both are loaded.
    pub fn wire_shared_counters(&mut self) -> bool {
        let Some(counters) = self
            .modules
            .iter()
            .find(|m| m.name == COUNTER_WRITER)
            .and_then(|m| m.module.shared_counters())
        else {
            return false;
        };

        match self.modules.iter_mut().find(|m| m.name == COUNTER_READER) {
            Some(reader) => {
                reader.module.attach_shared_counters(counters);
                tracing::info!("Linked '{}' to counts from '{}'", COUNTER_READER, COUNTER_WRITER);
                true
            }
            None => false,
        }
    }

    /// Tears every loaded module down, newest first. Failures are logged and skipped.
    pub async fn teardown_all(&mut self) {
        for loaded in self.modules.iter_mut().rev() {
            if loaded.state != ModuleState::SetUp {
                continue;
            }
            if let Err(e) = loaded.module.teardown().await {
                tracing::error!("Error tearing down module '{}': {:#}", loaded.name, e);
                self.context.dispatcher.unregister_owner(&loaded.name).await;
            }
            loaded.state = ModuleState::TornDown;
            tracing::info!("Unloaded module: {}", loaded.name);
        }
    }

    pub fn loaded_count(&self) -> usize {
        self.modules
            .iter()
            .filter(|m| m.state == ModuleState::SetUp)
            .count()
    }

    #[cfg(test)]
    pub fn state_of(&self, name: &str) -> Option<ModuleState> {
        self.modules.iter().find(|m| m.name == name).map(|m| m.state)
    }
}
