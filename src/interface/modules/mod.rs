//! # Feature Modules
//!
//! The closed set of modules the bot can enable, and the registration table the
//! orchestrator instantiates them from.

use anyhow::{Result, anyhow};
use rand::seq::SliceRandom;

use crate::application::registry::{ModuleDescriptor, ModuleRegistry};
use crate::domain::traits::ChatProvider;

pub mod backup;
pub mod bartender;
pub mod chat;
pub mod count;
pub mod dallas;
pub mod eagles;
pub mod friday;
pub mod nice;
pub mod quote;
pub mod search;
pub mod shutup;
pub mod stock;
pub mod triggers;
pub mod weather;

const BUILTIN: &[ModuleDescriptor] = &[
    ModuleDescriptor {
        name: nice::NAME,
        description: nice::DESCRIPTION,
        factory: nice::factory,
    },
    ModuleDescriptor {
        name: count::NAME,
        description: count::DESCRIPTION,
        factory: count::factory,
    },
    ModuleDescriptor {
        name: eagles::NAME,
        description: eagles::DESCRIPTION,
        factory: eagles::factory,
    },
    ModuleDescriptor {
        name: dallas::NAME,
        description: dallas::DESCRIPTION,
        factory: dallas::factory,
    },
    ModuleDescriptor {
        name: shutup::NAME,
        description: shutup::DESCRIPTION,
        factory: shutup::factory,
    },
    ModuleDescriptor {
        name: friday::NAME,
        description: friday::DESCRIPTION,
        factory: friday::factory,
    },
    ModuleDescriptor {
        name: stock::NAME,
        description: stock::DESCRIPTION,
        factory: stock::factory,
    },
    ModuleDescriptor {
        name: chat::NAME,
        description: chat::DESCRIPTION,
        factory: chat::factory,
    },
    ModuleDescriptor {
        name: weather::NAME,
        description: weather::DESCRIPTION,
        factory: weather::factory,
    },
    ModuleDescriptor {
        name: quote::NAME,
        description: quote::DESCRIPTION,
        factory: quote::factory,
    },
    ModuleDescriptor {
        name: search::NAME,
        description: search::DESCRIPTION,
        factory: search::factory,
    },
    ModuleDescriptor {
        name: bartender::NAME,
        description: bartender::DESCRIPTION,
        factory: bartender::factory,
    },
    ModuleDescriptor {
        name: triggers::NAME,
        description: triggers::DESCRIPTION,
        factory: triggers::factory,
    },
    ModuleDescriptor {
        name: backup::NAME,
        description: backup::DESCRIPTION,
        factory: backup::factory,
    },
];

/// Registry holding every built-in module.
pub fn builtin_registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    for descriptor in BUILTIN {
        registry.register(*descriptor);
    }
    registry
}

/// Sends `text` to the room, turning a provider error into an `anyhow` error.
pub(crate) async fn reply(chat: &dyn ChatProvider, text: &str) -> Result<String> {
    chat.send_message(text).await.map_err(|e| anyhow!(e))
}

pub(crate) async fn edit(chat: &dyn ChatProvider, message_id: &str, text: &str) -> Result<()> {
    chat.edit_message(message_id, text)
        .await
        .map_err(|e| anyhow!(e))
}

/// Picks one entry at random. `None` only for an empty pool.
pub(crate) fn pick<S: AsRef<str>>(pool: &[S]) -> Option<String> {
    pool.choose(&mut rand::thread_rng())
        .map(|s| s.as_ref().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_names() {
        let registry = builtin_registry();
        assert_eq!(registry.names().len(), 14);
        for name in [
            "nice_trigger",
            "count",
            "eagles_trigger",
            "dallas_trigger",
            "shutup_trigger",
            "friday",
            "stock",
            "chatgpt",
            "weather",
            "quote",
            "search",
            "bartender",
            "triggers",
            "backup",
        ] {
            assert!(registry.get(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn test_pick_from_pool() {
        assert_eq!(pick(&["only"]), Some("only".to_string()));
        assert_eq!(pick::<&str>(&[]), None);
    }
}
