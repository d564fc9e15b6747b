//! # Application Layer
//!
//! The runtime core: dispatcher, module contract, registry and orchestrator, plus the
//! keyed state store and the expiry rules built on top of it.

pub mod cache;
pub mod clock;
pub mod counters;
pub mod dispatcher;
pub mod expiry;
pub mod history;
pub mod module;
pub mod registry;
pub mod store;

#[cfg(test)]
pub mod testing;

