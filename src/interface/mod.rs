//! # Interface Layer
//!
//! The feature modules users interact with: chat commands and passive triggers.

pub mod modules;
