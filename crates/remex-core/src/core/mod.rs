//! Internal implementation modules for `remex-core`.
//!
//! Most callers should use the re-exports at the crate root.

pub mod action;
pub(crate) mod builtins;
pub mod commands;
pub mod config;
pub mod registry;
pub mod store;
pub mod tooling;
pub mod vendor;
pub mod wire;
