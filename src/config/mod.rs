//! Configuration system for boxform.
//!
//! This module provides TOML configuration loading with hierarchy merging.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded from multiple sources and merged in order:
//!
//! 1. System config: `/etc/boxform/config.toml`
//! 2. User config: `~/.config/boxform/config.toml`
//! 3. Additional config file (via `--config` flag)
//! 4. CLI flags (highest priority)
//!
//! No file is required; without any, the built-in defaults apply.
//!
//! # Merge Behavior
//!
//! Scalars are **overridden** by later sources when they differ from the
//! default. The merged result is validated before use.

mod error;
mod loader;
mod schema;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{Config, FormConfig, GeneralConfig, ServerConfig, TransportConfig};
