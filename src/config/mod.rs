// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - [`model`] holds the serde data model for the YAML configuration file.
//! - [`loader`] reads and deserializes a file from disk.
//! - [`validate`] performs the semantic checks (hook references, cycles,
//!   trim patterns) that turn a [`model::RawConfigFile`] into a
//!   [`model::ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, Hooks, LoggerSettings, RawConfigFile, ServiceConfig, Settings};
