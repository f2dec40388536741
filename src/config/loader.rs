// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs YAML deserialization; it does **not** perform
/// semantic validation (hook references, cycles, trim patterns). Use
/// [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = serde_yaml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run semantic validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads YAML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - at least one service,
///   - empty commands,
///   - unknown or self-referencing `hooks.wait` / `hooks.kill` names,
///   - wait-hook cycles,
///   - trim patterns that do not compile or lack a `message` group.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Helper to resolve a default config path.
///
/// Currently this just returns `composer.yml` in the current working
/// directory; it exists so config discovery (env var, parent directories)
/// can be added in one place later.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("composer.yml")
}
