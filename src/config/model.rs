// src/config/model.rs

//! Serde data model for the composer configuration file.
//!
//! The file has two top-level blocks:
//!
//! ```yaml
//! settings:
//!   logger:
//!     destination: /tmp/composer.log   # optional, defaults to stdout
//!
//! services:
//!   db:
//!     command: "postgres -D ./data"
//!   web:
//!     command: "bundle exec rails s"
//!     pwd: "./web"
//!     environment:
//!       PORT: "3000"
//!     hooks:
//!       wait: [db]
//!       kill: [worker]
//!     reload: [".git", "log", "tmp"]
//!     log_trim_pattern: '^\S+ (?P<message>.*)$'
//!     ignore_error: false
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Raw deserialized configuration file, prior to semantic validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,
}

/// Global settings block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logger: LoggerSettings,
}

/// Logger settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggerSettings {
    /// Where child process output is written. Absent means stdout; the
    /// platform null path selects a discard sink without touching the
    /// filesystem.
    #[serde(default)]
    pub destination: Option<PathBuf>,
}

/// One named service definition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    /// POSIX-style command line to run.
    #[serde(default)]
    pub command: String,

    /// Working directory override; defaults to the directory composer was
    /// started from. Supports `$VAR`, `${VAR}` and `~` expansion.
    #[serde(default)]
    pub pwd: Option<String>,

    /// Extra environment entries layered over the inherited environment.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    #[serde(default)]
    pub hooks: Hooks,

    /// Ignore-style patterns enabling live reload when non-empty: the
    /// working directory is watched recursively and any change to a
    /// non-ignored path restarts the command in place.
    #[serde(default)]
    pub reload: Vec<String>,

    /// Regular expression with a named `message` capture; applied to every
    /// output line before forwarding.
    #[serde(default)]
    pub log_trim_pattern: Option<String>,

    /// Suppress this service's run errors from triggering global shutdown.
    #[serde(default)]
    pub ignore_error: bool,
}

/// Inter-service ordering hooks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Hooks {
    /// Names of services that must all reach `stopped` before this one may
    /// start.
    #[serde(default)]
    pub wait: Vec<String>,

    /// Names of services to force-stop when this one stops.
    #[serde(default)]
    pub kill: Vec<String>,
}

/// A validated configuration file.
///
/// Constructed only through `ConfigFile::try_from(RawConfigFile)` (see
/// [`super::validate`]), so holders can rely on: services non-empty, every
/// hook reference naming a configured service, no self-references, no
/// wait-hook cycles, and every trim pattern compiling with a `message`
/// group.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    settings: Settings,
    services: BTreeMap<String, ServiceConfig>,
}

impl ConfigFile {
    /// Build without validating. Only `validate` should call this.
    pub(crate) fn new_unchecked(
        settings: Settings,
        services: BTreeMap<String, ServiceConfig>,
    ) -> Self {
        Self { settings, services }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn services(&self) -> &BTreeMap<String, ServiceConfig> {
        &self.services
    }

    pub fn into_services(self) -> BTreeMap<String, ServiceConfig> {
        self.services
    }
}
