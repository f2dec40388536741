#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use composer::config::{Hooks, ServiceConfig};
use composer::logging::LogSink;
use composer::process::Process;
use composer::processor::Processor;
use composer::registry::Registry;
use composer::status::StatusObserver;

/// A sink that discards all child output. Tests that care about output
/// build their own `LogSink::from_writer`.
pub fn null_sink() -> Arc<LogSink> {
    Arc::new(LogSink::from_writer(Box::new(std::io::sink())))
}

/// Builder for a single service definition / process.
pub struct ServiceBuilder {
    name: String,
    config: ServiceConfig,
    root_dir: PathBuf,
}

impl ServiceBuilder {
    pub fn new(name: &str, command: &str) -> Self {
        Self {
            name: name.to_string(),
            config: ServiceConfig {
                command: command.to_string(),
                ..Default::default()
            },
            root_dir: std::env::temp_dir(),
        }
    }

    pub fn wait(mut self, prerequisite: &str) -> Self {
        self.config.hooks.wait.push(prerequisite.to_string());
        self
    }

    pub fn kill(mut self, target: &str) -> Self {
        self.config.hooks.kill.push(target.to_string());
        self
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.config.hooks = hooks;
        self
    }

    pub fn env(mut self, name: &str, value: &str) -> Self {
        self.config
            .environment
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn pwd(mut self, pwd: &str) -> Self {
        self.config.pwd = Some(pwd.to_string());
        self
    }

    pub fn reload(mut self, pattern: &str) -> Self {
        self.config.reload.push(pattern.to_string());
        self
    }

    pub fn log_trim_pattern(mut self, pattern: &str) -> Self {
        self.config.log_trim_pattern = Some(pattern.to_string());
        self
    }

    pub fn ignore_error(mut self) -> Self {
        self.config.ignore_error = true;
        self
    }

    pub fn root_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.root_dir = dir.into();
        self
    }

    pub fn build(self) -> Arc<Process> {
        self.build_with_sink(null_sink())
    }

    pub fn build_with_sink(self, sink: Arc<LogSink>) -> Arc<Process> {
        Arc::new(
            Process::new(self.name, self.config, self.root_dir, sink)
                .expect("builder should produce a valid process"),
        )
    }
}

/// Builder for a registry (and processor) from a set of services.
#[derive(Default)]
pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, service: ServiceBuilder) -> Self {
        self.registry.register(service.build());
        self
    }

    pub fn with_process(mut self, process: Arc<Process>) -> Self {
        self.registry.register(process);
        self
    }

    pub fn observe(mut self, observer: Arc<dyn StatusObserver>) -> Self {
        self.registry.attach_observer(observer);
        self
    }

    pub fn build(self) -> Arc<Registry> {
        Arc::new(self.registry)
    }

    pub fn processor(self) -> Arc<Processor> {
        Processor::new(self.build())
    }
}
