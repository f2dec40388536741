// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod process;
pub mod processor;
pub mod registry;
pub mod signals;
pub mod status;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

/// Re-exported so embedders and tests can drive [`Processor::perform`]
/// without depending on `tokio-util` directly.
pub use tokio_util::sync::CancellationToken;

use crate::cli::{CliArgs, Command};
use crate::config::{load_and_validate, ConfigFile};
use crate::errors::Result;
use crate::logging::LogSink;
use crate::process::Process;
use crate::processor::Processor;
use crate::registry::Registry;

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Version => {
            println!("{}", cli::version());
            Ok(())
        }
        Command::Start { config } => start(&config).await,
    }
}

/// Load the configuration, build the registry, and drive everything to
/// termination.
///
/// This wires together:
/// - config loading and validation
/// - the shared child-output sink
/// - registry construction (one registered process per service)
/// - signal handling (interrupt → cancel + exactly-once shutdown)
/// - the processor
async fn start(config_path: &Path) -> Result<()> {
    let cfg = load_and_validate(config_path)?;
    let registry = Arc::new(build_registry(cfg)?);
    let processor = Processor::new(registry);

    // Root cancellation context; canceling it cancels every running
    // execution transitively.
    let root = CancellationToken::new();

    {
        let root = root.clone();
        let processor = processor.clone();
        tokio::spawn(async move {
            if let Err(err) = signals::wait_for_shutdown_signal().await {
                eprintln!("composer: failed to listen for signals: {err}");
                return;
            }
            info!("interrupt received");
            root.cancel();
            processor.shutdown();
        });
    }

    processor.perform(root.child_token()).await
}

/// Turn a validated configuration into a fully registered [`Registry`].
pub fn build_registry(cfg: ConfigFile) -> Result<Registry> {
    let sink = Arc::new(LogSink::open(
        cfg.settings().logger.destination.as_deref(),
    )?);
    let root_dir = std::env::current_dir()?;

    let mut registry = Registry::new();
    for (name, service) in cfg.into_services() {
        let process = Process::new(name, service, root_dir.clone(), sink.clone())?;
        registry.register(Arc::new(process));
    }

    Ok(registry)
}
