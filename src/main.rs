// src/main.rs

use clap::Parser;
use tracing::error;

use composer::cli::CliArgs;
use composer::logging;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    logging::init_logging(args.verbose);

    if let Err(err) = composer::run(args).await {
        error!(error = %err, "composer exited with an error");
        std::process::exit(1);
    }
}
