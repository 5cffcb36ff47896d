//! `depyler` — the C10 pipeline orchestrator and §6 command-line entry point.

mod cli;
mod error;
mod events;
mod orchestrator;
mod worker_pool;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match orchestrator::run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            std::process::exit(e.exit_code());
        }
    }
}
