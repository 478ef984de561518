mod agreement;
mod cache;
mod catalog;
mod cli;
mod commands;
mod config;
mod error;
mod model;
mod store;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Import(args) => commands::import::run(args),
        Commands::Record(args) => commands::record::run(args, &config),
        Commands::Agreement(args) => commands::agreement::run(args, &config),
        Commands::Matrix(args) => commands::matrix::run(args),
        Commands::Summary(args) => commands::summary::run(args),
        Commands::Status(args) => commands::status::run(args),
        Commands::ClearCache(args) => commands::clear_cache::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
