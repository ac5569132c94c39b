//! Tilevault CLI - command-line tile prefetcher
//!
//! Thin front end over the tilevault library: computes the tile addresses
//! covering an area and drives the download manager to fill the cache,
//! exactly the way an interactive map view would.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use tilevault::config::ConfigFile;

mod args;
mod commands;

use args::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli
        .global
        .config
        .clone()
        .unwrap_or_else(default_config_path);
    let mut config = ConfigFile::load(&config_path)?;
    if let Some(cache_dir) = cli.global.cache_dir.clone() {
        config = config.with_cache_dir(cache_dir);
    }

    match cli.command {
        Commands::Fetch(args) => commands::handle_fetch(&config, args),
        Commands::Sources => commands::handle_sources(),
        Commands::Locate(args) => commands::handle_locate(&config, args),
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("tilevault")
        .join("tilevault.ini")
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tilevault={level}")));

    fmt().with_env_filter(filter).with_target(false).init();
}
