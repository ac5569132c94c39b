//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Tilevault - prefetch raster map tiles into a local cache
#[derive(Parser, Debug)]
#[command(
    name = "tilevault",
    version,
    about = "Fetch and cache raster map tiles from remote providers"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache directory path
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch every tile covering a bounding box
    Fetch(FetchArgs),

    /// List the registered map sources
    Sources,

    /// Resolve a place name to coordinates
    Locate(LocateArgs),
}

/// Arguments for the fetch command
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Map source label (see `tilevault sources`)
    #[arg(short, long)]
    pub source: Option<String>,

    /// Southern edge of the area, degrees
    #[arg(long, allow_hyphen_values = true)]
    pub min_lat: f64,

    /// Western edge of the area, degrees
    #[arg(long, allow_hyphen_values = true)]
    pub min_lon: f64,

    /// Northern edge of the area, degrees
    #[arg(long, allow_hyphen_values = true)]
    pub max_lat: f64,

    /// Eastern edge of the area, degrees
    #[arg(long, allow_hyphen_values = true)]
    pub max_lon: f64,

    /// Ground resolution in meters per pixel (must match a source scale)
    #[arg(short, long)]
    pub mpp: f64,

    /// Number of concurrent download workers
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Re-check cached tiles older than this many seconds
    #[arg(long, value_name = "SECS")]
    pub freshness_secs: Option<u64>,
}

/// Arguments for the locate command
#[derive(Args, Debug, Clone)]
pub struct LocateArgs {
    /// Place name to resolve
    pub query: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_args_parse() {
        let cli = Cli::try_parse_from([
            "tilevault",
            "fetch",
            "--min-lat",
            "51.3",
            "--min-lon",
            "-0.5",
            "--max-lat",
            "51.7",
            "--max-lon",
            "0.3",
            "--mpp",
            "4",
            "-w",
            "8",
        ])
        .unwrap();

        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch subcommand");
        };
        assert_eq!(args.min_lon, -0.5);
        assert_eq!(args.mpp, 4.0);
        assert_eq!(args.workers, Some(8));
        assert!(args.source.is_none());
    }

    #[test]
    fn test_locate_args_parse() {
        let cli = Cli::try_parse_from(["tilevault", "--verbose", "locate", "london"]).unwrap();
        assert!(cli.global.verbose);
        let Commands::Locate(args) = cli.command else {
            panic!("expected locate subcommand");
        };
        assert_eq!(args.query, "london");
    }
}
