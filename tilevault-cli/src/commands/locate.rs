//! The `locate` command: resolve a place name to coordinates.

use anyhow::{Context, Result};

use tilevault::config::ConfigFile;
use tilevault::download::DownloadManager;
use tilevault::geocode::Geocoder;

use crate::args::LocateArgs;

pub fn handle_locate(config: &ConfigFile, args: LocateArgs) -> Result<()> {
    let geocoder = Geocoder::google();
    let manager = DownloadManager::new();
    let mut session = manager.handle_init();
    let work_dir = config.cache_dir.join("goto");

    let position = geocoder
        .lookup(&manager, &mut session, &args.query, &work_dir)
        .with_context(|| format!("could not resolve {:?}", args.query))?;

    println!("{:.6} {:.6}", position.lat, position.lon);
    Ok(())
}
