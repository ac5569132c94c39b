//! The `fetch` command: fill the cache for a bounding box.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::unbounded;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::info;

use tilevault::config::ConfigFile;
use tilevault::coord::Coord;
use tilevault::download::{fetch_batch, DownloadManager, FetchEvent};
use tilevault::source::{tile_range, MapSource, SourceRegistry};

use crate::args::FetchArgs;

pub fn handle_fetch(config: &ConfigFile, args: FetchArgs) -> Result<()> {
    let registry = SourceRegistry::with_defaults();
    let source = resolve_source(&registry, config, args.source.as_deref())?;
    info!(source = %source.descriptor().label, "fetching tiles");

    let a = Coord::lat_lon(args.min_lat, args.min_lon);
    let b = Coord::lat_lon(args.max_lat, args.max_lon);
    let addrs = tile_range(source.as_ref(), &a, &b, args.mpp)
        .with_context(|| format!("cannot address this area at {} m/px", args.mpp))?;
    if addrs.is_empty() {
        bail!("the given area covers no tiles");
    }
    println!(
        "Fetching {} tiles from {}",
        addrs.len(),
        source.descriptor().label
    );

    let mut options = config.tile_options();
    if let Some(secs) = args.freshness_secs {
        options.freshness_window = Some(Duration::from_secs(secs));
    }
    let workers = args.workers.unwrap_or(config.workers);

    // Ctrl-C stops new transfers; tiles already past the network step
    // finish and commit normally.
    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("could not install interrupt handler")?;

    let (events_tx, events_rx) = unbounded();
    let manager = DownloadManager::new()
        .with_events(events_tx)
        .with_cancellation(token);
    let metrics = manager.metrics();

    let bar = ProgressBar::new(addrs.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .context("invalid progress template")?,
    );
    let progress = std::thread::spawn({
        let bar = bar.clone();
        move || {
            for event in events_rx {
                if let FetchEvent::Finished { status, .. } = event {
                    bar.inc(1);
                    bar.set_message(status.to_string());
                }
            }
        }
    });

    let report = fetch_batch(
        &manager,
        source.as_ref(),
        &config.cache_dir,
        &addrs,
        workers,
        Some(&options),
    );

    // Close the event channel so the progress thread drains and exits.
    drop(manager);
    progress
        .join()
        .map_err(|_| anyhow!("progress thread panicked"))?;
    bar.finish_and_clear();

    println!("{}", report);
    info!(%report, metrics = %metrics.snapshot(), "batch finished");

    if report.cancelled > 0 {
        println!("Interrupted; rerun to fetch the remaining tiles.");
    }
    if report.failed > 0 {
        bail!("{} tiles could not be fetched", report.failed);
    }
    Ok(())
}

fn resolve_source(
    registry: &SourceRegistry,
    config: &ConfigFile,
    requested: Option<&str>,
) -> Result<Arc<dyn MapSource>> {
    let label = requested
        .or(config.default_source.as_deref())
        .unwrap_or("OSM Mapnik");
    registry.by_label(label).ok_or_else(|| {
        let known: Vec<String> = registry
            .iter()
            .map(|s| s.descriptor().label.clone())
            .collect();
        anyhow!("unknown source {label:?}; registered sources: {}", known.join(", "))
    })
}
