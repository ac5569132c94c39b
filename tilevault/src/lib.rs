//! Tilevault - tile cache and download core for raster map sources
//!
//! This library fetches raster map tiles from remote providers, caches them
//! on local storage keyed by provider/zoom/tile coordinates, and guarantees
//! that concurrent requests for the same tile never corrupt the cache or
//! duplicate in-flight network work.
//!
//! The pieces compose bottom-up:
//!
//! - [`coord`] - geographic coordinate types and Web Mercator tile math
//! - [`source`] - per-provider tile addressing (slippy and scale-indexed
//!   grids) behind one polymorphic [`source::MapSource`] trait
//! - [`cache`] - the deterministic address-to-path mapping
//! - [`download`] - the manager turning an address into a validated,
//!   atomically-committed cache file, with per-path locking, conditional
//!   re-fetch and batch prefetch
//! - [`geocode`] - place search through the same download path
//! - [`config`] / [`telemetry`] - configuration file and outcome counters
//!
//! A minimal fetch:
//!
//! ```no_run
//! use tilevault::cache;
//! use tilevault::coord::Coord;
//! use tilevault::download::DownloadManager;
//! use tilevault::source::{SourceRegistry, MapSource};
//!
//! let registry = SourceRegistry::with_defaults();
//! let source = registry.by_label("OSM Mapnik").unwrap();
//! let manager = DownloadManager::new();
//!
//! let addr = source
//!     .coord_to_tile(&Coord::lat_lon(51.5074, -0.1278), 4.0, 4.0)
//!     .unwrap();
//! let dest = cache::tile_path(&cache::default_cache_root(), &addr);
//!
//! let mut session = manager.handle_init();
//! let status = source.download(&manager, &addr, &dest, &mut session);
//! assert!(status.tile_available());
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod download;
pub mod geocode;
pub mod source;
pub mod telemetry;

pub use config::ConfigFile;
pub use download::{DownloadManager, DownloadOptions, DownloadStatus};
pub use source::{MapSource, SourceRegistry, TileAddress};
