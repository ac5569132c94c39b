//! Map source abstraction
//!
//! A map source knows how a remote tile provider addresses its raster tiles:
//! how a geographic position plus a ground resolution becomes an integer tile
//! address, how an address becomes a request URI, and which download options
//! (referer, freshness, content check) the provider wants.
//!
//! The capability set is a single object-safe trait with one implementation
//! per provider family:
//!
//! ```text
//! MapSource (trait)
//!     ├── SlippySource     power-of-two Web Mercator grid, template URIs
//!     └── ScaleGridSource  scale-indexed UTM grid, query-parameter URIs
//! ```
//!
//! Sources are registered once at startup in a [`SourceRegistry`] and shared
//! as `Arc<dyn MapSource>` for the process lifetime.

mod registry;
mod scale_grid;
mod slippy;

pub use registry::SourceRegistry;
pub use scale_grid::{GridSubtype, ScaleGridSource, GRID_TILE_SIZE};
pub use slippy::{SlippySource, SLIPPY_TILE_SIZE};

use std::path::Path;

use thiserror::Error;

use crate::coord::{Coord, CoordError};
use crate::download::{DownloadManager, DownloadOptions, DownloadStatus, TransportHandle};

/// The address of one tile within one source's grid.
///
/// Within a single source an address is in bijection with a cache file path;
/// deriving one from the other never touches the filesystem or network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    /// Registry id of the source this address belongs to
    pub source: u8,
    /// Tile column
    pub x: i32,
    /// Tile row
    pub y: i32,
    /// Zoom level (slippy grids) or scale index (scale-indexed grids)
    pub scale: u8,
    /// UTM zone for projected grids, `None` for world grids
    pub zone: Option<u8>,
}

/// The projection a source's grid is laid out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Web Mercator over latitude/longitude input
    Mercator,
    /// Per-zone UTM meters
    Utm,
}

/// Immutable per-provider configuration.
///
/// One descriptor exists per registered source and lives for the process
/// lifetime; requests may override `default_options` per call.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    /// Registry id, also the first component of the cache path
    pub id: u8,
    /// Human-readable provider name
    pub label: String,
    /// Edge length of one tile in pixels
    pub tile_size_px: u32,
    /// Grid projection, which also fixes the accepted coordinate mode
    pub projection: Projection,
    /// Smallest addressable zoom/scale index
    pub min_scale: u8,
    /// Largest addressable zoom/scale index
    pub max_scale: u8,
    /// Hostname tiles are requested from
    pub hostname: String,
    /// Options applied when the source downloads its own tiles
    pub default_options: DownloadOptions,
}

/// Errors from the coordinate/tile addressing half of a source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The requested resolution does not match any entry in the source's
    /// discrete scale table, or the two axis resolutions differ.
    #[error("resolution {x_mpp} x {y_mpp} m/px is not addressable by this source")]
    UnsupportedResolution { x_mpp: f64, y_mpp: f64 },

    /// The coordinate is in the wrong mode for this source's projection.
    #[error("source expects {expected:?} coordinates")]
    CoordinateMode { expected: Projection },

    /// A rectangle's corners fall in different UTM zones.
    #[error("area spans UTM zones {0} and {1}")]
    SpansZones(u8, u8),

    #[error(transparent)]
    Coord(#[from] CoordError),
}

/// Polymorphic capability set shared by all tile providers.
pub trait MapSource: Send + Sync {
    /// The source's immutable configuration.
    fn descriptor(&self) -> &SourceDescriptor;

    /// Converts a position plus per-axis ground resolution into a tile
    /// address.
    ///
    /// Fails with [`SourceError::UnsupportedResolution`] when the axis
    /// resolutions differ (tiles here are square) or when the resolution
    /// does not match an entry of the source's discrete scale table.
    fn coord_to_tile(&self, coord: &Coord, x_mpp: f64, y_mpp: f64)
        -> Result<TileAddress, SourceError>;

    /// Returns the geographic center of the addressed tile's footprint.
    ///
    /// Exact algebraic inverse of [`MapSource::coord_to_tile`] up to integer
    /// truncation: round-tripping stays within half a tile.
    fn tile_to_center_coord(&self, addr: &TileAddress) -> Coord;

    /// Formats the request URI for the addressed tile. Pure string work;
    /// parameter order and encoding are fixed per provider.
    fn build_uri(&self, addr: &TileAddress) -> String;

    /// Fetches the addressed tile into `dest` through the download manager,
    /// using this source's hostname and default options.
    fn download(
        &self,
        manager: &DownloadManager,
        addr: &TileAddress,
        dest: &Path,
        session: &mut TransportHandle,
    ) -> DownloadStatus {
        let descriptor = self.descriptor();
        manager.fetch(
            &descriptor.hostname,
            &self.build_uri(addr),
            dest,
            &descriptor.default_options,
            session,
        )
    }
}

/// Enumerates the tile addresses covering the rectangle spanned by two
/// corner positions at the given resolution.
///
/// Addresses are yielded row-major. Both corners must resolve in the same
/// UTM zone for projected sources.
pub fn tile_range(
    source: &dyn MapSource,
    corner_a: &Coord,
    corner_b: &Coord,
    mpp: f64,
) -> Result<Vec<TileAddress>, SourceError> {
    let a = source.coord_to_tile(corner_a, mpp, mpp)?;
    let b = source.coord_to_tile(corner_b, mpp, mpp)?;

    if a.zone != b.zone {
        return Err(SourceError::SpansZones(
            a.zone.unwrap_or(0),
            b.zone.unwrap_or(0),
        ));
    }

    let (x_min, x_max) = (a.x.min(b.x), a.x.max(b.x));
    let (y_min, y_max) = (a.y.min(b.y), a.y.max(b.y));

    let mut addrs =
        Vec::with_capacity(((x_max - x_min + 1) as usize) * ((y_max - y_min + 1) as usize));
    for y in y_min..=y_max {
        for x in x_min..=x_max {
            addrs.push(TileAddress { x, y, ..a });
        }
    }
    Ok(addrs)
}
