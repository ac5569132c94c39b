//! Slippy-grid map source.
//!
//! The classic Web Mercator tile pyramid: `2^zoom` tiles per axis, 256 px
//! tiles, each zoom level doubling the ground resolution of the previous
//! one. One instance covers any provider whose tiles are addressed by
//! `(zoom, column, row)`; the per-provider part is the hostname and a URI
//! template with `{z}`, `{x}` and `{y}` placeholders, so both plain
//! path-segment layouts (`/{z}/{x}/{y}.png`) and reordered layouts
//! (`/{z}-r{y}-c{x}.jpg`) are expressed by configuration alone.

use crate::coord::{self, Coord};
use crate::download::DownloadOptions;
use crate::source::{MapSource, Projection, SourceDescriptor, SourceError, TileAddress};

/// Edge length of a slippy tile in pixels.
pub const SLIPPY_TILE_SIZE: u32 = 256;

/// Zoom level at which the grid's nominal resolution is 1 m/px; each step
/// down halves the zoom's resolution.
const UNIT_MPP_ZOOM: i32 = 17;

/// Accepted deviation between a requested resolution and a table entry.
const MARGIN_OF_ERROR: f64 = 0.001;

/// A tile source on the power-of-two Web Mercator grid.
pub struct SlippySource {
    descriptor: SourceDescriptor,
    uri_template: String,
}

impl SlippySource {
    /// Creates a slippy source for one provider.
    ///
    /// # Arguments
    ///
    /// * `id` - Registry id, also the cache-path prefix
    /// * `label` - Human-readable provider name
    /// * `hostname` - Host tiles are requested from
    /// * `uri_template` - URI with `{z}`, `{x}`, `{y}` placeholders
    pub fn new(id: u8, label: &str, hostname: &str, uri_template: &str) -> Self {
        Self {
            descriptor: SourceDescriptor {
                id,
                label: label.to_string(),
                tile_size_px: SLIPPY_TILE_SIZE,
                projection: Projection::Mercator,
                min_scale: coord::MIN_ZOOM,
                max_scale: coord::MAX_ZOOM,
                hostname: hostname.to_string(),
                default_options: DownloadOptions::map_tile(),
            },
            uri_template: uri_template.to_string(),
        }
    }

    /// Looks the resolution up in the grid's discrete table.
    ///
    /// Supported resolutions are exactly `2^(17 - zoom)` m/px for the zoom
    /// levels this instance serves; anything further than the margin of
    /// error from a table entry is unsupported.
    fn mpp_to_zoom(&self, mpp: f64) -> Option<u8> {
        if mpp <= 0.0 {
            return None;
        }
        let zoom = (UNIT_MPP_ZOOM as f64 - mpp.log2()).round();
        if zoom < self.descriptor.min_scale as f64 || zoom > self.descriptor.max_scale as f64 {
            return None;
        }
        let exact = 2.0_f64.powi(UNIT_MPP_ZOOM - zoom as i32);
        if (mpp - exact).abs() > MARGIN_OF_ERROR {
            return None;
        }
        Some(zoom as u8)
    }
}

impl MapSource for SlippySource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn coord_to_tile(
        &self,
        coord: &Coord,
        x_mpp: f64,
        y_mpp: f64,
    ) -> Result<TileAddress, SourceError> {
        let Coord::LatLon(ll) = coord else {
            return Err(SourceError::CoordinateMode {
                expected: Projection::Mercator,
            });
        };

        if x_mpp != y_mpp {
            return Err(SourceError::UnsupportedResolution { x_mpp, y_mpp });
        }

        let zoom = self
            .mpp_to_zoom(x_mpp)
            .ok_or(SourceError::UnsupportedResolution { x_mpp, y_mpp })?;

        let (x, y) = coord::lat_lon_to_tile(ll.lat, ll.lon, zoom)?;
        Ok(TileAddress {
            source: self.descriptor.id,
            x,
            y,
            scale: zoom,
            zone: None,
        })
    }

    fn tile_to_center_coord(&self, addr: &TileAddress) -> Coord {
        Coord::LatLon(coord::tile_center(addr.x, addr.y, addr.scale))
    }

    fn build_uri(&self, addr: &TileAddress) -> String {
        self.uri_template
            .replace("{z}", &addr.scale.to_string())
            .replace("{x}", &addr.x.to_string())
            .replace("{y}", &addr.y.to_string())
    }
}
