//! Scale-indexed map source.
//!
//! An orthophoto-style provider that addresses tiles on a per-UTM-zone grid
//! with an explicit table of supported ground resolutions instead of a
//! continuous zoom. Tiles are 200 px and the grid position is simply the
//! projected position divided by the tile footprint, so the address carries
//! the UTM zone alongside column and row.
//!
//! The provider serves three imagery subtypes behind one endpoint; the low
//! end of the scale table is only available for some of them, which is why
//! the table is an explicit per-subtype lookup rather than a formula.

use crate::coord::Coord;
use crate::download::DownloadOptions;
use crate::source::{MapSource, Projection, SourceDescriptor, SourceError, TileAddress};

/// Edge length of a scale-grid tile in pixels.
pub const GRID_TILE_SIZE: u32 = 200;

/// Accepted deviation between a requested resolution and a table entry.
const MARGIN_OF_ERROR: f64 = 0.001;

const GRID_HOSTNAME: &str = "terraserver-usa.com";

/// Imagery subtype served by the scale-grid provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridSubtype {
    /// Aerial photography
    Aerial,
    /// Topographic maps
    Topo,
    /// High-resolution urban color imagery
    Urban,
}

impl GridSubtype {
    /// Numeric type code used in request URIs.
    pub fn type_code(&self) -> u8 {
        match self {
            GridSubtype::Aerial => 1,
            GridSubtype::Topo => 2,
            GridSubtype::Urban => 4,
        }
    }
}

/// A tile source on the scale-indexed UTM grid.
pub struct ScaleGridSource {
    descriptor: SourceDescriptor,
    subtype: GridSubtype,
}

impl ScaleGridSource {
    /// Creates a scale-grid source for one imagery subtype.
    pub fn new(id: u8, label: &str, subtype: GridSubtype) -> Self {
        Self {
            descriptor: SourceDescriptor {
                id,
                label: label.to_string(),
                tile_size_px: GRID_TILE_SIZE,
                projection: Projection::Utm,
                min_scale: 8,
                max_scale: 19,
                hostname: GRID_HOSTNAME.to_string(),
                default_options: DownloadOptions::map_tile(),
            },
            subtype,
        }
    }

    /// Looks the resolution up in the provider's scale table.
    ///
    /// The two finest entries exist only for the urban subtype and the
    /// 4 m/px entry is missing from the topo set; the remaining entries are
    /// available everywhere. A resolution further than the margin of error
    /// from any entry is unsupported.
    fn mpp_to_scale(&self, mpp: f64) -> Option<u8> {
        let quantized = mpp.round();
        if (mpp - quantized).abs() > MARGIN_OF_ERROR {
            return None;
        }
        match quantized as i64 {
            1 => (self.subtype == GridSubtype::Urban).then_some(8),
            2 => (self.subtype == GridSubtype::Urban).then_some(9),
            4 => (self.subtype != GridSubtype::Topo).then_some(10),
            8 => Some(11),
            16 => Some(12),
            32 => Some(13),
            64 => Some(14),
            128 => Some(15),
            256 => Some(16),
            512 => Some(17),
            1024 => Some(18),
            2048 => Some(19),
            _ => None,
        }
    }

    /// Ground resolution of a scale index, inverse of the table above.
    fn scale_to_mpp(scale: u8) -> f64 {
        2.0_f64.powi(scale as i32 - 8)
    }
}

impl MapSource for ScaleGridSource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn coord_to_tile(
        &self,
        coord: &Coord,
        x_mpp: f64,
        y_mpp: f64,
    ) -> Result<TileAddress, SourceError> {
        let Coord::Utm(utm) = coord else {
            return Err(SourceError::CoordinateMode {
                expected: Projection::Utm,
            });
        };

        if x_mpp != y_mpp {
            return Err(SourceError::UnsupportedResolution { x_mpp, y_mpp });
        }

        let scale = self
            .mpp_to_scale(x_mpp)
            .ok_or(SourceError::UnsupportedResolution { x_mpp, y_mpp })?;

        let footprint = GRID_TILE_SIZE as f64 * x_mpp;
        Ok(TileAddress {
            source: self.descriptor.id,
            x: (utm.easting.trunc() / footprint) as i32,
            y: (utm.northing.trunc() / footprint) as i32,
            scale,
            zone: Some(utm.zone),
        })
    }

    fn tile_to_center_coord(&self, addr: &TileAddress) -> Coord {
        let mpp = Self::scale_to_mpp(addr.scale);
        let tile = GRID_TILE_SIZE as f64;
        Coord::utm(
            (addr.x as f64 * tile + tile / 2.0) * mpp,
            (addr.y as f64 * tile + tile / 2.0) * mpp,
            addr.zone.unwrap_or(0),
        )
    }

    fn build_uri(&self, addr: &TileAddress) -> String {
        format!(
            "/tile.ashx?T={}&S={}&X={}&Y={}&Z={}",
            self.subtype.type_code(),
            addr.scale,
            addr.x,
            addr.y,
            addr.zone.unwrap_or(0)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Utm;

    fn aerial() -> ScaleGridSource {
        ScaleGridSource::new(1, "Aerial", GridSubtype::Aerial)
    }

    fn topo() -> ScaleGridSource {
        ScaleGridSource::new(2, "Topographic", GridSubtype::Topo)
    }

    fn urban() -> ScaleGridSource {
        ScaleGridSource::new(4, "Urban", GridSubtype::Urban)
    }

    #[test]
    fn test_descriptor() {
        let source = aerial();
        let descriptor = source.descriptor();
        assert_eq!(descriptor.tile_size_px, 200);
        assert_eq!(descriptor.projection, Projection::Utm);
        assert_eq!(descriptor.min_scale, 8);
        assert_eq!(descriptor.max_scale, 19);
    }

    #[test]
    fn test_scale_table_common_entries() {
        for source in [aerial(), topo(), urban()] {
            assert_eq!(source.mpp_to_scale(8.0), Some(11));
            assert_eq!(source.mpp_to_scale(16.0), Some(12));
            assert_eq!(source.mpp_to_scale(2048.0), Some(19));
            // Not in the table at all
            assert_eq!(source.mpp_to_scale(3.0), None);
            assert_eq!(source.mpp_to_scale(12.0), None);
        }
    }

    #[test]
    fn test_scale_table_subtype_conditionals() {
        // The finest entries only exist for urban imagery
        assert_eq!(urban().mpp_to_scale(1.0), Some(8));
        assert_eq!(urban().mpp_to_scale(2.0), Some(9));
        assert_eq!(aerial().mpp_to_scale(1.0), None);
        assert_eq!(aerial().mpp_to_scale(2.0), None);
        assert_eq!(topo().mpp_to_scale(1.0), None);

        // 4 m/px exists for everything except topo
        assert_eq!(aerial().mpp_to_scale(4.0), Some(10));
        assert_eq!(urban().mpp_to_scale(4.0), Some(10));
        assert_eq!(topo().mpp_to_scale(4.0), None);
    }

    #[test]
    fn test_scale_table_tolerance() {
        assert_eq!(aerial().mpp_to_scale(8.0005), Some(11));
        assert_eq!(aerial().mpp_to_scale(8.01), None);
    }

    #[test]
    fn test_coord_to_tile() {
        let source = aerial();
        let addr = source
            .coord_to_tile(&Coord::utm(350_000.0, 5_710_000.0, 32), 16.0, 16.0)
            .unwrap();
        assert_eq!(addr.source, 1);
        assert_eq!(addr.scale, 12);
        assert_eq!(addr.zone, Some(32));
        assert_eq!(addr.x, 109);
        assert_eq!(addr.y, 1784);
    }

    #[test]
    fn test_coord_to_tile_rejects_lat_lon_input() {
        let result = aerial().coord_to_tile(&Coord::lat_lon(51.5, -0.12), 16.0, 16.0);
        assert!(matches!(
            result,
            Err(SourceError::CoordinateMode {
                expected: Projection::Utm
            })
        ));
    }

    #[test]
    fn test_coord_to_tile_rejects_unequal_axes() {
        let result = aerial().coord_to_tile(&Coord::utm(350_000.0, 5_710_000.0, 32), 16.0, 32.0);
        assert!(matches!(
            result,
            Err(SourceError::UnsupportedResolution { .. })
        ));
    }

    #[test]
    fn test_round_trip_within_half_tile() {
        let source = urban();
        for &mpp in &[1.0, 4.0, 64.0, 2048.0] {
            let original = Utm {
                easting: 412_345.0,
                northing: 5_678_901.0,
                zone: 33,
            };
            let addr = source
                .coord_to_tile(&Coord::Utm(original), mpp, mpp)
                .unwrap();
            let Coord::Utm(center) = source.tile_to_center_coord(&addr) else {
                panic!("scale-grid source must return UTM");
            };
            let half_tile = GRID_TILE_SIZE as f64 * mpp / 2.0;
            assert!(
                (center.easting - original.easting).abs() <= half_tile,
                "easting off by {} at {} m/px",
                (center.easting - original.easting).abs(),
                mpp
            );
            assert!(
                (center.northing - original.northing).abs() <= half_tile,
                "northing off by {} at {} m/px",
                (center.northing - original.northing).abs(),
                mpp
            );
            assert_eq!(center.zone, original.zone);
        }
    }

    #[test]
    fn test_build_uri_query_parameters() {
        let addr = TileAddress {
            source: 2,
            x: 109,
            y: 1784,
            scale: 12,
            zone: Some(32),
        };
        assert_eq!(
            topo().build_uri(&addr),
            "/tile.ashx?T=2&S=12&X=109&Y=1784&Z=32"
        );
    }
}
