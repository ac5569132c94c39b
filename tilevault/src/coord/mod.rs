//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator tile coordinates used by slippy-grid map sources.

mod types;

pub use types::{Coord, CoordError, LatLon, Utm, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM};

use std::f64::consts::PI;

/// Converts geographic coordinates to slippy tile coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 18)
///
/// # Returns
///
/// The `(x, y)` tile column and row, or an error if inputs are invalid.
#[inline]
pub fn lat_lon_to_tile(lat: f64, lon: f64, zoom: u8) -> Result<(i32, i32), CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    // Number of tiles per axis at this zoom level
    let n = 2.0_f64.powi(zoom as i32);

    // Longitude to tile X coordinate
    let x = ((lon + 180.0) / 360.0 * n) as i32;

    // Latitude to tile Y coordinate using Web Mercator projection
    let lat_rad = lat * PI / 180.0;
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n) as i32;

    Ok((x, y))
}

/// Converts slippy tile coordinates back to the geographic center of the tile.
#[inline]
pub fn tile_center(x: i32, y: i32, zoom: u8) -> LatLon {
    let n = 2.0_f64.powi(zoom as i32);

    // Tile X coordinate to longitude (add 0.5 for center)
    let lon = (x as f64 + 0.5) / n * 360.0 - 180.0;

    // Tile Y coordinate to latitude using inverse Web Mercator (add 0.5 for center)
    let row = (y as f64 + 0.5) / n;
    let lat_rad = (PI * (1.0 - 2.0 * row)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    LatLon { lat, lon }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_york_city_at_zoom_16() {
        // New York City: 40.7128°N, 74.0060°W
        let result = lat_lon_to_tile(40.7128, -74.0060, 16);
        assert!(result.is_ok(), "Valid coordinates should not error");

        let (x, y) = result.unwrap();
        assert_eq!(x, 19295);
        assert_eq!(y, 24640);
    }

    #[test]
    fn test_invalid_latitude() {
        let result = lat_lon_to_tile(90.0, 0.0, 10);
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), CoordError::InvalidLatitude(_)));
    }

    #[test]
    fn test_invalid_zoom() {
        let result = lat_lon_to_tile(40.0, -74.0, 19);
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), CoordError::InvalidZoom(19)));
    }

    #[test]
    fn test_tile_center_near_equator() {
        // At zoom 10, tile 512,512 should be near 0,0
        let center = tile_center(512, 512, 10);
        assert!(center.lat.abs() < 1.0, "Should be near equator");
        assert!(center.lon.abs() < 1.0, "Should be near prime meridian");
    }

    #[test]
    fn test_roundtrip_conversion() {
        let original_lat = 40.7128;
        let original_lon = -74.0060;
        let zoom = 16;

        let (x, y) = lat_lon_to_tile(original_lat, original_lon, zoom).unwrap();
        let center = tile_center(x, y, zoom);

        // The center differs from the original by at most half a tile
        let half_tile_degrees = 360.0 / (2.0_f64.powi(zoom as i32)) / 2.0;
        assert!(
            (center.lat - original_lat).abs() < half_tile_degrees,
            "Latitude should roundtrip within half a tile"
        );
        assert!(
            (center.lon - original_lon).abs() < half_tile_degrees,
            "Longitude should roundtrip within half a tile"
        );
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_roundtrip_property(
                lat in -85.05..85.05_f64,
                lon in -180.0..180.0_f64,
                zoom in 0u8..=18
            ) {
                let (x, y) = lat_lon_to_tile(lat, lon, zoom)?;
                let center = tile_center(x, y, zoom);

                // Longitude error is bounded by half the tile's angular width;
                // latitude shrinks under Mercator so a full tile width is a
                // safe bound everywhere in the valid range.
                let tile_size = 360.0 / (2.0_f64.powi(zoom as i32));

                prop_assert!(
                    (center.lon - lon).abs() <= tile_size / 2.0 + 1e-9,
                    "Longitude roundtrip failed: {} -> {} (tile size: {})",
                    lon, center.lon, tile_size
                );
                prop_assert!(
                    (center.lat - lat).abs() < tile_size,
                    "Latitude roundtrip failed: {} -> {} (tile size: {})",
                    lat, center.lat, tile_size
                );
            }

            #[test]
            fn test_tile_coords_in_bounds(
                lat in -85.05..85.05_f64,
                lon in -179.999..179.999_f64,
                zoom in 0u8..=18
            ) {
                let (x, y) = lat_lon_to_tile(lat, lon, zoom)?;

                let max_tile = 2i32.pow(zoom as u32);
                prop_assert!(x >= 0 && x < max_tile, "Col {} out of range at zoom {}", x, zoom);
                prop_assert!(y >= 0 && y <= max_tile, "Row {} out of range at zoom {}", y, zoom);
            }

            #[test]
            fn test_longitude_monotonic(
                lat in 0.0..1.0_f64,
                lon1 in -180.0..-90.0_f64,
                lon2 in -90.0..0.0_f64,
                zoom in 10u8..=15
            ) {
                // For fixed latitude, increasing longitude never decreases column
                let (x1, _) = lat_lon_to_tile(lat, lon1, zoom)?;
                let (x2, _) = lat_lon_to_tile(lat, lon2, zoom)?;

                prop_assert!(
                    x1 < x2,
                    "Longitude not monotonic: lon {} (col {}) >= lon {} (col {})",
                    lon1, x1, lon2, x2
                );
            }

            #[test]
            fn test_reject_invalid_latitude(
                lat in -90.0..-85.06_f64,
                lon in -180.0..180.0_f64,
                zoom in 0u8..=18
            ) {
                let result = lat_lon_to_tile(lat, lon, zoom);
                prop_assert!(result.is_err());
                prop_assert!(matches!(result.unwrap_err(), CoordError::InvalidLatitude(_)));
            }
        }
    }
}
