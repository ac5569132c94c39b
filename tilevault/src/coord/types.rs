//! Coordinate type definitions

use std::fmt;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Zoom levels addressable by slippy-grid sources
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 18;

/// A geographic position in latitude/longitude degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    /// Latitude in degrees, positive north
    pub lat: f64,
    /// Longitude in degrees, positive east
    pub lon: f64,
}

/// A projected position in UTM meters within one zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Utm {
    /// Easting in meters
    pub easting: f64,
    /// Northing in meters
    pub northing: f64,
    /// UTM zone number (1-60)
    pub zone: u8,
}

/// A position in one of the coordinate modes map sources work in.
///
/// Slippy-grid sources address tiles from `LatLon`; scale-indexed grid
/// sources address tiles from `Utm`. A source rejects the other mode
/// rather than converting between datums on the fly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coord {
    LatLon(LatLon),
    Utm(Utm),
}

impl Coord {
    /// Convenience constructor for a latitude/longitude position.
    pub fn lat_lon(lat: f64, lon: f64) -> Self {
        Coord::LatLon(LatLon { lat, lon })
    }

    /// Convenience constructor for a UTM position.
    pub fn utm(easting: f64, northing: f64, zone: u8) -> Self {
        Coord::Utm(Utm {
            easting,
            northing,
            zone,
        })
    }
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Latitude is outside valid range (-85.05112878 to 85.05112878)
    InvalidLatitude(f64),
    /// Longitude is outside valid range (-180.0 to 180.0)
    InvalidLongitude(f64),
    /// Zoom level is outside valid range (0 to 18)
    InvalidZoom(u8),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidLatitude(lat) => {
                write!(
                    f,
                    "Invalid latitude: {} (must be between {} and {})",
                    lat, MIN_LAT, MAX_LAT
                )
            }
            CoordError::InvalidLongitude(lon) => {
                write!(
                    f,
                    "Invalid longitude: {} (must be between {} and {})",
                    lon, MIN_LON, MAX_LON
                )
            }
            CoordError::InvalidZoom(zoom) => {
                write!(
                    f,
                    "Invalid zoom level: {} (must be between {} and {})",
                    zoom, MIN_ZOOM, MAX_ZOOM
                )
            }
        }
    }
}

impl std::error::Error for CoordError {}
