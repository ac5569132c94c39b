//! Forward geocoding through the tile download machinery.
//!
//! A geocoder turns a free-text place query into a latitude/longitude by
//! fetching a provider's search document and scanning it for the embedded
//! center coordinates. The document travels through the same
//! [`DownloadManager`] path as tiles, so it gets the content check, the
//! temp-file discipline and response caching for free.
//!
//! Every failure mode (transfer, unreadable file, missing pattern) is a
//! recoverable [`GeocodeError`] for the caller to surface.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::coord::LatLon;
use crate::download::{DownloadManager, DownloadOptions, DownloadStatus, TransportHandle};

/// Pattern the search document embeds its result center in.
const CENTER_PATTERN: &str = r"\{center:\{lat:(-?[0-9.]+),lng:(-?[0-9.]+)\}";

/// Marker the provider uses for queries it cannot resolve.
const NOT_FOUND_MARKER: &str = "not understand the location";

#[derive(Debug, Error)]
pub enum GeocodeError {
    /// The search document could not be fetched.
    #[error("geocoder fetch failed: {0}")]
    Fetch(DownloadStatus),

    /// The provider did not recognize the queried location.
    #[error("location not found")]
    NotFound,

    /// The fetched document was readable but carried no coordinates.
    #[error("malformed geocoder response")]
    Malformed,

    #[error("could not read geocoder response: {0}")]
    Io(#[from] std::io::Error),
}

/// A forward geocoder bound to one search provider.
pub struct Geocoder {
    hostname: String,
    uri_format: String,
    options: DownloadOptions,
}

impl Geocoder {
    /// Creates a geocoder for a provider.
    ///
    /// `uri_format` carries a `{query}` placeholder that receives the
    /// URL-escaped query text.
    pub fn new(hostname: &str, uri_format: &str, options: DownloadOptions) -> Self {
        Self {
            hostname: hostname.to_string(),
            uri_format: uri_format.to_string(),
            options,
        }
    }

    /// The stock maps search endpoint.
    pub fn google() -> Self {
        Self::new(
            "maps.google.com",
            "/maps?q={query}&output=js",
            DownloadOptions::map_tile().with_referer("https://maps.google.com/"),
        )
    }

    /// Resolves `query` to a position, caching the response in `work_dir`.
    pub fn lookup(
        &self,
        manager: &DownloadManager,
        session: &mut TransportHandle,
        query: &str,
        work_dir: &Path,
    ) -> Result<LatLon, GeocodeError> {
        let escaped: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        let uri = self.uri_format.replace("{query}", &escaped);
        let dest = work_dir.join(format!("goto-{:016x}", query_key(&self.hostname, &uri)));

        let status = manager.fetch(&self.hostname, &uri, &dest, &self.options, session);
        if !status.tile_available() {
            return Err(GeocodeError::Fetch(status));
        }

        let document = String::from_utf8_lossy(&fs::read(&dest)?).into_owned();
        parse_center(&document)
    }
}

/// Stable cache-file key for one search request.
fn query_key(hostname: &str, uri: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    hostname.hash(&mut hasher);
    uri.hash(&mut hasher);
    hasher.finish()
}

/// Extracts the result center from a search document.
fn parse_center(document: &str) -> Result<LatLon, GeocodeError> {
    if document.contains(NOT_FOUND_MARKER) {
        return Err(GeocodeError::NotFound);
    }

    let pattern = Regex::new(CENTER_PATTERN).map_err(|_| GeocodeError::Malformed)?;
    let captures = pattern.captures(document).ok_or(GeocodeError::Malformed)?;

    let lat: f64 = captures[1].parse().map_err(|_| GeocodeError::Malformed)?;
    let lon: f64 = captures[2].parse().map_err(|_| GeocodeError::Malformed)?;
    debug!(lat, lon, "geocoder resolved query");
    Ok(LatLon { lat, lon })
}
