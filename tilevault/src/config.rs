//! Application configuration.
//!
//! Settings live in a small INI file:
//!
//! ```ini
//! [cache]
//! directory = /home/user/.cache/tilevault
//!
//! [download]
//! freshness_secs = 604800
//! referer = https://example.com/
//! workers = 4
//!
//! [source]
//! default = OSM Mapnik
//! ```
//!
//! A missing file yields the defaults; a present but malformed file is an
//! error, so typos never silently fall back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::cache;
use crate::download::{validate, DownloadOptions};

/// Worker-thread count used when the file does not set one.
pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: ini::Error,
    },

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Loaded configuration with defaults applied.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Root directory of the tile cache.
    pub cache_dir: PathBuf,
    /// Label of the source used when none is given on the command line.
    pub default_source: Option<String>,
    /// Freshness window applied to fetches, if any.
    pub freshness: Option<Duration>,
    /// Referer header applied to fetches, if any.
    pub referer: Option<String>,
    /// Worker threads for batch fetches.
    pub workers: usize,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            cache_dir: cache::default_cache_root(),
            default_source: None,
            freshness: None,
            referer: None,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl ConfigFile {
    /// Loads `path`, or returns the defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::default();

        if let Some(section) = ini.section(Some("cache")) {
            if let Some(directory) = section.get("directory") {
                config.cache_dir = PathBuf::from(directory);
            }
        }

        if let Some(section) = ini.section(Some("download")) {
            if let Some(raw) = section.get("freshness_secs") {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::Invalid {
                    key: "download.freshness_secs",
                    value: raw.to_string(),
                })?;
                config.freshness = Some(Duration::from_secs(secs));
            }
            if let Some(referer) = section.get("referer") {
                config.referer = Some(referer.to_string());
            }
            if let Some(raw) = section.get("workers") {
                config.workers = raw.parse().map_err(|_| ConfigError::Invalid {
                    key: "download.workers",
                    value: raw.to_string(),
                })?;
            }
        }

        if let Some(section) = ini.section(Some("source")) {
            if let Some(label) = section.get("default") {
                config.default_source = Some(label.to_string());
            }
        }

        Ok(config)
    }

    /// Overrides the cache directory.
    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = dir;
        self
    }

    /// Overrides the freshness window.
    pub fn with_freshness(mut self, window: Duration) -> Self {
        self.freshness = Some(window);
        self
    }

    /// Overrides the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Download options for map tiles reflecting this configuration.
    pub fn tile_options(&self) -> DownloadOptions {
        DownloadOptions {
            referer: self.referer.clone(),
            freshness_window: self.freshness,
            content_check: Some(validate::is_map_file),
            use_ftp: false,
        }
    }
}
