//! Cache file layout.
//!
//! Every tile address maps to exactly one file below the cache root:
//!
//! ```text
//! {root}/t{source}s{scale}z{zone}/{x}/{y}
//! ```
//!
//! The mapping is pure (deriving a path performs no I/O) and bijective
//! within one source, so the path doubles as the tile's identity for
//! locking. Directories are created on demand by the download manager.

use std::path::{Path, PathBuf};

use crate::source::TileAddress;

/// Directory name under the platform cache dir used by default.
const CACHE_DIR_NAME: &str = "tilevault";

/// Returns the cache file path for a tile address.
pub fn tile_path(root: &Path, addr: &TileAddress) -> PathBuf {
    root.join(format!(
        "t{}s{}z{}",
        addr.source,
        addr.scale,
        addr.zone.unwrap_or(0)
    ))
    .join(addr.x.to_string())
    .join(addr.y.to_string())
}

/// Default cache root under the platform cache directory, falling back to
/// the system temp dir when the platform reports none.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(CACHE_DIR_NAME)
}
