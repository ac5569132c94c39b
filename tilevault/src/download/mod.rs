//! Tile download machinery.
//!
//! This module turns a `(hostname, uri, destination path)` triple into a
//! validated, atomically-committed cache file, safely under concurrency:
//!
//! ```text
//! DownloadManager (orchestrator)
//!         │
//!         ├── LockTable        at most one writer per destination
//!         │
//!         ├── Transport (trait)
//!         │       └── HttpTransport   conditional GET, redirects, sessions
//!         │
//!         ├── validate         payload sniffing (error page vs. tile)
//!         │
//!         └── FetchEvent       progress events over a channel
//! ```
//!
//! The manager never retries; every outcome is reported once through a
//! [`DownloadStatus`] and the destination path is left either absent or
//! fully valid. Retry policy, pacing and scheduling belong to callers.

mod batch;
mod lock;
mod manager;
mod progress;
mod transport;
pub mod validate;

pub use batch::{fetch_batch, BatchReport};
pub use manager::DownloadManager;
pub use progress::FetchEvent;
pub use transport::{
    HttpTransport, TransferOutcome, TransferRequest, Transport, TransportError, TransportHandle,
};

use std::fmt;
use std::fs::File;
use std::time::Duration;

/// Signature of a payload check run against the fetched file before commit.
///
/// Returns `true` when the payload is acceptable. The file's read position
/// is unspecified on entry and exit.
pub type ContentCheck = fn(&mut File) -> bool;

/// Per-request download behavior.
///
/// Sources carry defaults in their descriptor; callers may override per
/// fetch.
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    /// Referer header to send, if any
    pub referer: Option<String>,
    /// Re-check the remote copy once a cached file is older than this;
    /// `None` means an existing file is authoritative forever
    pub freshness_window: Option<Duration>,
    /// Payload acceptance check run before commit
    pub content_check: Option<ContentCheck>,
    /// Request over FTP instead of HTTP
    pub use_ftp: bool,
}

impl DownloadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for fetching map tiles: reject anything that sniffs as a
    /// markup error page.
    pub fn map_tile() -> Self {
        Self {
            content_check: Some(validate::is_map_file),
            ..Self::default()
        }
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = Some(window);
        self
    }

    pub fn with_content_check(mut self, check: ContentCheck) -> Self {
        self.content_check = Some(check);
        self
    }

    pub fn with_ftp(mut self) -> Self {
        self.use_ftp = true;
        self
    }
}

/// Outcome of one fetch.
///
/// Skips and lock contention are expected results, not errors, so the
/// manager reports a status instead of a `Result`. The numeric codes form
/// the stable wire-level taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    /// A new payload was transferred, validated and renamed into place
    Committed,
    /// The destination already exists and no freshness window was given
    SkipExists,
    /// The destination is younger than the freshness window
    SkipFresh,
    /// The server reported the cached copy is still current
    SkipNotModified,
    /// Another fetch for the same destination is in flight
    LockContention,
    /// The fetch was cancelled before the transfer began
    Cancelled,
    /// A local filesystem operation failed
    IoError,
    /// The transfer failed below the HTTP layer
    TransportError,
    /// The server answered with a non-success HTTP status
    HttpError(u16),
    /// The payload failed the content check
    ContentInvalid,
}

impl DownloadStatus {
    /// Stable small-integer code for this outcome.
    pub fn code(&self) -> i32 {
        match self {
            DownloadStatus::Committed => 0,
            DownloadStatus::TransportError | DownloadStatus::ContentInvalid => -1,
            DownloadStatus::HttpError(_) => -2,
            DownloadStatus::SkipExists
            | DownloadStatus::SkipFresh
            | DownloadStatus::SkipNotModified => -3,
            DownloadStatus::LockContention
            | DownloadStatus::Cancelled
            | DownloadStatus::IoError => -4,
        }
    }

    /// True when the destination file is known to be present and valid.
    pub fn tile_available(&self) -> bool {
        matches!(
            self,
            DownloadStatus::Committed
                | DownloadStatus::SkipExists
                | DownloadStatus::SkipFresh
                | DownloadStatus::SkipNotModified
        )
    }

    /// True for outcomes a caller may meaningfully retry later.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            DownloadStatus::IoError
                | DownloadStatus::TransportError
                | DownloadStatus::HttpError(_)
                | DownloadStatus::ContentInvalid
        )
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadStatus::Committed => write!(f, "committed"),
            DownloadStatus::SkipExists => write!(f, "skipped (exists)"),
            DownloadStatus::SkipFresh => write!(f, "skipped (fresh)"),
            DownloadStatus::SkipNotModified => write!(f, "skipped (not modified)"),
            DownloadStatus::LockContention => write!(f, "lock contention"),
            DownloadStatus::Cancelled => write!(f, "cancelled"),
            DownloadStatus::IoError => write!(f, "local I/O error"),
            DownloadStatus::HttpError(status) => write!(f, "HTTP error {}", status),
            DownloadStatus::TransportError => write!(f, "transport error"),
            DownloadStatus::ContentInvalid => write!(f, "invalid payload"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_stable() {
        assert_eq!(DownloadStatus::Committed.code(), 0);
        assert_eq!(DownloadStatus::TransportError.code(), -1);
        assert_eq!(DownloadStatus::ContentInvalid.code(), -1);
        assert_eq!(DownloadStatus::HttpError(503).code(), -2);
        assert_eq!(DownloadStatus::SkipExists.code(), -3);
        assert_eq!(DownloadStatus::SkipFresh.code(), -3);
        assert_eq!(DownloadStatus::SkipNotModified.code(), -3);
        assert_eq!(DownloadStatus::LockContention.code(), -4);
        assert_eq!(DownloadStatus::IoError.code(), -4);
        assert_eq!(DownloadStatus::Cancelled.code(), -4);
    }

    #[test]
    fn test_tile_available() {
        assert!(DownloadStatus::Committed.tile_available());
        assert!(DownloadStatus::SkipFresh.tile_available());
        assert!(!DownloadStatus::LockContention.tile_available());
        assert!(!DownloadStatus::ContentInvalid.tile_available());
    }

    #[test]
    fn test_options_builders() {
        let options = DownloadOptions::new()
            .with_referer("https://example.com/")
            .with_freshness_window(Duration::from_secs(60));
        assert_eq!(options.referer.as_deref(), Some("https://example.com/"));
        assert_eq!(options.freshness_window, Some(Duration::from_secs(60)));
        assert!(!options.use_ftp);
        assert!(options.content_check.is_none());

        let tile = DownloadOptions::map_tile();
        assert!(tile.content_check.is_some());
    }
}
