//! Download telemetry.
//!
//! Lock-free atomic counters updated by the download manager on every fetch
//! outcome, with point-in-time snapshots for display. Counters are
//! process-lifetime totals; consumers diff snapshots if they want rates.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::download::DownloadStatus;

/// Running totals of fetch outcomes.
#[derive(Debug, Default)]
pub struct DownloadMetrics {
    committed: AtomicU64,
    skipped: AtomicU64,
    contended: AtomicU64,
    cancelled: AtomicU64,
    failed: AtomicU64,
    bytes_committed: AtomicU64,
}

impl DownloadMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one finished fetch.
    pub(crate) fn record(&self, status: &DownloadStatus) {
        let counter = match status {
            DownloadStatus::Committed => &self.committed,
            DownloadStatus::SkipExists
            | DownloadStatus::SkipFresh
            | DownloadStatus::SkipNotModified => &self.skipped,
            DownloadStatus::LockContention => &self.contended,
            DownloadStatus::Cancelled => &self.cancelled,
            DownloadStatus::IoError
            | DownloadStatus::TransportError
            | DownloadStatus::HttpError(_)
            | DownloadStatus::ContentInvalid => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds the payload size of a committed tile.
    pub(crate) fn add_committed_bytes(&self, bytes: u64) {
        self.bytes_committed.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            committed: self.committed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            contended: self.contended.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            bytes_committed: self.bytes_committed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DownloadMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub committed: u64,
    pub skipped: u64,
    pub contended: u64,
    pub cancelled: u64,
    pub failed: u64,
    pub bytes_committed: u64,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} committed ({} bytes), {} skipped, {} contended, {} cancelled, {} failed",
            self.committed,
            self.bytes_committed,
            self.skipped,
            self.contended,
            self.cancelled,
            self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_routes_to_counters() {
        let metrics = DownloadMetrics::new();
        metrics.record(&DownloadStatus::Committed);
        metrics.record(&DownloadStatus::SkipFresh);
        metrics.record(&DownloadStatus::SkipExists);
        metrics.record(&DownloadStatus::LockContention);
        metrics.record(&DownloadStatus::HttpError(500));
        metrics.add_committed_bytes(2048);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.committed, 1);
        assert_eq!(snapshot.skipped, 2);
        assert_eq!(snapshot.contended, 1);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.cancelled, 0);
        assert_eq!(snapshot.bytes_committed, 2048);
    }

    #[test]
    fn test_snapshot_display() {
        let metrics = DownloadMetrics::new();
        metrics.record(&DownloadStatus::Committed);
        let display = metrics.snapshot().to_string();
        assert!(display.contains("1 committed"));
        assert!(display.contains("0 failed"));
    }
}
