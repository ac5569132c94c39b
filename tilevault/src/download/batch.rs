//! Bounded batch prefetch.
//!
//! Fetches a set of tile addresses on a fixed-size worker pool, the way a
//! map view fills the tiles of one viewport. Each worker thread carries its
//! own transport session for the lifetime of the batch, so connection setup
//! is paid once per worker rather than once per tile.
//!
//! Failures never abort the batch; every address is attempted once and the
//! outcomes are tallied into a [`BatchReport`].

use std::fmt;
use std::path::Path;

use rayon::prelude::*;
use tracing::warn;

use crate::cache;
use crate::download::{DownloadManager, DownloadOptions, DownloadStatus};
use crate::source::{MapSource, TileAddress};

/// Tally of one batch's outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub committed: usize,
    pub skipped: usize,
    pub contended: usize,
    pub cancelled: usize,
    pub failed: usize,
}

impl BatchReport {
    fn absorb(&mut self, status: &DownloadStatus) {
        match status {
            DownloadStatus::Committed => self.committed += 1,
            DownloadStatus::SkipExists
            | DownloadStatus::SkipFresh
            | DownloadStatus::SkipNotModified => self.skipped += 1,
            DownloadStatus::LockContention => self.contended += 1,
            DownloadStatus::Cancelled => self.cancelled += 1,
            DownloadStatus::IoError
            | DownloadStatus::TransportError
            | DownloadStatus::HttpError(_)
            | DownloadStatus::ContentInvalid => self.failed += 1,
        }
    }

    /// Number of addresses attempted.
    pub fn total(&self) -> usize {
        self.committed + self.skipped + self.contended + self.cancelled + self.failed
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} committed, {} skipped, {} contended, {} cancelled, {} failed",
            self.committed, self.skipped, self.contended, self.cancelled, self.failed
        )
    }
}

/// Fetches every address into the cache below `root` on `workers` threads.
///
/// `options` overrides the source's default download options when given;
/// pass `None` to fetch the way the source itself would.
pub fn fetch_batch(
    manager: &DownloadManager,
    source: &dyn MapSource,
    root: &Path,
    addrs: &[TileAddress],
    workers: usize,
    options: Option<&DownloadOptions>,
) -> BatchReport {
    let workers = workers.max(1);

    let fetch_one = |session: &mut crate::download::TransportHandle, addr: &TileAddress| {
        let dest = cache::tile_path(root, addr);
        match options {
            Some(options) => manager.fetch(
                &source.descriptor().hostname,
                &source.build_uri(addr),
                &dest,
                options,
                session,
            ),
            None => source.download(manager, addr, &dest, session),
        }
    };

    let statuses: Vec<DownloadStatus> = match rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
    {
        Ok(pool) => pool.install(|| {
            addrs
                .par_iter()
                .map_init(|| manager.handle_init(), |session, addr| fetch_one(session, addr))
                .collect()
        }),
        Err(err) => {
            // No pool, no parallelism: fall back to one session inline.
            warn!(%err, "could not build worker pool, fetching sequentially");
            let mut session = manager.handle_init();
            addrs.iter().map(|addr| fetch_one(&mut session, addr)).collect()
        }
    };

    let mut report = BatchReport::default();
    for status in &statuses {
        report.absorb(status);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::{
        TransferOutcome, TransferRequest, Transport, TransportHandle,
    };
    use crate::source::SlippySource;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Always serves the same payload; counts calls.
    struct FixedTransport {
        calls: AtomicUsize,
    }

    impl Transport for FixedTransport {
        fn handle_init(&self) -> TransportHandle {
            TransportHandle::stateless()
        }

        fn fetch(
            &self,
            _session: &mut TransportHandle,
            _request: &TransferRequest<'_>,
            sink: &mut std::fs::File,
        ) -> Result<TransferOutcome, crate::download::TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            sink.write_all(b"\x89PNGtile").unwrap();
            Ok(TransferOutcome::Fetched)
        }
    }

    #[test]
    fn test_batch_commits_every_address() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FixedTransport {
            calls: AtomicUsize::new(0),
        });
        let manager = DownloadManager::with_transport(transport.clone());
        let source = SlippySource::new(13, "OSM Mapnik", "tile.example.org", "/{z}/{x}/{y}.png");

        let addrs: Vec<TileAddress> = (0..12)
            .map(|i| TileAddress {
                source: 13,
                x: i,
                y: i + 1,
                scale: 10,
                zone: None,
            })
            .collect();

        let report = fetch_batch(&manager, &source, dir.path(), &addrs, 4, None);

        assert_eq!(report.committed, 12);
        assert_eq!(report.total(), 12);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 12);
        for addr in &addrs {
            assert!(cache::tile_path(dir.path(), addr).exists());
        }
    }

    #[test]
    fn test_batch_skips_already_cached() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FixedTransport {
            calls: AtomicUsize::new(0),
        });
        let manager = DownloadManager::with_transport(transport.clone());
        let source = SlippySource::new(13, "OSM Mapnik", "tile.example.org", "/{z}/{x}/{y}.png");

        let addr = TileAddress {
            source: 13,
            x: 5,
            y: 6,
            scale: 10,
            zone: None,
        };
        let dest = cache::tile_path(dir.path(), &addr);
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(&dest, b"cached").unwrap();

        let report = fetch_batch(&manager, &source, dir.path(), &[addr], 2, None);

        assert_eq!(report.skipped, 1);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }
}
