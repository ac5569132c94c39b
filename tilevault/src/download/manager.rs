//! Download orchestration.
//!
//! [`DownloadManager::fetch`] is the single entry point that turns a
//! `(hostname, uri, destination)` triple into a committed cache file:
//! cache check, conditional-freshness check, lock acquisition, temp-file
//! transfer, content validation, then atomic commit or rollback.
//!
//! The manager performs no retries. Every failure path cleans up after
//! itself so a later call finds the destination either absent or fully
//! valid, never a partial file.

use std::fs::{self, OpenOptions};
use std::io::Seek;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crossbeam_channel::Sender;
use filetime::FileTime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::download::lock::LockTable;
use crate::download::{
    DownloadOptions, DownloadStatus, FetchEvent, HttpTransport, TransferOutcome, TransferRequest,
    Transport, TransportError, TransportHandle,
};
use crate::telemetry::DownloadMetrics;

/// Orchestrates tile fetches into an on-disk cache.
///
/// One manager is shared by every fetching thread; the embedded lock table
/// is the only mutable state and enforces at most one writer per
/// destination path. Ordering between different destinations is not
/// guaranteed; concurrency is entirely caller-driven.
pub struct DownloadManager {
    transport: Arc<dyn Transport>,
    locks: LockTable,
    events: Option<Sender<FetchEvent>>,
    metrics: Arc<DownloadMetrics>,
    cancel: CancellationToken,
}

impl DownloadManager {
    /// Creates a manager using the HTTP transport.
    pub fn new() -> Self {
        Self::with_transport(Arc::new(HttpTransport::new()))
    }

    /// Creates a manager over a custom transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            locks: LockTable::new(),
            events: None,
            metrics: Arc::new(DownloadMetrics::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Emits fetch progress events on `sender`.
    pub fn with_events(mut self, sender: Sender<FetchEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Observes `token` for cooperative cancellation. A cancelled token
    /// stops fetches before their network step; transfers already past it
    /// run to completion.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The manager's outcome counters.
    pub fn metrics(&self) -> Arc<DownloadMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Creates a reusable transport session. Scope one handle across a
    /// batch of fetches (e.g. every tile of one viewport redraw); dropping
    /// it releases the session.
    pub fn handle_init(&self) -> TransportHandle {
        self.transport.handle_init()
    }

    /// Fetches `uri` from `hostname` into `dest`.
    ///
    /// Returns a [`DownloadStatus`]; see the module docs for the algorithm.
    /// On every return the destination is absent or fully valid, and the
    /// lock on the temp path has been released.
    pub fn fetch(
        &self,
        hostname: &str,
        uri: &str,
        dest: &Path,
        options: &DownloadOptions,
        session: &mut TransportHandle,
    ) -> DownloadStatus {
        let mut time_condition = None;

        if dest.exists() {
            match options.freshness_window {
                Some(window) => match cache_age(dest) {
                    Some(age) if age < window => {
                        debug!(dest = %dest.display(), "cache file within freshness window");
                        return self.finish(dest, DownloadStatus::SkipFresh);
                    }
                    _ => {
                        // Stale: refetch, but let the server skip the body
                        // if nothing changed since our copy's mtime.
                        time_condition = modified_time(dest);
                    }
                },
                None => return self.finish(dest, DownloadStatus::SkipExists),
            }
        } else if let Some(parent) = dest.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                warn!(dir = %parent.display(), %err, "could not create cache directory");
                return self.finish(dest, DownloadStatus::IoError);
            }
        }

        let temp = temp_path(dest);
        let Some(_lock) = self.locks.try_acquire(temp.clone()) else {
            debug!(temp = %temp.display(), "temp file already locked by another fetch");
            return self.finish(dest, DownloadStatus::LockContention);
        };

        let mut file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp)
        {
            Ok(file) => file,
            Err(err) => {
                warn!(temp = %temp.display(), %err, "could not open temp file");
                return self.finish(dest, DownloadStatus::IoError);
            }
        };

        if self.cancel.is_cancelled() {
            drop(file);
            let _ = fs::remove_file(&temp);
            return self.finish(dest, DownloadStatus::Cancelled);
        }

        self.emit(FetchEvent::Started {
            dest: dest.to_path_buf(),
        });

        let request = TransferRequest {
            hostname,
            uri,
            referer: options.referer.as_deref(),
            time_condition,
            use_ftp: options.use_ftp,
        };
        let outcome = match self.transport.fetch(session, &request, &mut file) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(dest = %dest.display(), %err, "download failed");
                drop(file);
                self.discard(&temp, dest);
                let status = match err {
                    TransportError::Http { status, .. } => DownloadStatus::HttpError(status),
                    _ => DownloadStatus::TransportError,
                };
                return self.finish(dest, status);
            }
        };

        if let Some(check) = options.content_check {
            let accepted = file.rewind().is_ok() && check(&mut file);
            if !accepted {
                debug!(dest = %dest.display(), "payload failed content check");
                drop(file);
                self.discard(&temp, dest);
                return self.finish(dest, DownloadStatus::ContentInvalid);
            }
        }

        let written = file.metadata().map(|m| m.len()).unwrap_or(0);
        drop(file);

        match outcome {
            TransferOutcome::NotModified => {
                let _ = fs::remove_file(&temp);
                if let Err(err) = filetime::set_file_mtime(dest, FileTime::now()) {
                    debug!(dest = %dest.display(), %err, "could not refresh cache mtime");
                }
                self.finish(dest, DownloadStatus::SkipNotModified)
            }
            TransferOutcome::Fetched => match fs::rename(&temp, dest) {
                Ok(()) => {
                    self.metrics.add_committed_bytes(written);
                    self.finish(dest, DownloadStatus::Committed)
                }
                Err(err) => {
                    warn!(dest = %dest.display(), %err, "could not move tile into place");
                    let _ = fs::remove_file(&temp);
                    self.finish(dest, DownloadStatus::IoError)
                }
            },
        }
    }

    /// Removes the temp file and, when the destination was created by this
    /// very fetch and is still an empty placeholder, the destination too.
    fn discard(&self, temp: &Path, dest: &Path) {
        let _ = fs::remove_file(temp);
        if let Ok(meta) = fs::metadata(dest) {
            if meta.len() == 0 {
                let _ = fs::remove_file(dest);
            }
        }
    }

    /// Records the outcome and emits the closing event.
    fn finish(&self, dest: &Path, status: DownloadStatus) -> DownloadStatus {
        self.metrics.record(&status);
        self.emit(FetchEvent::Finished {
            dest: dest.to_path_buf(),
            status: status.clone(),
        });
        status
    }

    fn emit(&self, event: FetchEvent) {
        if let Some(sender) = &self.events {
            let _ = sender.send(event);
        }
    }
}

impl Default for DownloadManager {
    fn default() -> Self {
        Self::new()
    }
}

/// `dest` with `.tmp` appended to the full file name.
fn temp_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Age of the file's last modification; a clock-skewed future mtime counts
/// as brand new.
fn cache_age(path: &Path) -> Option<Duration> {
    let mtime = modified_time(path)?;
    Some(
        SystemTime::now()
            .duration_since(mtime)
            .unwrap_or(Duration::ZERO),
    )
}
