//! Fetch progress events.
//!
//! The manager reports progress as discrete events over a channel instead
//! of invoking UI callbacks, so consumers (CLI progress bars, a GUI thread,
//! tests) run independently of the fetching threads and the core never
//! assumes any thread affinity. Events are best-effort: a dropped receiver
//! never fails a fetch.

use std::path::PathBuf;

use crate::download::DownloadStatus;

/// One observable step of a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    /// A transfer for this destination has begun. Emitted only when the
    /// fetch actually reaches the network step, never for skips.
    Started { dest: PathBuf },
    /// The fetch for this destination finished with the given outcome.
    /// Emitted exactly once per fetch call, including skips.
    Finished {
        dest: PathBuf,
        status: DownloadStatus,
    },
}

impl FetchEvent {
    /// The destination path this event refers to.
    pub fn dest(&self) -> &PathBuf {
        match self {
            FetchEvent::Started { dest } => dest,
            FetchEvent::Finished { dest, .. } => dest,
        }
    }
}
