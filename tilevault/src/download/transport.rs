//! Network transport abstraction for tile retrieval.
//!
//! A transport performs one round trip per call: it writes the response
//! payload into the destination file handle it is given and reports a
//! tri-state outcome (fetched, not modified, or an error with detail).
//! Redirect-following and conditional-request semantics are part of the
//! contract every implementation must satisfy.
//!
//! Sessions amortize connection and TLS setup across a batch of fetches.
//! A [`TransportHandle`] is type-erased so the manager can treat every
//! transport uniformly; each implementation downcasts to its own session
//! state. Dropping the handle releases the session.

use std::any::Any;
use std::fs::File;
use std::io::Write;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::{header, redirect, StatusCode};
use thiserror::Error;
use tracing::debug;

/// Default per-request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Redirect hops followed before a transfer is considered failed.
const MAX_REDIRECTS: usize = 10;

const USER_AGENT: &str = concat!("tilevault/", env!("CARGO_PKG_VERSION"));

/// What one successful round trip produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The payload was written to the destination handle
    Fetched,
    /// The server reported the copy identified by the time condition is
    /// still current; nothing was written
    NotModified,
}

/// Errors a transport can report.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("HTTP status {status} from {url}")]
    Http { status: u16, url: String },

    /// Connection, TLS, or protocol failure below the status line.
    #[error("network error: {0}")]
    Network(String),

    /// The request asked for a scheme this transport does not speak.
    #[error("unsupported scheme for {0}")]
    UnsupportedScheme(String),

    /// The session handle belongs to a different transport.
    #[error("transport session mismatch")]
    SessionMismatch,

    /// Writing the payload to the destination handle failed.
    #[error("I/O error writing payload: {0}")]
    Io(#[from] std::io::Error),
}

/// One tile request as the transport sees it.
#[derive(Debug, Clone, Copy)]
pub struct TransferRequest<'a> {
    /// Host to fetch from
    pub hostname: &'a str,
    /// Absolute request path including query, e.g. `/15/100/200.png`
    pub uri: &'a str,
    /// Referer header value, if the provider wants one
    pub referer: Option<&'a str>,
    /// Only transfer if the remote copy is newer than this
    pub time_condition: Option<SystemTime>,
    /// Request over FTP instead of HTTP
    pub use_ftp: bool,
}

/// Type-erased reusable session state.
///
/// Created by [`Transport::handle_init`]; callers scope one handle across a
/// batch of fetches (for example all tiles of one viewport) and drop it to
/// release the session.
pub struct TransportHandle {
    state: Box<dyn Any + Send>,
}

impl TransportHandle {
    /// Wraps transport-specific session state.
    pub fn new<T: Any + Send>(state: T) -> Self {
        Self {
            state: Box::new(state),
        }
    }

    /// A handle with no state, for transports that keep none.
    pub fn stateless() -> Self {
        Self::new(())
    }

    /// Borrows the state as the concrete session type.
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.state.downcast_mut::<T>()
    }
}

/// One network round trip per call, with a reusable session.
pub trait Transport: Send + Sync {
    /// Creates a fresh session handle for this transport.
    fn handle_init(&self) -> TransportHandle;

    /// Performs the round trip, writing the payload into `sink`.
    fn fetch(
        &self,
        session: &mut TransportHandle,
        request: &TransferRequest<'_>,
        sink: &mut File,
    ) -> Result<TransferOutcome, TransportError>;
}

/// HTTP(S) transport backed by a blocking `reqwest` client.
///
/// The client lives in the session handle, so connection pooling and TLS
/// state carry across every fetch made with the same handle. Conditional
/// requests use `If-Modified-Since`; a 304 answer maps to
/// [`TransferOutcome::NotModified`]. FTP requests are rejected with
/// [`TransportError::UnsupportedScheme`]; an FTP transport would implement
/// the same trait.
pub struct HttpTransport {
    timeout: Duration,
}

/// Session state of [`HttpTransport`]: a lazily-built client.
#[derive(Default)]
struct HttpSession {
    client: Option<Client>,
}

impl HttpSession {
    /// Returns the session's client, building it on first use.
    fn client(&mut self, timeout: Duration) -> Result<&Client, TransportError> {
        match &mut self.client {
            Some(client) => Ok(client),
            slot => {
                let client = Client::builder()
                    .timeout(timeout)
                    .redirect(redirect::Policy::limited(MAX_REDIRECTS))
                    .user_agent(USER_AGENT)
                    .build()
                    .map_err(|e| TransportError::Network(e.to_string()))?;
                Ok(slot.insert(client))
            }
        }
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn handle_init(&self) -> TransportHandle {
        TransportHandle::new(HttpSession::default())
    }

    fn fetch(
        &self,
        session: &mut TransportHandle,
        request: &TransferRequest<'_>,
        sink: &mut File,
    ) -> Result<TransferOutcome, TransportError> {
        if request.use_ftp {
            return Err(TransportError::UnsupportedScheme(format!(
                "ftp://{}{}",
                request.hostname, request.uri
            )));
        }
        let url = format!("https://{}{}", request.hostname, request.uri);

        let state = session
            .downcast_mut::<HttpSession>()
            .ok_or(TransportError::SessionMismatch)?;
        let client = state.client(self.timeout)?;

        let mut builder = client.get(&url);
        if let Some(referer) = request.referer {
            builder = builder.header(header::REFERER, referer);
        }
        if let Some(since) = request.time_condition {
            builder = builder.header(header::IF_MODIFIED_SINCE, http_date(since));
        }

        let mut response = builder
            .send()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            debug!(%url, "remote copy not modified");
            return Ok(TransferOutcome::NotModified);
        }
        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
                url,
            });
        }

        response
            .copy_to(sink)
            .map_err(|e| TransportError::Network(e.to_string()))?;
        sink.flush()?;
        Ok(TransferOutcome::Fetched)
    }
}

/// Formats a timestamp as an IMF-fixdate for `If-Modified-Since`.
fn http_date(time: SystemTime) -> String {
    let datetime: DateTime<Utc> = time.into();
    datetime.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    #[test]
    fn test_http_date_format() {
        let date = http_date(UNIX_EPOCH);
        assert_eq!(date, "Thu, 01 Jan 1970 00:00:00 GMT");

        let date = http_date(UNIX_EPOCH + Duration::from_secs(1_000_000_000));
        assert_eq!(date, "Sun, 09 Sep 2001 01:46:40 GMT");
    }

    #[test]
    fn test_handle_downcast() {
        let transport = HttpTransport::new();
        let mut handle = transport.handle_init();
        assert!(handle.downcast_mut::<HttpSession>().is_some());
        assert!(handle.downcast_mut::<u32>().is_none());

        let mut stateless = TransportHandle::stateless();
        assert!(stateless.downcast_mut::<HttpSession>().is_none());
        assert!(stateless.downcast_mut::<()>().is_some());
    }

    #[test]
    fn test_ftp_is_rejected() {
        let transport = HttpTransport::new();
        let mut handle = transport.handle_init();
        let request = TransferRequest {
            hostname: "example.com",
            uri: "/tile.png",
            referer: None,
            time_condition: None,
            use_ftp: true,
        };
        let mut sink = tempfile::tempfile().unwrap();
        let result = transport.fetch(&mut handle, &request, &mut sink);
        assert!(matches!(result, Err(TransportError::UnsupportedScheme(_))));
    }
}
