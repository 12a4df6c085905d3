//! Transport facility boundary.
//!
//! The engines never talk to the network directly; they go through these
//! traits so the redirect loop, staleness check, and writer can be driven by
//! a scripted transport in tests. [`NetTransport`] is the real
//! implementation: HTTP(S) through `reqwest`'s blocking client and FTP
//! through `suppaftp`.
//!
//! Every handle closes itself when dropped, so an early `?` anywhere in a
//! redirect chain releases the connection it was holding.

mod ftp;
mod http;

use std::io::Read;
use std::time::SystemTime;

use crate::error::FetchError;
use crate::locator::Locator;

pub use http::NetTransport;

/// Opens connections for a resolved locator.
pub trait Transport: Send + Sync {
    /// Opens an HTTP or HTTPS connection to the locator's host.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Connection`] when the host cannot be reached.
    fn connect_http(
        &self,
        locator: &Locator,
        user_agent: &str,
    ) -> Result<Box<dyn HttpConnection + '_>, FetchError>;

    /// Opens and logs in to an FTP control connection.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Connection`] when the host cannot be reached or
    /// refuses the login.
    fn connect_ftp(
        &self,
        locator: &Locator,
        user_agent: &str,
    ) -> Result<Box<dyn FtpConnection + '_>, FetchError>;
}

/// One HTTP request as issued by an engine.
#[derive(Debug, Clone, Copy)]
pub struct HttpRequest<'a> {
    /// Request method, e.g. `GET` or `POST`.
    pub verb: &'a str,
    /// Target of this hop.
    pub locator: &'a Locator,
    /// Raw header block, `Name: value` lines separated by CRLF.
    pub headers: &'a str,
    /// Request body, sent as-is when non-empty.
    pub body: &'a [u8],
}

/// An open HTTP connection.
pub trait HttpConnection {
    /// Issues a request and returns once the status line and headers arrive.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Request`] or [`FetchError::Connection`] when the
    /// request cannot be completed.
    fn send(&mut self, request: &HttpRequest<'_>) -> Result<Box<dyn HttpResponse>, FetchError>;
}

/// A body stream the writer can drain and then confirm.
pub trait BodyStream: Read {
    /// Called once the stream reports end of data, before anything is
    /// committed. Fails when the peer signals the transfer did not complete.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Read`] when the transfer was cut short.
    fn finish(&mut self) -> Result<(), FetchError> {
        Ok(())
    }
}

/// A response whose body is read through [`Read`].
///
/// HTTP framing errors already surface from `read`, so the boxed response
/// finishes trivially.
pub trait HttpResponse: Read {
    fn status(&self) -> u16;

    /// Value of the named header, if present and valid UTF-8.
    fn header(&self, name: &str) -> Option<String>;

    /// Status line and headers, one per line, for diagnostics.
    fn raw_headers(&self) -> String;
}

impl BodyStream for Box<dyn HttpResponse> {}

/// Directory entry returned by an FTP lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Entry name as listed by the server.
    pub name: String,
    pub size: Option<u64>,
    pub modified: Option<SystemTime>,
}

/// An open, logged-in FTP control connection.
pub trait FtpConnection {
    /// Looks up a single path. Returns `Ok(None)` when the server lists no
    /// entry for it.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Request`] when the control connection fails.
    fn lookup(&mut self, path: &str) -> Result<Option<RemoteFile>, FetchError>;

    /// Opens the path for reading. The returned stream borrows the control
    /// connection until it is dropped; [`BodyStream::finish`] reads the
    /// server's closing reply.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Request`] when the server refuses the transfer.
    fn retrieve(&mut self, path: &str) -> Result<Box<dyn BodyStream + '_>, FetchError>;
}
