//! Error types for retrieval operations.
//!
//! Every failure a download or query can hit maps to one `FetchError`
//! variant, each carrying the context (URL, path, status, scheme) needed for
//! diagnostics. `FetchError::kind` collapses a variant to a fieldless
//! [`ErrorKind`] with a stable numeric code for callers that only need to
//! branch or report.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while resolving, requesting, or storing a resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The caller supplied no URL (empty or whitespace only).
    #[error("no URL supplied")]
    NoUrl,

    /// The URL could not be decomposed into a locator.
    #[error("failed to parse URL {url}")]
    UrlParse {
        /// The URL as supplied.
        url: String,
        /// The underlying parser error, when the parser produced one.
        #[source]
        source: Option<url::ParseError>,
    },

    /// The URL scheme is not one of http, https, or ftp.
    #[error("unknown scheme `{scheme}` in {url}")]
    UnknownScheme {
        /// The URL as supplied.
        url: String,
        /// The offending scheme text.
        scheme: String,
    },

    /// The transport facility could not be initialized.
    #[error("failed to initialize transport: {message}")]
    TransportInit {
        /// Description of the initialization failure.
        message: String,
    },

    /// Opening a connection to the remote host failed.
    #[error("connection to {host}:{port} failed: {message}")]
    Connection {
        /// Remote host name.
        host: String,
        /// Remote port.
        port: u16,
        /// Description of the connection failure.
        message: String,
    },

    /// The request could not be issued, or the server answered with a status
    /// that is neither success nor redirect.
    #[error("request to {url} failed: {message}")]
    Request {
        /// The URL of the failing hop.
        url: String,
        /// HTTP status code, when the server answered.
        status: Option<u16>,
        /// Description of the failure.
        message: String,
    },

    /// A required response header was missing or exceeded the header buffer.
    #[error("could not read `{header}` header from {url}")]
    HeaderQuery {
        /// The URL of the failing hop.
        url: String,
        /// Header name that could not be read.
        header: &'static str,
    },

    /// Following another redirect would exceed the configured limit.
    #[error("redirect limit of {limit} exceeded at {url}")]
    RedirectLimitExceeded {
        /// The URL that asked for one redirect too many.
        url: String,
        /// The configured limit.
        limit: u32,
    },

    /// A transfer or response buffer could not be allocated.
    #[error("failed to allocate {requested} bytes")]
    Allocation {
        /// Number of bytes requested.
        requested: usize,
    },

    /// The temporary download file could not be created.
    #[error("failed to create {path}: {source}")]
    FileCreate {
        /// Path that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Applying the timestamp to, or renaming, the completed file failed.
    #[error("failed to commit {path}: {source}")]
    FileCommit {
        /// Final destination path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// No output filename was given, derivable from the URL, or supplied by
    /// the server.
    #[error("no download path could be determined for {url}")]
    NoDownloadPath {
        /// The URL of the resource.
        url: String,
    },

    /// Reading the response body failed mid-transfer.
    #[error("failed reading response body from {url}: {source}")]
    Read {
        /// The URL being read.
        url: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Writing to the temporary download file failed.
    #[error("failed writing to {path}: {source}")]
    FileWrite {
        /// Temporary file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The transfer was cancelled through its cancellation token.
    #[error("transfer from {url} was cancelled")]
    Cancelled {
        /// The URL being transferred.
        url: String,
    },

    /// An FTP directory lookup found no entry for the requested path.
    #[error("remote file not found: {url}")]
    NotFound {
        /// The URL of the missing resource.
        url: String,
    },
}

/// Fieldless classification of a [`FetchError`].
///
/// The numeric codes are stable and shared with the CLI exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoUrl,
    RedirectLimitExceeded,
    UrlParse,
    UnknownScheme,
    TransportInit,
    Connection,
    Allocation,
    Request,
    HeaderQuery,
    NoDownloadPath,
    FileCreate,
    FileCommit,
    Read,
    FileWrite,
    Cancelled,
    NotFound,
}

impl ErrorKind {
    /// Returns the stable numeric code for this kind. Zero is never used.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::NoUrl => 1,
            Self::RedirectLimitExceeded => 2,
            Self::UrlParse => 3,
            Self::UnknownScheme => 4,
            Self::TransportInit => 5,
            Self::Connection => 6,
            Self::Allocation => 7,
            Self::Request => 9,
            Self::HeaderQuery => 10,
            Self::NoDownloadPath => 11,
            Self::FileCreate => 12,
            Self::FileCommit => 13,
            Self::Read => 14,
            Self::FileWrite => 15,
            Self::Cancelled => 16,
            Self::NotFound => 17,
        }
    }
}

impl FetchError {
    /// Classifies this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoUrl => ErrorKind::NoUrl,
            Self::UrlParse { .. } => ErrorKind::UrlParse,
            Self::UnknownScheme { .. } => ErrorKind::UnknownScheme,
            Self::TransportInit { .. } => ErrorKind::TransportInit,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Request { .. } => ErrorKind::Request,
            Self::HeaderQuery { .. } => ErrorKind::HeaderQuery,
            Self::RedirectLimitExceeded { .. } => ErrorKind::RedirectLimitExceeded,
            Self::Allocation { .. } => ErrorKind::Allocation,
            Self::FileCreate { .. } => ErrorKind::FileCreate,
            Self::FileCommit { .. } => ErrorKind::FileCommit,
            Self::NoDownloadPath { .. } => ErrorKind::NoDownloadPath,
            Self::Read { .. } => ErrorKind::Read,
            Self::FileWrite { .. } => ErrorKind::FileWrite,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::NotFound { .. } => ErrorKind::NotFound,
        }
    }

    /// HTTP status preserved by a [`FetchError::Request`], if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => *status,
            _ => None,
        }
    }

    /// Creates a URL parse error.
    pub fn url_parse(url: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Self::UrlParse {
            url: url.into(),
            source,
        }
    }

    /// Creates an unknown-scheme error.
    pub fn unknown_scheme(url: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self::UnknownScheme {
            url: url.into(),
            scheme: scheme.into(),
        }
    }

    /// Creates a transport initialization error.
    pub fn transport_init(message: impl Into<String>) -> Self {
        Self::TransportInit {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    pub fn connection(host: impl Into<String>, port: u16, message: impl Into<String>) -> Self {
        Self::Connection {
            host: host.into(),
            port,
            message: message.into(),
        }
    }

    /// Creates a request error for an unexpected HTTP status.
    pub fn request_status(url: impl Into<String>, status: u16) -> Self {
        Self::Request {
            url: url.into(),
            status: Some(status),
            message: format!("HTTP {status}"),
        }
    }

    /// Creates a request error for a request that produced no status.
    pub fn request_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            url: url.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Creates a header query error.
    pub fn header_query(url: impl Into<String>, header: &'static str) -> Self {
        Self::HeaderQuery {
            url: url.into(),
            header,
        }
    }

    /// Creates a redirect-limit error.
    pub fn redirect_limit(url: impl Into<String>, limit: u32) -> Self {
        Self::RedirectLimitExceeded {
            url: url.into(),
            limit,
        }
    }

    /// Creates an allocation error.
    #[must_use]
    pub fn allocation(requested: usize) -> Self {
        Self::Allocation { requested }
    }

    /// Creates a file creation error.
    pub fn file_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileCreate {
            path: path.into(),
            source,
        }
    }

    /// Creates a file commit error.
    pub fn file_commit(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileCommit {
            path: path.into(),
            source,
        }
    }

    /// Creates a missing-download-path error.
    pub fn no_download_path(url: impl Into<String>) -> Self {
        Self::NoDownloadPath { url: url.into() }
    }

    /// Creates a body read error.
    pub fn read(url: impl Into<String>, source: std::io::Error) -> Self {
        Self::Read {
            url: url.into(),
            source,
        }
    }

    /// Creates a file write error.
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Creates a not-found error.
    pub fn not_found(url: impl Into<String>) -> Self {
        Self::NotFound { url: url.into() }
    }
}

// No `From<std::io::Error>` or `From<reqwest::Error>`: every variant needs a
// URL or path the source error does not carry, so call sites use the
// constructors above.
