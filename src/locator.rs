//! URL decomposition and scheme dispatch.
//!
//! A [`Locator`] is parsed once per redirect hop and never mutated. Parsing
//! either yields a complete locator or an error, and an unsupported scheme
//! is rejected here so no transport is ever touched for it.

use std::fmt;

use url::Url;

use crate::download::filename::sanitize_filename;
use crate::error::FetchError;

/// Schemes the engine knows how to retrieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Ftp,
    Http,
    Https,
}

impl Scheme {
    /// Maps scheme text to a supported scheme.
    ///
    /// Matching is case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::UnknownScheme`] carrying the scheme text when it
    /// is not http, https, or ftp.
    pub fn dispatch(url: &str, scheme: &str) -> Result<Self, FetchError> {
        match scheme.to_ascii_lowercase().as_str() {
            "ftp" => Ok(Self::Ftp),
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            _ => Err(FetchError::unknown_scheme(url, scheme)),
        }
    }

    /// True for schemes carried over TLS.
    #[must_use]
    pub fn is_secure(self) -> bool {
        matches!(self, Self::Https)
    }

    /// True for the HTTP family.
    #[must_use]
    pub fn is_http(self) -> bool {
        matches!(self, Self::Http | Self::Https)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ftp => "ftp",
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User name and password embedded in a URL.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Parsed decomposition of a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    scheme: Scheme,
    host: String,
    port: u16,
    credentials: Option<Credentials>,
    url: Url,
}

impl Locator {
    /// Parses a URL into a locator.
    ///
    /// # Errors
    ///
    /// - [`FetchError::NoUrl`] when the input is empty.
    /// - [`FetchError::UrlParse`] when the URL is malformed or has no host.
    /// - [`FetchError::UnknownScheme`] when the scheme is not supported.
    pub fn parse(input: &str) -> Result<Self, FetchError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(FetchError::NoUrl);
        }
        let url = Url::parse(trimmed).map_err(|e| FetchError::url_parse(trimmed, Some(e)))?;
        Self::from_url(url)
    }

    fn from_url(url: Url) -> Result<Self, FetchError> {
        let scheme = Scheme::dispatch(url.as_str(), url.scheme())?;
        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(FetchError::url_parse(url.as_str(), None)),
        };
        let port = url
            .port_or_known_default()
            .ok_or_else(|| FetchError::url_parse(url.as_str(), None))?;
        let credentials = (!url.username().is_empty()).then(|| Credentials {
            username: decode(url.username()),
            password: url.password().map(decode),
        });

        Ok(Self {
            scheme,
            host,
            port,
            credentials,
            url,
        })
    }

    /// Resolves a `Location` value against this locator.
    ///
    /// Absolute locations replace the URL outright; relative ones are joined
    /// onto the current URL.
    ///
    /// # Errors
    ///
    /// Same as [`Locator::parse`].
    pub fn resolve_redirect(&self, location: &str) -> Result<Self, FetchError> {
        let location = location.trim();
        if location.is_empty() {
            return Err(FetchError::NoUrl);
        }
        let joined = self
            .url
            .join(location)
            .map_err(|e| FetchError::url_parse(location, Some(e)))?;
        Self::from_url(joined)
    }

    #[must_use]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Percent-encoded path component, always starting with `/`.
    #[must_use]
    pub fn path(&self) -> &str {
        self.url.path()
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.url.query()
    }

    /// Percent-decoded path, as FTP servers expect it.
    #[must_use]
    pub fn decoded_path(&self) -> String {
        decode(self.url.path())
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Filename derived from the last path segment, query string excluded.
    ///
    /// Returns `None` when the path ends in `/` or has no segments.
    #[must_use]
    pub fn file_name(&self) -> Option<String> {
        let last = self.url.path_segments()?.next_back()?;
        let decoded = decode(last);
        if decoded.trim().is_empty() {
            return None;
        }
        Some(sanitize_filename(&decoded))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

fn decode(value: &str) -> String {
    urlencoding::decode(value).map_or_else(|_| value.to_string(), |v| v.into_owned())
}
