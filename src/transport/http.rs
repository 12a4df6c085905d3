//! Network transport backed by `reqwest`'s blocking client.
//!
//! Automatic redirects are disabled so 3xx responses reach the engines,
//! which own the redirect loop. Response decompression is off; bodies are
//! streamed to disk byte-for-byte.

use std::fmt;
use std::io::{self, Read};

use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Method, redirect};
use tracing::{debug, instrument};

use super::{FtpConnection, HttpConnection, HttpRequest, HttpResponse, Transport};
use crate::config::ClientConfig;
use crate::error::FetchError;
use crate::locator::Locator;

/// Transport that reaches real HTTP(S) and FTP servers.
///
/// Cheap to share: the underlying HTTP client is reference counted and one
/// `NetTransport` can serve many calls from many threads.
#[derive(Clone)]
pub struct NetTransport {
    client: Client,
    config: ClientConfig,
}

impl fmt::Debug for NetTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl NetTransport {
    /// Builds the HTTP client for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::TransportInit`] if the client cannot be built
    /// (for example, the TLS backend fails to initialize).
    #[instrument(level = "debug", skip(config))]
    pub fn new(config: &ClientConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .pool_max_idle_per_host(0)
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()
            .map_err(|e| FetchError::transport_init(e.to_string()))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

impl Transport for NetTransport {
    fn connect_http(
        &self,
        locator: &Locator,
        user_agent: &str,
    ) -> Result<Box<dyn HttpConnection + '_>, FetchError> {
        debug!(host = %locator.host(), port = locator.port(), secure = locator.scheme().is_secure(), "opening HTTP connection");
        Ok(Box::new(ReqwestConnection {
            client: &self.client,
            user_agent: user_agent.to_string(),
        }))
    }

    fn connect_ftp(
        &self,
        locator: &Locator,
        _user_agent: &str,
    ) -> Result<Box<dyn FtpConnection + '_>, FetchError> {
        let connection = super::ftp::SuppaConnection::open(locator, &self.config)?;
        Ok(Box::new(connection))
    }
}

struct ReqwestConnection<'a> {
    client: &'a Client,
    user_agent: String,
}

impl HttpConnection for ReqwestConnection<'_> {
    fn send(&mut self, request: &HttpRequest<'_>) -> Result<Box<dyn HttpResponse>, FetchError> {
        let url = request.locator.as_str();
        let method = Method::from_bytes(request.verb.as_bytes()).map_err(|_| {
            FetchError::request_failed(url, format!("invalid HTTP verb `{}`", request.verb))
        })?;

        let mut builder = self
            .client
            .request(method, request.locator.url().clone())
            .header(USER_AGENT, self.user_agent.as_str())
            .header(ACCEPT, "*/*");
        for (name, value) in parse_header_block(request.headers) {
            builder = builder.header(name, value);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.to_vec());
        }

        let response = builder.send().map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                FetchError::connection(request.locator.host(), request.locator.port(), e.to_string())
            } else {
                FetchError::request_failed(url, e.to_string())
            }
        })?;
        Ok(Box::new(ReqwestResponse { inner: response }))
    }
}

/// Splits a caller-formatted header block into typed header pairs.
///
/// Lines that are not `Name: value` or that carry invalid characters are
/// skipped with a debug log.
fn parse_header_block(block: &str) -> Vec<(HeaderName, HeaderValue)> {
    block
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let Some((name, value)) = line.split_once(':') else {
                debug!(line = %line, "skipping malformed header line");
                return None;
            };
            let name = HeaderName::from_bytes(name.trim().as_bytes()).ok();
            let value = HeaderValue::from_str(value.trim()).ok();
            match (name, value) {
                (Some(name), Some(value)) => Some((name, value)),
                _ => {
                    debug!(line = %line, "skipping invalid header line");
                    None
                }
            }
        })
        .collect()
}

struct ReqwestResponse {
    inner: Response,
}

impl Read for ReqwestResponse {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl HttpResponse for ReqwestResponse {
    fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    fn header(&self, name: &str) -> Option<String> {
        self.inner
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn raw_headers(&self) -> String {
        let mut raw = format!("{:?} {}\n", self.inner.version(), self.inner.status());
        for (name, value) in self.inner.headers() {
            raw.push_str(name.as_str());
            raw.push_str(": ");
            raw.push_str(&String::from_utf8_lossy(value.as_bytes()));
            raw.push('\n');
        }
        raw
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header_block_crlf_lines() {
        let headers = parse_header_block("X-Token: abc\r\nAccept-Language: en\r\n");
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].0.as_str(), "x-token");
        assert_eq!(headers[0].1.to_str().unwrap(), "abc");
        assert_eq!(headers[1].0.as_str(), "accept-language");
    }

    #[test]
    fn test_parse_header_block_skips_malformed_lines() {
        let headers = parse_header_block("no colon here\r\nBad Name: x\r\nX-Ok: 1");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].0.as_str(), "x-ok");
    }

    #[test]
    fn test_parse_header_block_value_may_contain_colon() {
        let headers = parse_header_block("Referer: https://example.com/a\r\n");
        assert_eq!(headers[0].1.to_str().unwrap(), "https://example.com/a");
    }

    #[test]
    fn test_parse_header_block_empty() {
        assert!(parse_header_block("").is_empty());
    }

    #[test]
    fn test_net_transport_builds_with_defaults() {
        let transport = NetTransport::new(&ClientConfig::default()).unwrap();
        assert!(format!("{transport:?}").contains("max_redirects: 4"));
    }
}
