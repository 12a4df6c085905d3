//! Buffered request/response queries over HTTP(S).
//!
//! Unlike downloads, a query keeps the whole response body in memory and
//! returns it with the status. Any status that is not a redirect is a
//! successful query; callers inspect [`QueryResponse::status`] themselves.

use std::io::{ErrorKind, Read};

use tracing::{debug, instrument};

use crate::diagnostics::Diagnostics;
use crate::download::{REDIRECT_STATUSES, redirect_target};
use crate::error::FetchError;
use crate::locator::Locator;
use crate::transport::{HttpRequest, Transport};
use crate::Fetcher;

/// Initial capacity of the response body buffer (64 KiB).
const INITIAL_BODY_CAPACITY: usize = 64 * 1024;

/// Full parameter record for a query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryRequest {
    pub url: String,
    /// HTTP verb; `GET` when absent.
    pub verb: Option<String>,
    /// User-Agent; the fetcher's default when absent.
    pub user_agent: Option<String>,
    /// Synthesized into a `Content-Type` header ahead of `headers`.
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    /// Raw header block, `Name: value` lines separated by CRLF, sent as-is.
    pub headers: String,
    /// Redirect budget; zero means the fetcher's default.
    pub max_redirects: u32,
    pub log_enabled: bool,
}

impl QueryRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_verb(mut self, verb: impl Into<String>) -> Self {
        self.verb = Some(verb.into());
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>, content_type: Option<&str>) -> Self {
        self.body = body.into();
        self.content_type = content_type.map(str::to_string);
        self
    }

    /// Appends one `Name: value` line to the raw header block.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push_str(name);
        self.headers.push_str(": ");
        self.headers.push_str(value);
        self.headers.push_str("\r\n");
        self
    }

    /// Replaces the raw header block.
    #[must_use]
    pub fn with_raw_headers(mut self, headers: impl Into<String>) -> Self {
        self.headers = headers.into();
        self
    }

    #[must_use]
    pub fn with_max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    #[must_use]
    pub fn with_log(mut self, enabled: bool) -> Self {
        self.log_enabled = enabled;
        self
    }

    /// Header block actually sent: `Content-Type` first, caller lines after.
    fn header_block(&self) -> String {
        let mut block = String::new();
        if let Some(content_type) = self.content_type.as_deref().filter(|c| !c.is_empty()) {
            block.push_str("Content-Type: ");
            block.push_str(content_type);
            block.push_str("\r\n");
        }
        block.push_str(&self.headers);
        block
    }
}

/// Status and body of a completed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResponse {
    status: u16,
    body: Vec<u8>,
}

impl QueryResponse {
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Number of body bytes received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Body decoded as UTF-8, with invalid sequences replaced.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    #[must_use]
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

impl<T: Transport> Fetcher<T> {
    /// Sends a simple query: `verb` (default `GET`) with an optional body.
    ///
    /// # Errors
    ///
    /// Same as [`query_with`](Self::query_with).
    pub fn query(
        &self,
        url: &str,
        verb: Option<&str>,
        body: Option<&[u8]>,
        content_type: Option<&str>,
    ) -> Result<QueryResponse, FetchError> {
        let mut request = QueryRequest::new(url);
        request.verb = verb.map(str::to_string);
        request.body = body.map(<[u8]>::to_vec).unwrap_or_default();
        request.content_type = content_type.map(str::to_string);
        self.query_with(&request)
    }

    /// Sends a query described by a full request record.
    ///
    /// Redirects are followed with the same verb, body, and headers until the
    /// budget runs out.
    ///
    /// # Errors
    ///
    /// - [`FetchError::UnknownScheme`] for anything but http and https.
    /// - [`FetchError::RedirectLimitExceeded`] when the budget is spent.
    /// - Connection, request, read, and allocation failures.
    #[instrument(skip(self, request), fields(url = %request.url))]
    pub fn query_with(&self, request: &QueryRequest) -> Result<QueryResponse, FetchError> {
        let diagnostics = Diagnostics::new(request.log_enabled);
        diagnostics.check(self.run_query(request, diagnostics))
    }

    fn run_query(
        &self,
        request: &QueryRequest,
        diagnostics: Diagnostics,
    ) -> Result<QueryResponse, FetchError> {
        let mut locator = Locator::parse(&request.url)?;
        let verb = request.verb.as_deref().filter(|v| !v.is_empty()).unwrap_or("GET");
        let user_agent = request
            .user_agent
            .as_deref()
            .unwrap_or(&self.config().user_agent);
        let headers = request.header_block();
        let limit = if request.max_redirects == 0 {
            self.config().max_redirects
        } else {
            request.max_redirects
        };
        let mut budget = limit;

        loop {
            if !locator.scheme().is_http() {
                return Err(FetchError::unknown_scheme(
                    locator.as_str(),
                    locator.scheme().as_str(),
                ));
            }

            let mut connection = self.transport().connect_http(&locator, user_agent)?;
            let mut response = connection.send(&HttpRequest {
                verb,
                locator: &locator,
                headers: &headers,
                body: &request.body,
            })?;
            diagnostics.headers(locator.as_str(), &response.raw_headers());

            let status = response.status();
            if !REDIRECT_STATUSES.contains(&status) {
                let body = read_body(&mut response, locator.as_str(), self.config().chunk_size)?;
                debug!(status, bytes = body.len(), "query complete");
                return Ok(QueryResponse { status, body });
            }

            let next = redirect_target(&locator, &*response, self.config().header_length)?;
            if budget == 0 {
                return Err(FetchError::redirect_limit(locator.as_str(), limit));
            }
            drop(response);
            drop(connection);
            budget -= 1;
            diagnostics.event(next.as_str(), "following redirect");
            locator = next;
        }
    }
}

/// Reads a response body into a buffer that starts at 64 KiB and doubles
/// whenever it fills.
fn read_body(
    reader: &mut dyn Read,
    url: &str,
    chunk_size: usize,
) -> Result<Vec<u8>, FetchError> {
    let mut body: Vec<u8> = Vec::new();
    body.try_reserve_exact(INITIAL_BODY_CAPACITY)
        .map_err(|_| FetchError::allocation(INITIAL_BODY_CAPACITY))?;
    let mut chunk: Vec<u8> = Vec::new();
    chunk
        .try_reserve_exact(chunk_size)
        .map_err(|_| FetchError::allocation(chunk_size))?;
    chunk.resize(chunk_size, 0);

    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FetchError::read(url, e)),
        };
        if body.capacity() - body.len() < read {
            let mut target = body.capacity().max(1);
            while target - body.len() < read {
                target = target.saturating_mul(2);
            }
            body.try_reserve_exact(target - body.len())
                .map_err(|_| FetchError::allocation(target))?;
        }
        body.extend_from_slice(&chunk[..read]);
    }
    Ok(body)
}
