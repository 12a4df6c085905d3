//! Per-request diagnostic logging.
//!
//! Requests carry a log flag. When it is set, response headers and failure
//! reasons are emitted at `info`/`warn` so they show up under the default
//! filter; otherwise the same events go to `debug`/`trace`.

use tracing::{debug, info, trace, warn};

use crate::error::FetchError;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Diagnostics {
    enabled: bool,
}

impl Diagnostics {
    pub(crate) fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Logs the raw header block of a response.
    pub(crate) fn headers(self, url: &str, raw: &str) {
        if self.enabled {
            info!(url = %url, headers = %raw, "response headers");
        } else {
            trace!(url = %url, headers = %raw, "response headers");
        }
    }

    /// Logs the reason a request is about to fail.
    pub(crate) fn failure(self, error: &FetchError) {
        if self.enabled {
            warn!(code = error.kind().code(), error = %error, "request failed");
        } else {
            debug!(code = error.kind().code(), error = %error, "request failed");
        }
    }

    /// Logs a step of the transfer (redirects, skips, commits).
    pub(crate) fn event(self, url: &str, message: &str) {
        if self.enabled {
            info!(url = %url, "{message}");
        } else {
            debug!(url = %url, "{message}");
        }
    }

    /// Passes a result through, logging it when it is an error.
    pub(crate) fn check<T>(self, result: Result<T, FetchError>) -> Result<T, FetchError> {
        if let Err(error) = &result {
            self.failure(error);
        }
        result
    }
}
