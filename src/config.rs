//! Client-wide settings shared by downloads and queries.

use std::time::Duration;

use crate::download::constants::{
    CHUNK_SIZE, CONNECT_TIMEOUT_SECS, DEFAULT_HEADER_LENGTH, DEFAULT_MAX_REDIRECTS,
    READ_TIMEOUT_SECS,
};
use crate::user_agent;

/// Settings applied to every request a [`Fetcher`](crate::Fetcher) makes
/// unless a request overrides them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// User-Agent sent when a request does not carry its own.
    pub user_agent: String,
    /// Redirects followed when a request does not set its own limit.
    pub max_redirects: u32,
    /// Upper bound on the length of a header value read from a response.
    pub header_length: usize,
    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,
    /// Timeout applied to each network operation separately: sending the
    /// request and then every body read.
    pub read_timeout: Duration,
    /// Size of the buffer used for each body read.
    pub chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: user_agent::default_user_agent(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            header_length: DEFAULT_HEADER_LENGTH,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            chunk_size: CHUNK_SIZE,
        }
    }
}

impl ClientConfig {
    /// Replaces the default User-Agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Replaces the default redirect limit.
    #[must_use]
    pub fn with_max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Replaces both timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    /// Replaces the transfer chunk size. Zero is clamped to one byte.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}
