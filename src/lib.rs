//! Fetchkit Core Library
//!
//! A small blocking retrieval engine: given a URL it resolves the scheme,
//! follows redirects up to a bound, and either streams the body to disk with
//! an atomic commit or buffers it in memory for a query.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`locator`] - URL decomposition and scheme dispatch
//! - [`transport`] - Transport traits and the `reqwest`/`suppaftp` implementation
//! - [`download`] - Redirect-following download engine and streaming writer
//! - [`query`] - Buffered request/response queries
//! - [`progress`] - Percentage, speed, ETA, and progress-line rendering
//! - [`staleness`] - Skip-if-unchanged check for existing files
//!
//! Calls block the calling thread for their full duration. Parallel transfers
//! are independent calls on independent threads sharing one [`Fetcher`].

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod cancel;
pub mod config;
mod diagnostics;
pub mod download;
pub mod error;
pub mod locator;
pub mod progress;
pub mod query;
pub mod staleness;
pub mod transport;
mod user_agent;

// Re-export commonly used types
pub use cancel::CancelToken;
pub use config::ClientConfig;
pub use download::{DownloadFlags, DownloadOutcome, DownloadRequest, Fetcher, WorkStatus};
pub use error::{ErrorKind, FetchError};
pub use locator::{Locator, Scheme};
pub use progress::{DisplayFlags, ProgressSnapshot};
pub use query::{QueryRequest, QueryResponse};
pub use staleness::RemoteStamp;
