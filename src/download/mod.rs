//! Download engine: redirect-following, staleness-aware, atomic file writes.
//!
//! # Features
//!
//! - Explicit redirect loop with a bounded counter
//! - Filename from an explicit name, the URL path, or `Content-Disposition`
//! - Skip when the local file already matches the remote size and time
//! - Streaming writes to a `~` temp file, committed with a single rename
//! - Progress snapshots after every chunk, with an optional callback

pub(crate) mod constants;
mod engine;
pub(crate) mod filename;
mod request;
mod writer;

pub use engine::Fetcher;
pub(crate) use engine::{REDIRECT_STATUSES, redirect_target};
pub use request::{DownloadFlags, DownloadOutcome, DownloadRequest, WorkStatus};
pub use writer::temp_path_for;

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, FetchError>` explicitly in function signatures.
