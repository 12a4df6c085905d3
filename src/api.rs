//! One-shot convenience calls over a default [`Fetcher`].
//!
//! Each call builds its own network client; callers making many requests
//! should keep a `Fetcher` around instead.

use std::path::Path;

use crate::download::{DownloadFlags, DownloadOutcome, DownloadRequest};
use crate::error::FetchError;
use crate::query::{QueryRequest, QueryResponse};
use crate::Fetcher;

/// Downloads `url` to `full_path`.
///
/// # Errors
///
/// See [`Fetcher::download`].
pub fn download(
    url: &str,
    full_path: &Path,
    flags: DownloadFlags,
) -> Result<DownloadOutcome, FetchError> {
    Fetcher::new()?.download_file(url, full_path, flags)
}

/// Downloads `url` into `dest_dir`, optionally under `file_name`.
///
/// # Errors
///
/// See [`Fetcher::download`].
pub fn download_as(
    url: &str,
    dest_dir: &Path,
    file_name: Option<&str>,
    flags: DownloadFlags,
) -> Result<DownloadOutcome, FetchError> {
    Fetcher::new()?.download_as(url, dest_dir, file_name, flags)
}

/// Downloads with a full parameter record.
///
/// # Errors
///
/// See [`Fetcher::download`].
pub fn download_with(request: DownloadRequest<'_>) -> Result<DownloadOutcome, FetchError> {
    Fetcher::new()?.download(request)
}

/// Sends a simple query.
///
/// # Errors
///
/// See [`Fetcher::query_with`].
pub fn query(
    url: &str,
    verb: Option<&str>,
    body: Option<&[u8]>,
    content_type: Option<&str>,
) -> Result<QueryResponse, FetchError> {
    Fetcher::new()?.query(url, verb, body, content_type)
}

/// Sends a query with a full request record.
///
/// # Errors
///
/// See [`Fetcher::query_with`].
pub fn query_with(request: &QueryRequest) -> Result<QueryResponse, FetchError> {
    Fetcher::new()?.query_with(request)
}
