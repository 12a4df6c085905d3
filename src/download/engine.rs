//! Redirect-following download engine.
//!
//! Each call runs an explicit hop loop: parse the locator, dispatch on its
//! scheme, issue the request, and either follow a redirect with a fresh
//! connection or hand the body to the streaming writer. The previous hop's
//! connection and response are dropped before the next hop opens its own.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info, instrument};

use super::filename::{parse_content_disposition, resolve_target_path, sanitize_filename};
use super::request::{DownloadFlags, DownloadOutcome, DownloadRequest, WorkStatus};
use super::writer::{WriteJob, stream_to_file};
use crate::config::ClientConfig;
use crate::diagnostics::Diagnostics;
use crate::error::FetchError;
use crate::locator::{Locator, Scheme};
use crate::progress::{ProgressDisplay, ProgressSnapshot};
use crate::staleness::{RemoteStamp, is_stale};
use crate::transport::{BodyStream, HttpRequest, HttpResponse, NetTransport, Transport};

/// HTTP statuses treated as "go look over there".
pub(crate) const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// Entry point for downloads and queries.
///
/// A fetcher holds only read-only state, so one instance can be shared by
/// reference across threads; each call owns its own connections and buffers.
///
/// # Example
///
/// ```no_run
/// use fetchkit_core::{DownloadFlags, Fetcher};
/// use std::path::Path;
///
/// # fn example() -> Result<(), fetchkit_core::FetchError> {
/// let fetcher = Fetcher::new()?;
/// let outcome = fetcher.download_as(
///     "https://example.com/file.zip",
///     Path::new("./downloads"),
///     None,
///     DownloadFlags::SHOW_PROGRESS,
/// )?;
/// println!("saved to {}", outcome.path.display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Fetcher<T: Transport = NetTransport> {
    transport: T,
    config: ClientConfig,
}

impl Fetcher<NetTransport> {
    /// Creates a fetcher with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::TransportInit`] if the network client cannot be
    /// built.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a fetcher with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::TransportInit`] if the network client cannot be
    /// built.
    pub fn with_config(config: ClientConfig) -> Result<Self, FetchError> {
        let transport = NetTransport::new(&config)?;
        Ok(Self { transport, config })
    }
}

/// Outcome of one HTTP hop.
enum Hop {
    Redirect(Locator),
    Done(DownloadOutcome),
}

impl<T: Transport> Fetcher<T> {
    /// Creates a fetcher over a caller-supplied transport.
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Downloads a resource as described by `request`.
    ///
    /// Returns [`WorkStatus::Skipped`] without transferring anything when the
    /// destination already matches the remote size and modification time.
    ///
    /// # Errors
    ///
    /// Any [`FetchError`]; a failure at any hop aborts the whole call. A
    /// partially written `~` temp file is left in place.
    #[instrument(skip(self, request), fields(url = %request.url()))]
    pub fn download(&self, mut request: DownloadRequest<'_>) -> Result<DownloadOutcome, FetchError> {
        let diagnostics = Diagnostics::new(request.log_enabled);
        let outcome = diagnostics.check(self.run_download(&mut request, diagnostics))?;
        if outcome.is_skipped() {
            debug!(path = %outcome.path.display(), "download skipped, file is current");
        } else {
            info!(
                path = %outcome.path.display(),
                bytes = outcome.progress.downloaded,
                redirects = outcome.redirects,
                "download complete"
            );
        }
        Ok(outcome)
    }

    /// Downloads `url` to `full_path` (directory and filename).
    ///
    /// # Errors
    ///
    /// Same as [`download`](Self::download).
    pub fn download_file(
        &self,
        url: &str,
        full_path: &Path,
        flags: DownloadFlags,
    ) -> Result<DownloadOutcome, FetchError> {
        let dir = full_path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut request = DownloadRequest::new(url, dir).with_flags(flags);
        if let Some(name) = full_path.file_name() {
            request = request.with_file_name(name.to_string_lossy());
        }
        self.download(request)
    }

    /// Downloads `url` into `dest_dir`, optionally under `file_name`.
    ///
    /// Without a name, the URL's last path segment is used unless the server
    /// supplies an attachment filename.
    ///
    /// # Errors
    ///
    /// Same as [`download`](Self::download).
    pub fn download_as(
        &self,
        url: &str,
        dest_dir: &Path,
        file_name: Option<&str>,
        flags: DownloadFlags,
    ) -> Result<DownloadOutcome, FetchError> {
        let mut request = DownloadRequest::new(url, dest_dir).with_flags(flags);
        if let Some(name) = file_name {
            request = request.with_file_name(name);
        }
        self.download(request)
    }

    fn run_download(
        &self,
        request: &mut DownloadRequest<'_>,
        diagnostics: Diagnostics,
    ) -> Result<DownloadOutcome, FetchError> {
        let mut locator = Locator::parse(&request.url)?;
        let limit = request.redirect_limit(self.config.max_redirects);
        let mut redirects = 0u32;

        loop {
            let hop = match locator.scheme() {
                Scheme::Ftp => return self.ftp_download(&locator, request, redirects, diagnostics),
                Scheme::Http | Scheme::Https => {
                    self.http_hop(&locator, request, redirects, diagnostics)?
                }
            };
            match hop {
                Hop::Done(outcome) => return Ok(outcome),
                Hop::Redirect(next) => {
                    if redirects >= limit {
                        return Err(FetchError::redirect_limit(locator.as_str(), limit));
                    }
                    redirects += 1;
                    diagnostics.event(next.as_str(), "following redirect");
                    locator = next;
                }
            }
        }
    }

    fn http_hop(
        &self,
        locator: &Locator,
        request: &mut DownloadRequest<'_>,
        redirects: u32,
        diagnostics: Diagnostics,
    ) -> Result<Hop, FetchError> {
        let header_limit = request.header_length.unwrap_or(self.config.header_length);
        let user_agent = request
            .user_agent
            .as_deref()
            .unwrap_or(&self.config.user_agent);

        let mut connection = self.transport.connect_http(locator, user_agent)?;
        let mut response = connection.send(&HttpRequest {
            verb: "GET",
            locator,
            headers: "",
            body: &[],
        })?;
        diagnostics.headers(locator.as_str(), &response.raw_headers());

        let status = response.status();
        if REDIRECT_STATUSES.contains(&status) {
            return redirect_target(locator, &*response, header_limit).map(Hop::Redirect);
        }
        if status != 200 {
            return Err(FetchError::request_status(locator.as_str(), status));
        }

        let captured = response
            .header("content-disposition")
            .filter(|v| v.len() <= header_limit)
            .and_then(|v| parse_content_disposition(&v))
            .or_else(|| locator.file_name());
        let target = resolve_target_path(
            &request.dest_dir,
            request.file_name.as_deref(),
            captured.as_deref(),
        )
        .ok_or_else(|| FetchError::no_download_path(locator.as_str()))?;
        let remote = RemoteStamp::new(content_length(&*response), last_modified(&*response));
        debug!(path = %target.display(), size = ?remote.size, "resolved output path");

        if let Some(skipped) = skip_if_current(locator, &target, &remote, request, redirects, diagnostics) {
            return Ok(Hop::Done(skipped));
        }
        self.transfer(locator, target, &remote, request, redirects, &mut response)
            .map(Hop::Done)
    }

    /// FTP is a reduced-feature mode: no redirects and no server-supplied
    /// filename beyond the listed entry name.
    fn ftp_download(
        &self,
        locator: &Locator,
        request: &mut DownloadRequest<'_>,
        redirects: u32,
        diagnostics: Diagnostics,
    ) -> Result<DownloadOutcome, FetchError> {
        let user_agent = request
            .user_agent
            .as_deref()
            .unwrap_or(&self.config.user_agent);
        let mut connection = self.transport.connect_ftp(locator, user_agent)?;
        let path = locator.decoded_path();

        let entry = connection
            .lookup(&path)?
            .ok_or_else(|| FetchError::not_found(locator.as_str()))?;
        diagnostics.event(locator.as_str(), "remote file found");

        let captured = Some(entry.name.trim())
            .filter(|n| !n.is_empty())
            .map(sanitize_filename)
            .or_else(|| locator.file_name());
        let target = resolve_target_path(
            &request.dest_dir,
            request.file_name.as_deref(),
            captured.as_deref(),
        )
        .ok_or_else(|| FetchError::no_download_path(locator.as_str()))?;
        let remote = RemoteStamp::new(entry.size, entry.modified);

        if let Some(skipped) = skip_if_current(locator, &target, &remote, request, redirects, diagnostics) {
            return Ok(skipped);
        }
        let mut stream = connection.retrieve(&path)?;
        self.transfer(locator, target, &remote, request, redirects, &mut *stream)
    }

    fn transfer(
        &self,
        locator: &Locator,
        target: PathBuf,
        remote: &RemoteStamp,
        request: &mut DownloadRequest<'_>,
        redirects: u32,
        reader: &mut dyn BodyStream,
    ) -> Result<DownloadOutcome, FetchError> {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let display = ProgressDisplay::new(request.show_progress, request.display_flags, &name);
        let job = WriteJob {
            url: locator.as_str(),
            final_path: &target,
            total: remote.size.unwrap_or(0),
            modified: remote.modified,
            chunk_size: self.config.chunk_size,
            cancel: request.cancel.as_ref(),
            display: &display,
        };
        let callback = &mut request.progress_callback;
        let mut notify = |snapshot: &ProgressSnapshot| {
            if let Some(callback) = callback.as_mut() {
                callback(snapshot);
            }
        };

        let progress = stream_to_file(reader, &job, &mut notify)?;
        Ok(DownloadOutcome {
            status: WorkStatus::Completed,
            path: target,
            url: locator.as_str().to_string(),
            redirects,
            progress,
        })
    }
}

fn skip_if_current(
    locator: &Locator,
    target: &Path,
    remote: &RemoteStamp,
    request: &DownloadRequest<'_>,
    redirects: u32,
    diagnostics: Diagnostics,
) -> Option<DownloadOutcome> {
    if is_stale(target, remote, request.force_download) {
        return None;
    }
    diagnostics.event(locator.as_str(), "local file is current, nothing to transfer");
    Some(DownloadOutcome {
        status: WorkStatus::Skipped,
        path: target.to_path_buf(),
        url: locator.as_str().to_string(),
        redirects,
        progress: ProgressSnapshot {
            total: remote.size.unwrap_or(0),
            ..ProgressSnapshot::default()
        },
    })
}

/// Reads and resolves the `Location` header of a redirect response.
pub(crate) fn redirect_target(
    locator: &Locator,
    response: &dyn HttpResponse,
    header_limit: usize,
) -> Result<Locator, FetchError> {
    let location = response
        .header("location")
        .filter(|v| !v.trim().is_empty() && v.len() <= header_limit)
        .ok_or_else(|| FetchError::header_query(locator.as_str(), "Location"))?;
    locator.resolve_redirect(&location)
}

fn content_length(response: &dyn HttpResponse) -> Option<u64> {
    response
        .header("content-length")
        .and_then(|v| v.trim().parse().ok())
}

fn last_modified(response: &dyn HttpResponse) -> Option<SystemTime> {
    response
        .header("last-modified")
        .and_then(|v| httpdate::parse_http_date(v.trim()).ok())
}
