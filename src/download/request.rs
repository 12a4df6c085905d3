//! Download request and outcome records.

use std::fmt;
use std::path::{Path, PathBuf};

use bitflags::bitflags;

use crate::cancel::CancelToken;
use crate::progress::{DisplayFlags, ProgressSnapshot};

bitflags! {
    /// Options for the simple download calls. Each bit is independent.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DownloadFlags: u32 {
        /// Render a progress line on stderr.
        const SHOW_PROGRESS = 1 << 0;
        /// Promote request/response diagnostics to `info`/`warn`.
        const SHOW_LOG = 1 << 1;
        /// Download even if the local file looks current.
        const FORCE_DOWNLOAD = 1 << 2;
    }
}

/// Whether a successful download transferred bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    /// The file was transferred and committed.
    Completed,
    /// The local file was already current; nothing was transferred.
    Skipped,
}

type ProgressCallback<'a> = Box<dyn FnMut(&ProgressSnapshot) + 'a>;

/// Full parameter record for a download.
///
/// Built with [`DownloadRequest::new`] and the `with_*` methods; anything not
/// set falls back to the fetcher's [`ClientConfig`](crate::ClientConfig).
pub struct DownloadRequest<'a> {
    pub(crate) url: String,
    pub(crate) dest_dir: PathBuf,
    pub(crate) file_name: Option<String>,
    pub(crate) user_agent: Option<String>,
    pub(crate) max_redirects: Option<u32>,
    pub(crate) header_length: Option<usize>,
    pub(crate) log_enabled: bool,
    pub(crate) show_progress: bool,
    pub(crate) force_download: bool,
    pub(crate) display_flags: DisplayFlags,
    pub(crate) cancel: Option<CancelToken>,
    pub(crate) progress_callback: Option<ProgressCallback<'a>>,
}

impl<'a> DownloadRequest<'a> {
    /// Request to download `url` into `dest_dir`.
    pub fn new(url: impl Into<String>, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            dest_dir: dest_dir.into(),
            file_name: None,
            user_agent: None,
            max_redirects: None,
            header_length: None,
            log_enabled: false,
            show_progress: false,
            force_download: false,
            display_flags: DisplayFlags::default(),
            cancel: None,
            progress_callback: None,
        }
    }

    /// Stores the download under this name instead of a derived one.
    #[must_use]
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Maximum redirects to follow. Zero refuses every redirect.
    #[must_use]
    pub fn with_max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = Some(max_redirects);
        self
    }

    /// Upper bound on header values (such as `Location`) the engine accepts.
    #[must_use]
    pub fn with_header_length(mut self, header_length: usize) -> Self {
        self.header_length = Some(header_length);
        self
    }

    #[must_use]
    pub fn with_log(mut self, enabled: bool) -> Self {
        self.log_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force_download = force;
        self
    }

    #[must_use]
    pub fn with_display_flags(mut self, flags: DisplayFlags) -> Self {
        self.display_flags = flags;
        self
    }

    /// Applies the simple-call flag bits.
    #[must_use]
    pub fn with_flags(self, flags: DownloadFlags) -> Self {
        self.with_progress(flags.contains(DownloadFlags::SHOW_PROGRESS))
            .with_log(flags.contains(DownloadFlags::SHOW_LOG))
            .with_force(flags.contains(DownloadFlags::FORCE_DOWNLOAD))
    }

    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Registers a callback run synchronously after every chunk written.
    #[must_use]
    pub fn on_progress(mut self, callback: impl FnMut(&ProgressSnapshot) + 'a) -> Self {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// Effective redirect limit given the configured default.
    pub(crate) fn redirect_limit(&self, default: u32) -> u32 {
        self.max_redirects.unwrap_or(default)
    }
}

impl fmt::Debug for DownloadRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadRequest")
            .field("url", &self.url)
            .field("dest_dir", &self.dest_dir)
            .field("file_name", &self.file_name)
            .field("user_agent", &self.user_agent)
            .field("max_redirects", &self.max_redirects)
            .field("header_length", &self.header_length)
            .field("log_enabled", &self.log_enabled)
            .field("show_progress", &self.show_progress)
            .field("force_download", &self.force_download)
            .field("display_flags", &self.display_flags)
            .field("cancel", &self.cancel.is_some())
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

/// Result of a successful download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOutcome {
    pub status: WorkStatus,
    /// Destination path (written, or left untouched when skipped).
    pub path: PathBuf,
    /// URL of the hop that served the content.
    pub url: String,
    /// Redirects followed to get there.
    pub redirects: u32,
    /// Final progress; `downloaded` is zero when skipped.
    pub progress: ProgressSnapshot,
}

impl DownloadOutcome {
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.status == WorkStatus::Skipped
    }
}
