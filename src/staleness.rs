//! Decides whether a local file needs to be fetched again.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use tracing::debug;

/// Size and modification time a server advertises for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoteStamp {
    pub size: Option<u64>,
    pub modified: Option<SystemTime>,
}

impl RemoteStamp {
    #[must_use]
    pub fn new(size: Option<u64>, modified: Option<SystemTime>) -> Self {
        Self { size, modified }
    }
}

/// Returns true when `path` must be (re)downloaded.
///
/// A file is stale when `force` is set, when it does not exist, when the
/// remote size is unknown or differs, or when its modification time is
/// strictly older than the remote one. An unknown remote time leaves the
/// size as the only criterion.
#[must_use]
pub fn is_stale(path: &Path, remote: &RemoteStamp, force: bool) -> bool {
    if force {
        return true;
    }
    let Ok(metadata) = fs::metadata(path) else {
        return true;
    };
    if !metadata.is_file() {
        return true;
    }
    let Some(remote_size) = remote.size else {
        debug!(path = %path.display(), "remote size unknown, treating as stale");
        return true;
    };
    if metadata.len() != remote_size {
        return true;
    }
    match (metadata.modified().ok(), remote.modified) {
        (_, None) => false,
        (Some(local), Some(remote)) => local < remote,
        (None, Some(_)) => true,
    }
}
