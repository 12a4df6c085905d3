//! Streams a response body into a temporary sibling file and commits it.
//!
//! The final path is only ever touched by the closing rename, so it always
//! holds either the previous file or the complete new one. On failure the
//! `~` temp file is left behind for inspection.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use tracing::debug;

use super::constants::TEMP_SUFFIX;
use crate::cancel::CancelToken;
use crate::error::FetchError;
use crate::progress::{ProgressDisplay, ProgressSnapshot, ProgressTracker};
use crate::transport::BodyStream;

/// Path of the in-flight file for `final_path`: same directory, `~` appended.
#[must_use]
pub fn temp_path_for(final_path: &Path) -> PathBuf {
    let mut name = OsString::from(final_path.as_os_str());
    name.push(TEMP_SUFFIX.to_string());
    PathBuf::from(name)
}

/// Everything the writer needs besides the byte stream.
pub(crate) struct WriteJob<'a> {
    pub url: &'a str,
    pub final_path: &'a Path,
    /// Advertised size, zero when unknown.
    pub total: u64,
    pub modified: Option<SystemTime>,
    pub chunk_size: usize,
    pub cancel: Option<&'a CancelToken>,
    pub display: &'a ProgressDisplay,
}

/// Copies `reader` to the job's temp file in chunks, then renames it over the
/// final path.
///
/// The stream must finish cleanly and, when the size is known, deliver
/// exactly that many bytes before the rename happens.
/// `on_chunk` runs synchronously after every chunk write.
pub(crate) fn stream_to_file(
    reader: &mut dyn BodyStream,
    job: &WriteJob<'_>,
    on_chunk: &mut dyn FnMut(&ProgressSnapshot),
) -> Result<ProgressSnapshot, FetchError> {
    let temp_path = temp_path_for(job.final_path);
    let mut file = File::create(&temp_path).map_err(|e| FetchError::file_create(&temp_path, e))?;

    let mut buffer: Vec<u8> = Vec::new();
    buffer
        .try_reserve_exact(job.chunk_size)
        .map_err(|_| FetchError::allocation(job.chunk_size))?;
    buffer.resize(job.chunk_size, 0);

    let started = Instant::now();
    let mut tracker = ProgressTracker::new(job.total);

    loop {
        if job.cancel.is_some_and(CancelToken::is_cancelled) {
            debug!(path = %temp_path.display(), "transfer cancelled, leaving temp file");
            return Err(FetchError::cancelled(job.url));
        }

        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FetchError::read(job.url, e)),
        };
        file.write_all(&buffer[..read])
            .map_err(|e| FetchError::file_write(&temp_path, e))?;

        if tracker.record(read as u64, started.elapsed()) {
            job.display.update(&tracker.snapshot());
        }
        on_chunk(&tracker.snapshot());
    }

    reader.finish()?;
    let received = tracker.snapshot().downloaded;
    if job.total > 0 && received != job.total {
        debug!(path = %temp_path.display(), expected = job.total, received, "size mismatch, leaving temp file");
        return Err(FetchError::read(
            job.url,
            io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("expected {} bytes, received {received}", job.total),
            ),
        ));
    }

    tracker.finish(started.elapsed());
    let snapshot = tracker.snapshot();
    job.display.finish(&snapshot);

    file.flush()
        .map_err(|e| FetchError::file_write(&temp_path, e))?;
    if let Some(modified) = job.modified {
        file.set_modified(modified)
            .map_err(|e| FetchError::file_commit(job.final_path, e))?;
    }
    drop(file);

    fs::rename(&temp_path, job.final_path)
        .map_err(|e| FetchError::file_commit(job.final_path, e))?;
    debug!(path = %job.final_path.display(), bytes = snapshot.downloaded, "committed download");
    Ok(snapshot)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::error::ErrorKind as FetchErrorKind;
    use crate::progress::DisplayFlags;

    fn ignore(_: &ProgressSnapshot) {}

    fn hidden() -> ProgressDisplay {
        ProgressDisplay::new(false, DisplayFlags::default(), "")
    }

    fn job<'a>(final_path: &'a Path, total: u64, display: &'a ProgressDisplay) -> WriteJob<'a> {
        WriteJob {
            url: "https://example.com/file.bin",
            final_path,
            total,
            modified: None,
            chunk_size: 4,
            cancel: None,
            display,
        }
    }

    /// Yields its data, then fails instead of signalling end of stream.
    struct FailingReader {
        data: Cursor<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
                n => Ok(n),
            }
        }
    }

    impl BodyStream for FailingReader {}

    impl BodyStream for Cursor<Vec<u8>> {}

    /// Delivers its data, then reports that the peer aborted the transfer.
    struct AbortedStream {
        data: Cursor<Vec<u8>>,
    }

    impl Read for AbortedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.data.read(buf)
        }
    }

    impl BodyStream for AbortedStream {
        fn finish(&mut self) -> Result<(), FetchError> {
            Err(FetchError::read(
                "ftp://example.com/file.bin",
                io::Error::other("426 transfer aborted"),
            ))
        }
    }

    #[test]
    fn test_temp_path_appends_tilde() {
        assert_eq!(
            temp_path_for(Path::new("/data/report final.pdf")),
            PathBuf::from("/data/report final.pdf~")
        );
    }

    #[test]
    fn test_stream_commits_and_removes_temp() {
        let dir = TempDir::new().unwrap();
        let final_path = dir.path().join("out.bin");
        let display = hidden();
        let mut reader = Cursor::new(b"0123456789".to_vec());

        let snapshot = stream_to_file(&mut reader, &job(&final_path, 10, &display), &mut ignore).unwrap();

        assert_eq!(fs::read(&final_path).unwrap(), b"0123456789");
        assert!(!temp_path_for(&final_path).exists());
        assert_eq!(snapshot.downloaded, 10);
        assert_eq!(snapshot.percent(), Some(100));
    }

    #[test]
    fn test_callback_runs_per_chunk_and_is_monotonic() {
        let dir = TempDir::new().unwrap();
        let final_path = dir.path().join("out.bin");
        let display = hidden();
        let mut reader = Cursor::new(vec![7u8; 10]);
        let mut seen = Vec::new();
        let mut record = |s: &ProgressSnapshot| seen.push(s.downloaded);

        stream_to_file(&mut reader, &job(&final_path, 10, &display), &mut record).unwrap();

        assert_eq!(seen, vec![4, 8, 10]);
    }

    #[test]
    fn test_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let final_path = dir.path().join("out.bin");
        fs::write(&final_path, b"old contents").unwrap();
        let display = hidden();
        let mut reader = Cursor::new(b"new".to_vec());

        stream_to_file(&mut reader, &job(&final_path, 3, &display), &mut ignore).unwrap();

        assert_eq!(fs::read(&final_path).unwrap(), b"new");
    }

    #[test]
    fn test_read_error_keeps_final_path_and_temp() {
        let dir = TempDir::new().unwrap();
        let final_path = dir.path().join("out.bin");
        fs::write(&final_path, b"previous").unwrap();
        let display = hidden();
        let mut reader = FailingReader {
            data: Cursor::new(b"partial".to_vec()),
        };

        let error = stream_to_file(&mut reader, &job(&final_path, 100, &display), &mut ignore).unwrap_err();

        assert_eq!(error.kind(), FetchErrorKind::Read);
        assert_eq!(fs::read(&final_path).unwrap(), b"previous");
        assert_eq!(fs::read(temp_path_for(&final_path)).unwrap(), b"partial");
    }

    #[test]
    fn test_short_body_with_known_size_is_not_committed() {
        let dir = TempDir::new().unwrap();
        let final_path = dir.path().join("out.bin");
        fs::write(&final_path, b"previous").unwrap();
        let display = hidden();
        let mut reader = Cursor::new(b"0123".to_vec());

        let error = stream_to_file(&mut reader, &job(&final_path, 10, &display), &mut ignore).unwrap_err();

        assert_eq!(error.kind(), FetchErrorKind::Read);
        assert_eq!(fs::read(&final_path).unwrap(), b"previous");
        assert_eq!(fs::read(temp_path_for(&final_path)).unwrap(), b"0123");
    }

    #[test]
    fn test_unknown_size_accepts_any_length() {
        let dir = TempDir::new().unwrap();
        let final_path = dir.path().join("out.bin");
        let display = hidden();
        let mut reader = Cursor::new(b"0123".to_vec());

        let snapshot = stream_to_file(&mut reader, &job(&final_path, 0, &display), &mut ignore).unwrap();

        assert_eq!(snapshot.downloaded, 4);
        assert_eq!(fs::read(&final_path).unwrap(), b"0123");
    }

    #[test]
    fn test_failed_finish_keeps_final_path() {
        let dir = TempDir::new().unwrap();
        let final_path = dir.path().join("out.bin");
        fs::write(&final_path, b"previous").unwrap();
        let display = hidden();
        let mut reader = AbortedStream {
            data: Cursor::new(b"part".to_vec()),
        };

        let error = stream_to_file(&mut reader, &job(&final_path, 0, &display), &mut ignore).unwrap_err();

        assert_eq!(error.kind(), FetchErrorKind::Read);
        assert_eq!(fs::read(&final_path).unwrap(), b"previous");
        assert_eq!(fs::read(temp_path_for(&final_path)).unwrap(), b"part");
    }

    #[test]
    fn test_cancelled_before_first_read() {
        let dir = TempDir::new().unwrap();
        let final_path = dir.path().join("out.bin");
        let display = hidden();
        let token = CancelToken::new();
        token.cancel();
        let mut reader = Cursor::new(b"data".to_vec());
        let mut cancelled_job = job(&final_path, 4, &display);
        cancelled_job.cancel = Some(&token);

        let error = stream_to_file(&mut reader, &cancelled_job, &mut ignore).unwrap_err();

        assert_eq!(error.kind(), FetchErrorKind::Cancelled);
        assert!(!final_path.exists());
    }

    #[test]
    fn test_applies_remote_mtime() {
        let dir = TempDir::new().unwrap();
        let final_path = dir.path().join("out.bin");
        let display = hidden();
        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        let mut stamped_job = job(&final_path, 2, &display);
        stamped_job.modified = Some(stamp);

        stream_to_file(&mut Cursor::new(b"ok".to_vec()), &stamped_job, &mut ignore).unwrap();

        let modified = fs::metadata(&final_path).unwrap().modified().unwrap();
        assert_eq!(modified, stamp);
    }

    #[test]
    fn test_missing_directory_is_create_error() {
        let dir = TempDir::new().unwrap();
        let final_path = dir.path().join("missing").join("out.bin");
        let display = hidden();
        let error =
            stream_to_file(&mut Cursor::new(Vec::new()), &job(&final_path, 0, &display), &mut ignore)
                .unwrap_err();
        assert_eq!(error.kind(), FetchErrorKind::FileCreate);
    }
}
