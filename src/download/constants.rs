//! Constants for the download module (timeouts, redirects, buffers).

/// Default connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default read timeout (5 minutes for large files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default number of redirects a single transfer may follow.
pub const DEFAULT_MAX_REDIRECTS: u32 = 4;

/// Default bound on the length of a header value the engine will read.
pub const DEFAULT_HEADER_LENGTH: usize = 16 * 1024;

/// Size of the per-read transfer buffer (64 KiB).
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Suffix appended to the final path while a transfer is in flight.
pub const TEMP_SUFFIX: char = '~';
