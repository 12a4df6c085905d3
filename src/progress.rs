//! Transfer progress: percentage, speed, ETA, and the rendered status line.
//!
//! [`ProgressTracker`] is pure arithmetic over a byte counter and an elapsed
//! time supplied by the caller, so it can be driven deterministically in
//! tests. [`ProgressDisplay`] is the only piece that touches a terminal.

use std::time::Duration;

use bitflags::bitflags;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Ratio value representing a complete transfer (basis points).
pub const RATIO_SCALE: u64 = 10_000;

/// Number of cells in the rendered progress bar.
pub const BAR_WIDTH: u64 = 23;

/// Minimum wall-clock interval between speed/ETA recomputations.
const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

const SIZE_UNITS: [(&str, u64); 5] = [
    ("TiB", 1 << 40),
    ("GiB", 1 << 30),
    ("MiB", 1 << 20),
    ("KiB", 1 << 10),
    ("B", 1),
];

bitflags! {
    /// Parts of the progress line to render.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DisplayFlags: u32 {
        const BAR = 1 << 0;
        const SPEED = 1 << 1;
        const ETA = 1 << 2;
        const FILE_SIZE = 1 << 3;
        const PERCENTAGE = 1 << 4;
        const ELAPSED = 1 << 5;
        const FILE_NAME = 1 << 6;
    }
}

impl Default for DisplayFlags {
    fn default() -> Self {
        Self::BAR | Self::PERCENTAGE | Self::ETA | Self::SPEED | Self::FILE_SIZE | Self::FILE_NAME
    }
}

/// Point-in-time progress measurement.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressSnapshot {
    /// Time since the transfer started.
    pub elapsed: Duration,
    /// Bytes written so far.
    pub downloaded: u64,
    /// Advertised size, zero when unknown.
    pub total: u64,
    /// Bytes per second over the last sample window.
    pub speed: Option<f64>,
    /// Estimated time remaining.
    pub eta: Option<Duration>,
}

impl ProgressSnapshot {
    /// Completed fraction in basis points (0..=10000), `None` when the total
    /// is unknown.
    #[must_use]
    pub fn ratio(&self) -> Option<u64> {
        if self.total == 0 {
            return None;
        }
        let ratio = u128::from(self.downloaded) * u128::from(RATIO_SCALE) / u128::from(self.total);
        Some(u64::try_from(ratio).map_or(RATIO_SCALE, |r| r.min(RATIO_SCALE)))
    }

    /// Whole percent complete, clamped to 0..=100.
    #[must_use]
    pub fn percent(&self) -> Option<u64> {
        self.ratio().map(|r| r / 100)
    }
}

/// Accumulates transferred bytes and derives speed and ETA.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    snapshot: ProgressSnapshot,
    last_sample_at: Duration,
    last_sample_bytes: u64,
}

impl ProgressTracker {
    /// Starts tracking a transfer of `total` bytes (zero when unknown).
    #[must_use]
    pub fn new(total: u64) -> Self {
        Self {
            snapshot: ProgressSnapshot {
                total,
                ..ProgressSnapshot::default()
            },
            last_sample_at: Duration::ZERO,
            last_sample_bytes: 0,
        }
    }

    /// Records `bytes` more transferred at `elapsed` since the start.
    ///
    /// Speed and ETA are recomputed only when a full second has passed since
    /// the previous sample or the whole percentage changed. Returns whether a
    /// recomputation happened.
    pub fn record(&mut self, bytes: u64, elapsed: Duration) -> bool {
        let before = self.snapshot.percent();
        self.snapshot.downloaded = self.snapshot.downloaded.saturating_add(bytes);
        self.snapshot.elapsed = elapsed.max(self.snapshot.elapsed);

        let interval_passed =
            self.snapshot.elapsed.saturating_sub(self.last_sample_at) >= SAMPLE_INTERVAL;
        let percent_changed = before.is_some() && self.snapshot.percent() != before;
        if !(interval_passed || percent_changed) {
            return false;
        }
        self.sample();
        true
    }

    /// Forces a final recomputation at `elapsed`.
    pub fn finish(&mut self, elapsed: Duration) {
        self.snapshot.elapsed = elapsed.max(self.snapshot.elapsed);
        self.sample();
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot
    }

    fn sample(&mut self) {
        let window = self.snapshot.elapsed.saturating_sub(self.last_sample_at);
        let delta_bytes = self.snapshot.downloaded - self.last_sample_bytes;
        if !window.is_zero() {
            #[allow(clippy::cast_precision_loss)]
            let speed = delta_bytes as f64 / window.as_secs_f64();
            self.snapshot.speed = Some(speed);
        }
        self.snapshot.eta = estimate_eta(&self.snapshot);
        self.last_sample_at = self.snapshot.elapsed;
        self.last_sample_bytes = self.snapshot.downloaded;
    }
}

/// Remaining time at the snapshot's current speed.
///
/// `None` when the total is unknown or the speed is zero.
#[must_use]
pub fn estimate_eta(snapshot: &ProgressSnapshot) -> Option<Duration> {
    if snapshot.total == 0 {
        return None;
    }
    let speed = snapshot.speed.filter(|s| *s > 0.0)?;
    #[allow(clippy::cast_precision_loss)]
    let remaining = snapshot.total.saturating_sub(snapshot.downloaded) as f64;
    Duration::try_from_secs_f64(remaining / speed).ok()
}

/// Picks the largest binary unit in which `bytes` is at least one.
#[must_use]
pub fn size_unit(bytes: f64) -> (&'static str, f64) {
    for (name, factor) in SIZE_UNITS {
        #[allow(clippy::cast_precision_loss)]
        let scaled = bytes / factor as f64;
        if scaled >= 1.0 {
            return (name, scaled);
        }
    }
    ("B", bytes)
}

/// Formats a byte count as e.g. `1.50MiB`.
#[must_use]
pub fn format_size(bytes: f64) -> String {
    let (unit, value) = size_unit(bytes);
    format!("{value:.2}{unit}")
}

/// Formats a duration as `HH:MM:SS`.
#[must_use]
pub fn format_clock(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Renders a bracketed bar with cells filled in proportion to `ratio`.
#[must_use]
pub fn render_bar(ratio: Option<u64>) -> String {
    let filled = ratio.map_or(0, |r| r.min(RATIO_SCALE) * BAR_WIDTH / RATIO_SCALE);
    let mut bar = String::from("[");
    for cell in 0..BAR_WIDTH {
        bar.push(if cell < filled { '#' } else { '-' });
    }
    bar.push(']');
    bar
}

/// Renders the one-line progress status for the selected parts.
#[must_use]
pub fn render_line(snapshot: &ProgressSnapshot, flags: DisplayFlags, name: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    if flags.contains(DisplayFlags::FILE_NAME) && !name.is_empty() {
        parts.push(name.to_string());
    }
    if flags.contains(DisplayFlags::BAR) {
        parts.push(render_bar(snapshot.ratio()));
    }

    let mut line = parts.join(" ");
    let mut push = |segment: String| {
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&segment);
    };

    if flags.contains(DisplayFlags::PERCENTAGE) {
        push(match snapshot.ratio() {
            Some(r) => format!("{:3}.{:02}%;", r / 100, r % 100),
            None => "--.--%;".to_string(),
        });
    }
    if flags.contains(DisplayFlags::FILE_SIZE) {
        #[allow(clippy::cast_precision_loss)]
        let downloaded = format_size(snapshot.downloaded as f64);
        let segment = if snapshot.total == 0 {
            format!("{downloaded};")
        } else {
            #[allow(clippy::cast_precision_loss)]
            let total = format_size(snapshot.total as f64);
            format!("{downloaded} / {total};")
        };
        push(segment);
    }
    if flags.contains(DisplayFlags::ELAPSED) {
        push(format_clock(snapshot.elapsed));
    }
    if flags.contains(DisplayFlags::SPEED) {
        push(match snapshot.speed {
            Some(speed) => format!("{}/s;", format_size(speed)),
            None => "--/s;".to_string(),
        });
    }
    if flags.contains(DisplayFlags::ETA) {
        push(match snapshot.eta {
            Some(eta) => format!("ETA: {}", format_clock(eta)),
            None => "ETA: --:--:--".to_string(),
        });
    }
    line.trim_end_matches(';').to_string()
}

/// Terminal rendering of the progress line.
///
/// Hidden unless enabled, so callers can drive it unconditionally.
pub struct ProgressDisplay {
    bar: ProgressBar,
    flags: DisplayFlags,
    name: String,
}

impl ProgressDisplay {
    #[must_use]
    pub fn new(enabled: bool, flags: DisplayFlags, name: &str) -> Self {
        let bar = if enabled {
            let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
            bar.set_style(
                ProgressStyle::with_template("{msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar
        } else {
            ProgressBar::hidden()
        };
        Self {
            bar,
            flags,
            name: name.to_string(),
        }
    }

    pub fn update(&self, snapshot: &ProgressSnapshot) {
        if self.bar.is_hidden() {
            return;
        }
        self.bar
            .set_message(render_line(snapshot, self.flags, &self.name));
    }

    pub fn finish(&self, snapshot: &ProgressSnapshot) {
        if self.bar.is_hidden() {
            return;
        }
        self.bar
            .finish_with_message(render_line(snapshot, self.flags, &self.name));
    }
}
