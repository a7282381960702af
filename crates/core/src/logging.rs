//! Centralized logging for the rendering pipeline.
//!
//! Per-category verbosity, a per-category rate limit, and an optional
//! background file writer. Nothing here runs on the per-pixel path; callers
//! log at frame, tile-cache and capture granularity.
//!
//! - **LogConfig**: global configuration, atomics for the levels
//! - **LogLevel**: Off < Error < Warn < Info < Debug < Trace
//! - **LogCategory**: pipeline stages (Render, TileCache, ColorMath, Capture, Screenshot, Config)
//! - **log()**: the single entry point; the message closure only runs when enabled
//!
//! ```rust
//! use gfx_core::logging::{log, LogLevel, LogCategory};
//!
//! log(LogCategory::Capture, LogLevel::Debug, || {
//!     format!("new tile #{} on frame {}", 12, 3400)
//! });
//! ```
//!
//! Lines are written as `[category] level: message`, to stderr or to the
//! file set with [`LogConfig::set_log_file`].

use std::collections::VecDeque;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse a level name or digit (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pipeline stage a message comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Renderer selection, frame lifecycle
    Render,
    /// Tile decoding and converter selection
    TileCache,
    /// Blend table setup and math-mode selection
    ColorMath,
    /// Tile/palette catalog
    Capture,
    /// Reference screenshot hand-off
    Screenshot,
    /// Configuration loading
    Config,
}

impl LogCategory {
    pub const COUNT: usize = 6;

    pub const ALL: [LogCategory; Self::COUNT] = [
        LogCategory::Render,
        LogCategory::TileCache,
        LogCategory::ColorMath,
        LogCategory::Capture,
        LogCategory::Screenshot,
        LogCategory::Config,
    ];

    /// Parse a category name (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "render" => Some(LogCategory::Render),
            "tilecache" | "tile_cache" | "tiles" => Some(LogCategory::TileCache),
            "colormath" | "color_math" | "math" => Some(LogCategory::ColorMath),
            "capture" => Some(LogCategory::Capture),
            "screenshot" => Some(LogCategory::Screenshot),
            "config" => Some(LogCategory::Config),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LogCategory::Render => "render",
            LogCategory::TileCache => "tiles",
            LogCategory::ColorMath => "math",
            LogCategory::Capture => "capture",
            LogCategory::Screenshot => "screenshot",
            LogCategory::Config => "config",
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while logging must not disable logging for everyone else
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One category's sliding window.
#[derive(Default)]
struct Window {
    sent: VecDeque<Instant>,
    dropped: usize,
    last_report: Option<Instant>,
}

/// What the limiter decided for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Admission {
    allowed: bool,
    /// Messages dropped since the last report, when a report is due.
    report_dropped: Option<usize>,
}

/// Sliding one-second window per category. A limit of 0 disables limiting.
struct RateLimiter {
    max_per_second: AtomicUsize,
    windows: Mutex<[Window; LogCategory::COUNT]>,
}

const WINDOW: Duration = Duration::from_secs(1);

impl RateLimiter {
    fn new(max_per_second: usize) -> Self {
        Self {
            max_per_second: AtomicUsize::new(max_per_second),
            windows: Mutex::new(std::array::from_fn(|_| Window::default())),
        }
    }

    fn set_limit(&self, max: usize) {
        self.max_per_second.store(max, Ordering::Relaxed);
    }

    fn limit(&self) -> usize {
        self.max_per_second.load(Ordering::Relaxed)
    }

    fn admit(&self, category: LogCategory, now: Instant) -> Admission {
        let max = self.limit();
        if max == 0 {
            return Admission {
                allowed: true,
                report_dropped: None,
            };
        }

        let mut windows = lock(&self.windows);
        let window = &mut windows[category.index()];
        while window
            .sent
            .front()
            .is_some_and(|&t| now.duration_since(t) > WINDOW)
        {
            window.sent.pop_front();
        }

        let allowed = window.sent.len() < max;
        if allowed {
            window.sent.push_back(now);
        } else {
            window.dropped += 1;
        }

        // Drops are reported on the next admitted message, or once a second
        // while everything is being dropped
        let report_due = allowed
            || window
                .last_report
                .map_or(true, |last| now.duration_since(last) >= WINDOW);
        let report_dropped = if window.dropped > 0 && report_due {
            window.last_report = Some(now);
            Some(std::mem::take(&mut window.dropped))
        } else {
            None
        };

        Admission {
            allowed,
            report_dropped,
        }
    }
}

/// Where formatted lines go.
enum Output {
    Stderr,
    /// Channel to the background writer thread.
    File(Sender<String>),
}

pub struct LogConfig {
    /// Level for categories without an override
    global_level: AtomicU8,
    /// Per-category overrides; Off means "use the global level"
    levels: [AtomicU8; LogCategory::COUNT],
    output: Mutex<Output>,
    rate_limiter: RateLimiter,
}

impl LogConfig {
    /// Everything off, 60 messages per second per category.
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            levels: std::array::from_fn(|_| AtomicU8::new(LogLevel::Off as u8)),
            output: Mutex::new(Output::Stderr),
            rate_limiter: RateLimiter::new(60),
        }
    }

    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.levels[category.index()].load(Ordering::Relaxed))
    }

    /// The category's own level decides when set, the global level otherwise.
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        if level == LogLevel::Off {
            return false;
        }
        let threshold = match self.get_level(category) {
            LogLevel::Off => self.get_global_level(),
            own => own,
        };
        level <= threshold
    }

    /// All levels back to Off.
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for category in LogCategory::ALL {
            self.set_level(category, LogLevel::Off);
        }
    }

    /// Messages per second per category; 0 for unlimited.
    pub fn set_rate_limit(&self, max_per_second: usize) {
        self.rate_limiter.set_limit(max_per_second);
    }

    pub fn get_rate_limit(&self) -> usize {
        self.rate_limiter.limit()
    }

    /// Append to `path` from a background thread. Replaces any previous file.
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let (sender, receiver) = channel::<String>();

        thread::Builder::new()
            .name("gfx-log-writer".to_string())
            .spawn(move || {
                // Ends when the sender is dropped
                while let Ok(line) = receiver.recv() {
                    let _ = writeln!(file, "{}", line);
                    let _ = file.flush();
                }
            })?;

        *lock(&self.output) = Output::File(sender);
        Ok(())
    }

    /// Go back to stderr; the writer thread exits once drained.
    pub fn clear_log_file(&self) {
        *lock(&self.output) = Output::Stderr;
    }

    fn write_line(&self, line: String) {
        match &*lock(&self.output) {
            Output::File(sender) => {
                if let Err(failed) = sender.send(line) {
                    eprintln!("{}", failed.0);
                }
            }
            Output::Stderr => eprintln!("{}", line),
        }
    }

    fn emit(&self, category: LogCategory, level: LogLevel, now: Instant, message_fn: impl FnOnce() -> String) {
        let admission = self.rate_limiter.admit(category, now);
        if let Some(count) = admission.report_dropped {
            self.write_line(format_line(
                category,
                LogLevel::Warn,
                &format!("rate limit exceeded, {} message(s) dropped", count),
            ));
        }
        if admission.allowed {
            self.write_line(format_line(category, level, &message_fn()));
        }
    }
}

fn format_line(category: LogCategory, level: LogLevel, message: &str) -> String {
    format!("[{}] {}: {}", category, level, message)
}

/// Log through the global configuration.
///
/// `message_fn` runs only when `category` is enabled at `level` and the
/// category's rate limit admits the message. Dropped messages are summarized
/// in a warning on the same category.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if config.should_log(category, level) {
        config.emit(category, level, Instant::now(), message_fn);
    }
}
