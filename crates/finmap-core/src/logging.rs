//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! The library crates only emit events; a host calls [`init_logging`] once to
//! decide where they go.
//!
//! # Log Levels
//!
//! - `warn`: coercion fallbacks, catalog mismatches, unknown preset targets
//! - `info`: pipeline stage summaries with `duration_ms`
//! - `debug`: per-column decisions, per-cell coercion issues
//!
//! Spreadsheet cells can hold client names and prices. They are logged as
//! [`REDACTED_VALUE`] unless [`LogConfig::log_cell_values`] is set; see
//! [`redact_value`].

use std::borrow::Cow;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use finmap_model::CellValue;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, MakeWriter, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

static CELL_VALUES_ENABLED: AtomicBool = AtomicBool::new(false);

/// Placeholder logged instead of a cell value.
pub const REDACTED_VALUE: &str = "[REDACTED]";

const CRATES: [&str; 5] = [
    "finmap_catalog",
    "finmap_core",
    "finmap_map",
    "finmap_model",
    "finmap_transform",
];

/// Returns true if cell values may be logged.
pub fn log_data_enabled() -> bool {
    CELL_VALUES_ENABLED.load(Ordering::Relaxed)
}

/// A cell as it may appear in the log.
///
/// Empty cells carry no data and are logged as an empty string, which keeps
/// "blank cell defaulted to 0" distinguishable from a redacted value.
pub fn redact_value(value: &CellValue) -> Cow<'static, str> {
    match value {
        CellValue::Empty => Cow::Borrowed(""),
        _ if log_data_enabled() => Cow::Owned(value.to_string()),
        _ => Cow::Borrowed(REDACTED_VALUE),
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub ansi: bool,
    pub timestamps: bool,
    /// Emit a close event with busy/idle time for every pipeline stage span
    /// (`prepare`, `resolve`, `build`, `extract`, `flatten`).
    pub stage_timings: bool,
    /// Append to this file instead of writing to stderr.
    pub log_file: Option<PathBuf>,
    pub log_cell_values: bool,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    /// One JSON object per event, for hosts that ship logs elsewhere.
    Json,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::default(),
            ansi: true,
            timestamps: false,
            stage_timings: false,
            log_file: None,
            log_cell_values: false,
        }
    }
}

impl LogConfig {
    /// Maps a verbosity count to a level: 0 info, 1 debug, 2+ trace.
    #[must_use]
    pub fn from_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_ansi(mut self, enable: bool) -> Self {
        self.ansi = enable;
        self
    }

    #[must_use]
    pub fn with_timestamps(mut self, enable: bool) -> Self {
        self.timestamps = enable;
        self
    }

    #[must_use]
    pub fn with_stage_timings(mut self, enable: bool) -> Self {
        self.stage_timings = enable;
        self
    }

    #[must_use]
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_cell_values(mut self, enable: bool) -> Self {
        self.log_cell_values = enable;
        self
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails when the log file cannot be opened or a global subscriber is
/// already installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            init_logging_with_writer(config, Mutex::new(file))
        }
        None => init_logging_with_writer(config, io::stderr),
    }
}

/// Installs the global subscriber with a custom writer.
pub fn init_logging_with_writer<W>(config: &LogConfig, writer: W) -> Result<()>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    CELL_VALUES_ENABLED.store(config.log_cell_values, Ordering::Release);
    let registry = tracing_subscriber::registry().with(build_env_filter(config.level));
    let spans = if config.stage_timings {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let installed = match (config.format, config.timestamps) {
        (LogFormat::Json, _) => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_span_events(spans),
            )
            .try_init(),
        (LogFormat::Compact, true) => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(writer)
                    .with_ansi(config.ansi)
                    .with_target(false)
                    .with_span_events(spans),
            )
            .try_init(),
        (LogFormat::Compact, false) => registry
            .with(
                fmt::layer()
                    .compact()
                    .without_time()
                    .with_writer(writer)
                    .with_ansi(config.ansi)
                    .with_target(false)
                    .with_span_events(spans),
            )
            .try_init(),
        (LogFormat::Pretty, true) => registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(config.ansi)
                    .with_target(false)
                    .with_span_events(spans),
            )
            .try_init(),
        (LogFormat::Pretty, false) => registry
            .with(
                fmt::layer()
                    .without_time()
                    .with_writer(writer)
                    .with_ansi(config.ansi)
                    .with_target(false)
                    .with_span_events(spans),
            )
            .try_init(),
    };
    installed.context("install tracing subscriber")
}

/// `RUST_LOG` wins; otherwise the finmap crates log at `level` and everything
/// else at warn.
fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

fn default_directives(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    let mut directives = String::from("warn");
    for krate in CRATES {
        directives.push_str(&format!(",{krate}={level}"));
    }
    directives
}
