//! Process-wide rolling log sink driven by [`TodoConfig`].
//!
//! # Responsibility
//! - Route `log` records to size-rotated files under `TodoConfig::log_dir`.
//! - Capture panics as single-line `event=panic_captured` records.
//!
//! # Invariants
//! - At most one sink per process. A later request must name the same level
//!   and directory; anything else is a [`LoggingError::Conflict`].
//! - Starting the sink never panics.
//! - Task text never reaches the log; events carry IDs, counts and codes.

use crate::config::TodoConfig;
use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Once;

const FILE_BASENAME: &str = "todo";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_FILES: usize = 5;
const PANIC_SUMMARY_CHARS: usize = 160;

static ACTIVE_SINK: OnceCell<ActiveSink> = OnceCell::new();
static PANIC_HOOK: Once = Once::new();

struct ActiveSink {
    level: LevelFilter,
    dir: PathBuf,
    _handle: LoggerHandle,
}

#[derive(Debug)]
pub enum LoggingError {
    /// `log_dir` is relative; rolling files need a stable absolute home.
    RelativeDirectory(PathBuf),
    /// `LevelFilter::Off` was requested.
    Disabled,
    CreateDirectory {
        dir: PathBuf,
        source: std::io::Error,
    },
    Backend(FlexiLoggerError),
    /// A sink is already running with different settings.
    Conflict {
        active: String,
        requested: String,
    },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RelativeDirectory(dir) => {
                write!(f, "log_dir must be an absolute path, got `{}`", dir.display())
            }
            Self::Disabled => write!(f, "log level `off` cannot start a sink"),
            Self::CreateDirectory { dir, source } => {
                write!(f, "failed to create log directory `{}`: {source}", dir.display())
            }
            Self::Backend(err) => write!(f, "failed to start logger: {err}"),
            Self::Conflict { active, requested } => write!(
                f,
                "logging already running as {active}; refusing to switch to {requested}"
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDirectory { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            Self::RelativeDirectory(_) | Self::Disabled | Self::Conflict { .. } => None,
        }
    }
}

impl From<FlexiLoggerError> for LoggingError {
    fn from(value: FlexiLoggerError) -> Self {
        Self::Backend(value)
    }
}

/// Starts the rolling file sink described by `config.log_level` and
/// `config.log_dir`.
///
/// Repeating the call with identical settings is a no-op.
///
/// # Errors
/// - [`LoggingError::RelativeDirectory`] / [`LoggingError::Disabled`] for
///   unusable settings.
/// - [`LoggingError::CreateDirectory`] / [`LoggingError::Backend`] when the
///   sink cannot be started.
/// - [`LoggingError::Conflict`] when a different sink is already running.
pub fn init_logging(config: &TodoConfig) -> Result<(), LoggingError> {
    let level = config.log_level;
    let dir = config.log_dir.clone();
    if level == LevelFilter::Off {
        return Err(LoggingError::Disabled);
    }
    if !dir.is_absolute() {
        return Err(LoggingError::RelativeDirectory(dir));
    }

    let sink = ACTIVE_SINK.get_or_try_init(|| start_sink(level, dir.clone()))?;
    if sink.level != level || sink.dir != dir {
        return Err(LoggingError::Conflict {
            active: describe(sink.level, &sink.dir),
            requested: describe(level, &dir),
        });
    }
    Ok(())
}

/// Whether a sink has been started in this process.
pub fn is_logging_active() -> bool {
    ACTIVE_SINK.get().is_some()
}

fn start_sink(level: LevelFilter, dir: PathBuf) -> Result<ActiveSink, LoggingError> {
    std::fs::create_dir_all(&dir).map_err(|source| LoggingError::CreateDirectory {
        dir: dir.clone(),
        source,
    })?;

    let level_name = level.to_string().to_ascii_lowercase();
    let handle = Logger::try_with_str(&level_name)?
        .log_to_file(FileSpec::default().directory(&dir).basename(FILE_BASENAME))
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()?;

    PANIC_HOOK.call_once(install_panic_hook);
    info!(
        "event=logging_start module=core status=ok level={level_name} os={} debug_build={} version={}",
        std::env::consts::OS,
        cfg!(debug_assertions),
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveSink {
        level,
        dir,
        _handle: handle,
    })
}

fn describe(level: LevelFilter, dir: &std::path::Path) -> String {
    format!("`{}` at `{}`", level.to_string().to_ascii_lowercase(), dir.display())
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info.location().map_or_else(
            || "unknown".to_string(),
            |loc| format!("{}:{}", loc.file(), loc.line()),
        );
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic_captured module=core status=error location={location} payload={}",
            one_line(&payload, PANIC_SUMMARY_CHARS)
        );
        previous(panic_info);
    }));
}

/// Flattens `value` to one line of at most `limit` characters.
///
/// Panic payloads may echo task text.
fn one_line(value: &str, limit: usize) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    if flat.chars().count() <= limit {
        return flat;
    }
    let mut cut = flat.chars().take(limit).collect::<String>();
    cut.push_str("...");
    cut
}
