use std::path::{Path, PathBuf};

use notevault::kernel::services::adapters::ensure_log_dir;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const LOG_DIR_ENV: &str = "NOTEVAULT_LOG_DIR";
const LOG_FILE: &str = "notevault.log";
const DEFAULT_DIRECTIVE: &str = "notevault=info";

pub struct LoggingGuard {
    _file: WorkerGuard,
    log_dir: PathBuf,
}

impl LoggingGuard {
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

fn create(dir: PathBuf) -> Option<PathBuf> {
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// `NOTEVAULT_LOG_DIR`, then the app log dir, then the temp dir.
fn resolve_log_dir() -> Option<PathBuf> {
    std::env::var_os(LOG_DIR_ENV)
        .filter(|dir| !dir.is_empty())
        .and_then(|dir| create(PathBuf::from(dir)))
        .or_else(|| ensure_log_dir().ok())
        .or_else(|| create(std::env::temp_dir().join("notevault").join("logs")))
}

/// Full trace to a daily file; warnings and errors also go to stderr since
/// stdout carries the tree listing.
pub fn init() -> Option<LoggingGuard> {
    let log_dir = resolve_log_dir()?;
    let (file_writer, file_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, LOG_FILE));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
        );
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .ok()?;

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(panic = %info, "panic");
        default_hook(info);
    }));

    tracing::info!(log_dir = %log_dir.display(), "logging to file");
    Some(LoggingGuard {
        _file: file_guard,
        log_dir,
    })
}
