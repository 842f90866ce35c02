//! Logger bootstrap for the command line tool.
//!
//! Library code only emits through the `log` facade; nothing is printed
//! unless a binary starts a backend with [`init_logging`].

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use std::path::Path;
use thiserror::Error;

const LOG_FILE_BASENAME: &str = "mpr-sync";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("unsupported log level `{0}`")]
    InvalidLevel(String),

    #[error("failed to create log directory `{path}`: {source}")]
    LogDir {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to start logger: {0}")]
    Backend(#[from] flexi_logger::FlexiLoggerError),
}

/// Normalise a user supplied level to one `flexi_logger` understands.
pub fn normalize_level(level: &str) -> Result<&'static str, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        "off" => Ok("off"),
        _ => Err(LoggingError::InvalidLevel(level.to_string())),
    }
}

/// Start logging to stderr, or to size-rotated files in `log_dir`.
///
/// `RUST_LOG` overrides `level` when set. Keep the returned handle alive for
/// as long as logs should be written.
///
/// # Errors
/// - Returns an error when `level` is unsupported.
/// - Returns an error when `log_dir` cannot be created.
/// - Returns an error when logger backend setup fails.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<LoggerHandle, LoggingError> {
    let level = normalize_level(level)?;
    let logger = Logger::try_with_env_or_str(level)?;

    let handle = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::LogDir {
                path: dir.display().to_string(),
                source,
            })?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
                .start()?
        }
        None => logger.log_to_stderr().start()?,
    };

    info!(
        "event=app_start status=ok platform={} version={} level={level}",
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION")
    );
    Ok(handle)
}
