//! Structured Logger
//!
//! Console output for humans plus a daily-rotated NDJSON file, with the
//! level taken from `RUST_LOG` when set and from configuration otherwise.

use std::path::Path;

use anyhow::Context;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log files are written as `quill.YYYY-MM-DD.log` under the log directory.
pub const LOG_FILE_PREFIX: &str = "quill";

/// Initialize the global structured logger.
///
/// Calling it again after a subscriber is installed is a no-op.
pub fn init_logger<P: AsRef<Path>>(log_dir: P, level: &str) -> anyhow::Result<()> {
    let log_dir = log_dir.as_ref();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(log_dir)
        .with_context(|| format!("cannot open log directory {}", log_dir.display()))?;

    let file_layer = fmt::layer()
        .json()
        .with_writer(file_appender)
        .with_ansi(false);

    // Console goes to stderr so command output on stdout stays clean.
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unusable_log_dir_is_an_error() {
        let blocker = std::env::temp_dir().join(format!("quill-log-blocker-{}", std::process::id()));
        std::fs::write(&blocker, b"not a directory").unwrap();

        let result = init_logger(blocker.join("logs"), "info");

        std::fs::remove_file(&blocker).unwrap();
        assert!(result.is_err());
    }
}
