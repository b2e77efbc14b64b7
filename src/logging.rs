use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Where and how verbosely to log.
#[derive(Debug, Clone)]
pub struct LogOptions<'a> {
    pub log_dir: &'a Utf8Path,
    pub file_prefix: &'a str,
    pub debug_mode: bool,
    /// Mirror events to stderr
    pub console: bool,
    /// Write the file log as JSON lines instead of plain text
    pub json: bool,
}

impl<'a> LogOptions<'a> {
    pub fn new(log_dir: &'a Utf8Path, file_prefix: &'a str) -> Self {
        Self {
            log_dir,
            file_prefix,
            debug_mode: false,
            console: false,
            json: false,
        }
    }
}

/// Build the level filter. `RUST_LOG` overrides the debug flag when set.
pub fn env_filter(debug_mode: bool) -> EnvFilter {
    let default_level = if debug_mode { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn ensure_log_dir(log_dir: &Utf8Path) -> Result<()> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }
    Ok(())
}

/// Install the global subscriber with a daily rotating file log.
///
/// # Arguments
/// * `options` - Log directory, file prefix and output switches
///
/// # Returns
/// A guard that must be held for the duration of the program to keep
/// the non-blocking file writer flushing
pub fn setup_logging(options: &LogOptions<'_>) -> Result<WorkerGuard> {
    ensure_log_dir(options.log_dir)?;

    let file_appender = rolling::daily(options.log_dir, options.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let text_file_layer = (!options.json).then(|| {
        fmt::layer()
            .with_writer(non_blocking.clone())
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });
    let json_file_layer = options.json.then(|| {
        fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_current_span(false)
    });
    let console_layer = options.console.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter(options.debug_mode))
        .with(text_file_layer)
        .with(json_file_layer)
        .with(console_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={}, json={}",
        options.log_dir,
        options.file_prefix,
        options.debug_mode,
        options.console,
        options.json
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_setup_logging_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = Utf8PathBuf::from_path_buf(temp_dir.path().join("logs")).unwrap();

        let options = LogOptions::new(&log_dir, "studio-test");
        // A second global subscriber in the same test binary is rejected;
        // the directory is created either way.
        let _ = setup_logging(&options);

        assert!(log_dir.exists());
    }

    #[test]
    fn test_log_options_defaults() {
        let dir = Utf8PathBuf::from("logs");
        let options = LogOptions::new(&dir, "barcode-studio");
        assert!(!options.debug_mode);
        assert!(!options.console);
        assert!(!options.json);
    }
}
