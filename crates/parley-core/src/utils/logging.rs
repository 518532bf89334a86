use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured filter. With a log file
/// configured, output goes there without ANSI colors; otherwise to stderr.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| Error::Logging(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(filter);

    match &config.file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map_or_else(|| std::path::PathBuf::from("."), std::path::Path::to_path_buf);
            let file_name = path
                .file_name()
                .ok_or_else(|| Error::Logging(format!("{} is not a file path", path.display())))?;
            std::fs::create_dir_all(&directory)?;

            let appender = rolling::never(&directory, file_name);
            registry
                .with(
                    fmt::Layer::new()
                        .with_writer(appender)
                        .with_ansi(false)
                        .with_file(true)
                        .with_line_number(true),
                )
                .try_init()
                .map_err(|e| Error::Logging(e.to_string()))?;

            tracing::debug!(
                target: "parley.logging",
                path = %path.display(),
                "Tracing initialized with file output"
            );
        }
        None => {
            registry
                .with(
                    fmt::Layer::new()
                        .with_writer(std::io::stderr)
                        .with_target(true),
                )
                .try_init()
                .map_err(|e| Error::Logging(e.to_string()))?;

            tracing::debug!(target: "parley.logging", "Tracing initialized with stderr output");
        }
    }

    Ok(())
}
