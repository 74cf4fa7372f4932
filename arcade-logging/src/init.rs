use anyhow::Result;
use arcade_config::{LogFormat, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Keeps the non-blocking file writer alive; drop it only at process exit
#[must_use = "dropping the guard stops the file sink from flushing"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Build the level filter for a configured level
///
/// Falls back to `RUST_LOG`, then to `info`, when the level does not parse.
pub fn build_env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging from configuration
pub fn init_logging_from_config(config: &LoggingConfig) -> Result<LoggingGuard> {
    let env_filter = build_env_filter(&config.level.to_string());

    let console_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Text => fmt::layer()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
    };

    let (file_layer, file_guard) = match &config.file {
        Some(sink) => {
            std::fs::create_dir_all(&sink.directory)?;
            let appender = tracing_appender::rolling::daily(&sink.directory, &sink.prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // Use try_init to avoid panic if global subscriber already set
    if tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(LoggingGuard { _file: file_guard })
}

/// Initialize simple tracing for basic console output
pub fn init_simple_tracing(log_level: &str) -> Result<()> {
    let env_filter = build_env_filter(log_level);

    if tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_config::FileSinkConfig;

    #[test]
    fn test_env_filter_from_level() {
        let filter = build_env_filter("debug");
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn test_double_init_is_harmless() {
        assert!(init_simple_tracing("info").is_ok());
        assert!(init_simple_tracing("debug").is_ok());
    }

    #[test]
    fn test_file_sink_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("nested").join("logs");
        let config = LoggingConfig {
            file: Some(FileSinkConfig {
                directory: log_dir.clone(),
                prefix: "arcade.log".to_string(),
            }),
            ..Default::default()
        };

        let _guard = init_logging_from_config(&config).unwrap();
        assert!(log_dir.is_dir());
    }
}
