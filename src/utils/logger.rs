// Logger initialization

use crate::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// One-shot commands log to stderr so stdout stays clean for results
    Stderr,
    /// The TUI owns the terminal, so logs go to a daily rolling file
    File,
}

/// Install the global subscriber. Keep the returned guard alive until exit,
/// otherwise buffered file output is lost.
pub fn init_logger(config: &LoggingConfig, target: LogTarget) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("askmydoc=info"));

    match target {
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()?;
            Ok(None)
        }
        LogTarget::File => {
            std::fs::create_dir_all(&config.log_dir)?;
            let appender = tracing_appender::rolling::daily(&config.log_dir, "askmydoc.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false),
                )
                .try_init()?;
            Ok(Some(guard))
        }
    }
}
