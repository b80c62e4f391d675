//! Logging initialization using the `tracing` ecosystem.
//!
//! Library code only emits events; the embedding process calls
//! [`init_logging`] (or [`init_from_config`]) once at startup.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogConfig;

/// Initialize the global tracing subscriber.
///
/// # Parameters
///
/// - `log_level`: default level if `RUST_LOG` env var is not set (e.g. `"info"`)
/// - `log_dir`: optional directory for daily-rotating log files
/// - `module_name`: used as the log file prefix
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging(log_level: &str, log_dir: Option<&str>, module_name: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let console_layer = fmt::layer().with_target(true).with_thread_ids(true).with_ansi(true);

    if let Some(dir) = log_dir {
        let file_appender = tracing_appender::rolling::daily(dir, module_name);
        let file_layer = fmt::layer()
            .with_writer(file_appender)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true);

        tracing_subscriber::registry().with(env_filter).with(console_layer).with(file_layer).try_init().is_ok()
    } else {
        tracing_subscriber::registry().with(env_filter).with(console_layer).try_init().is_ok()
    }
}

/// Initialize logging from the `log` block of a session config.
pub fn init_from_config(config: &LogConfig) -> bool {
    init_logging(&config.level, config.dir.as_deref(), &config.module_name)
}
