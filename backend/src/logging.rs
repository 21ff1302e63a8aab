// Logging module, powered by tracing-subscriber
//
// Library crates log through the `log` facade. `tracing_log::LogTracer`
// forwards those records into the tracing subscriber installed here.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::Path;

use shardsql_configs::LoggingSettings;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact text format: timestamp LEVEL target - message
    Compact,
    /// JSON Lines format for structured logging
    Json,
}

impl LogFormat {
    pub fn from_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" | "jsonl" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Build the `EnvFilter` from the base level, noisy-crate overrides and
/// per-target overrides from config.
fn build_env_filter(level: &str, target_levels: &HashMap<String, String>) -> anyhow::Result<EnvFilter> {
    let mut directives = vec![level.to_string()];

    let noisy: &[(&str, &str)] = &[("sqlparser", "warn"), ("tokio", "warn")];
    for (target, lvl) in noisy {
        directives.push(format!("{}={}", target, lvl));
    }

    for (target, lvl) in target_levels {
        directives.push(format!("{}={}", target, lvl));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str)
        .map_err(|e| anyhow::anyhow!("Invalid tracing filter '{}': {}", filter_str, e))
}

/// Initialize logging from `[logging]` settings.
///
/// Installs a console layer (when `log_to_console`), an optional file layer,
/// both in the configured format, and the `log` → tracing bridge.
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    let format = LogFormat::from_name(&settings.format);

    tracing_log::LogTracer::init().ok(); // ok() in case already initialized

    let console_layer = if settings.log_to_console {
        let filter = build_env_filter(&settings.level, &settings.targets)?;
        let layer = match format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(filter)
                .boxed(),
            LogFormat::Compact => tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(filter)
                .boxed(),
        };
        Some(layer)
    } else {
        None
    };

    let file_layer = match settings.file_path.as_deref() {
        Some(file_path) => {
            if let Some(parent) = Path::new(file_path).parent() {
                fs::create_dir_all(parent)?;
            }
            let log_file = OpenOptions::new().create(true).append(true).open(file_path)?;
            let filter = build_env_filter(&settings.level, &settings.targets)?;

            let layer = match format {
                LogFormat::Json => tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(log_file)
                    .with_target(true)
                    .with_thread_names(true)
                    .with_filter(filter)
                    .boxed(),
                LogFormat::Compact => tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(log_file)
                    .with_target(true)
                    .with_thread_names(true)
                    .with_filter(filter)
                    .boxed(),
            };
            Some(layer)
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::trace!(
        "Logging initialized: level={}, console={}, file={:?}",
        settings.level,
        settings.log_to_console,
        settings.file_path
    );

    Ok(())
}

/// Initialize simple logging for development (console only)
pub fn init_simple_logging() -> anyhow::Result<()> {
    tracing_log::LogTracer::init().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_name() {
        assert_eq!(LogFormat::from_name("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_name("JSONL"), LogFormat::Json);
        assert_eq!(LogFormat::from_name("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::from_name("anything"), LogFormat::Compact);
    }

    #[test]
    fn test_env_filter_with_targets() {
        let mut targets = HashMap::new();
        targets.insert("shardsql_router".to_string(), "trace".to_string());
        assert!(build_env_filter("info", &targets).is_ok());
    }

    #[test]
    fn test_env_filter_rejects_garbage() {
        let mut targets = HashMap::new();
        targets.insert("shardsql_router".to_string(), "loudest".to_string());
        assert!(build_env_filter("info", &targets).is_err());
    }
}
