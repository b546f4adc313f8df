use std::{env, str::FromStr};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const FORMAT_VAR: &str = "QSWEEP_LOG_FORMAT";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("invalid log format: {} (expected: text|json)", s)),
        }
    }
}

/// Installs the global subscriber writing to stderr.
/// The filter comes from `RUST_LOG` (falling back to `default_level`),
/// the format from `QSWEEP_LOG_FORMAT`.
pub fn init(default_level: &str) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| format!("invalid log level {}: {}", default_level, e))?;
    let format = match env::var(FORMAT_VAR) {
        Ok(value) => value.parse()?,
        Err(_) => LogFormat::Text,
    };
    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|e| format!("failed to initialize logging: {}", e))
}
