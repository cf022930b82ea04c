//! # Structured Logging Module
//!
//! Environment-aware structured logging for batch runs. Console output is
//! either human-readable or JSON lines for log shipping.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::constants::env::{ENVIRONMENT, LOG_FILTER};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Console output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Initialize structured logging with environment-specific configuration
///
/// Safe to call more than once; only the first call installs a subscriber, and
/// an already-installed global subscriber is left in place.
pub fn init_structured_logging(format: LogFormat) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = std::env::var(LOG_FILTER).unwrap_or_else(|_| get_log_level(&environment));

        let layer = match format {
            LogFormat::Pretty => fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(true)
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::new(&filter))
                .boxed(),
            LogFormat::Json => fmt::layer()
                .json()
                .with_target(true)
                .with_level(true)
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::new(&filter))
                .boxed(),
        };

        // A subscriber may already be installed by an embedding application
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already installed, keeping it");
        }

        tracing::info!(
            environment = %environment,
            filter = %filter,
            format = ?format,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var(ENVIRONMENT)
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for batch operations
pub fn log_batch_operation(
    operation: &str,
    batch_index: Option<usize>,
    statement_count: usize,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        batch_index = batch_index,
        statement_count = statement_count,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📋 BATCH_OPERATION"
    );
}

/// Log structured data for cursor operations
pub fn log_cursor_operation(
    operation: &str,
    offset: usize,
    next_offset: usize,
    total_statements: usize,
    status: &str,
) {
    tracing::info!(
        operation = %operation,
        offset = offset,
        next_offset = next_offset,
        total_statements = total_statements,
        status = %status,
        timestamp = %Utc::now().to_rfc3339(),
        "🧭 CURSOR_OPERATION"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_by_environment() {
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_structured_logging(LogFormat::Json);
        init_structured_logging(LogFormat::Pretty);
        log_batch_operation("write_batch", Some(1), 10, "written", None);
    }

    #[test]
    fn test_log_format_deserializes_snake_case() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
    }
}
