//! Configuration Loader
//!
//! Merges, lowest precedence first:
//! 1. Built-in defaults (`BatchConfig::default()`)
//! 2. A TOML file, from an explicit path or `DEAL_BATCH_CONFIG_PATH`
//! 3. Environment variables such as `DEAL_BATCH__PARTITION__MAX_BYTES=20000`
//!
//! The merged result is validated before it is returned.

use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::{ConfigResult, ConfigurationError};
use super::BatchConfig;
use crate::constants::env::{CONFIG_PATH, CONFIG_PREFIX};

/// Zero-state loader; all functions are associated functions
#[derive(Debug)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load with the config path taken from `DEAL_BATCH_CONFIG_PATH` when set
    pub fn load() -> ConfigResult<BatchConfig> {
        let path = std::env::var(CONFIG_PATH).ok().map(PathBuf::from);
        Self::load_from(path.as_deref())
    }

    /// Load with an explicit config file; a missing explicit file is an error
    pub fn load_from(path: Option<&Path>) -> ConfigResult<BatchConfig> {
        Self::load_with_env_prefix(path, CONFIG_PREFIX)
    }

    /// Same as [`load_from`](Self::load_from) with a custom environment prefix
    ///
    /// Useful for testing without touching the real `DEAL_BATCH__*` variables.
    pub fn load_with_env_prefix(
        path: Option<&Path>,
        env_prefix: &str,
    ) -> ConfigResult<BatchConfig> {
        let defaults = Config::try_from(&BatchConfig::default())
            .map_err(|e| ConfigurationError::load_error("built-in defaults", e))?;

        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigurationError::ConfigFileNotFound {
                    path: path.to_path_buf(),
                });
            }
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .separator("__")
                .try_parsing(true),
        );

        let source_description = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "defaults and environment".to_string());

        let config: BatchConfig = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| ConfigurationError::load_error(&source_description, e))?;

        config.validate()?;

        debug!(
            source = %source_description,
            strategy = %config.partition.to_strategy(),
            output_dir = %config.output.directory.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyKind;
    use crate::execution::{FailurePolicy, ResumePolicy};

    // Unique prefix so ambient variables never leak into these tests
    const TEST_PREFIX: &str = "DEAL_BATCH_LOADER_UNIT_TEST";

    #[test]
    fn test_load_without_file_yields_defaults() {
        let config = ConfigLoader::load_with_env_prefix(None, TEST_PREFIX).unwrap();
        assert_eq!(config, BatchConfig::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deal-batch.toml");
        std::fs::write(
            &path,
            r#"
[statement]
table = "orders"

[partition]
strategy = "fixed_count"
batch_size = 50

[cursor]
window_size = 3
resume_policy = "reset_if_unreadable"

[execution]
failure_policy = "halt_on_failure"
"#,
        )
        .unwrap();

        let config = ConfigLoader::load_with_env_prefix(Some(&path), TEST_PREFIX).unwrap();

        assert_eq!(config.statement.table, "orders");
        assert_eq!(config.statement.column, "products");
        assert_eq!(config.partition.strategy, StrategyKind::FixedCount);
        assert_eq!(config.partition.batch_size, 50);
        assert_eq!(config.cursor.window_size, 3);
        assert_eq!(config.cursor.resume_policy, ResumePolicy::ResetIfUnreadable);
        assert_eq!(config.execution.failure_policy, FailurePolicy::HaltOnFailure);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = ConfigLoader::load_with_env_prefix(
            Some(Path::new("/nonexistent/deal-batch.toml")),
            TEST_PREFIX,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::ConfigFileNotFound { .. }));
    }

    #[test]
    fn test_invalid_file_value_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deal-batch.toml");
        std::fs::write(&path, "[partition]\nmax_bytes = 0\n").unwrap();

        let err = ConfigLoader::load_with_env_prefix(Some(&path), TEST_PREFIX).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
    }
}
