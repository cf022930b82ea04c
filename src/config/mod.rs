//! # Batch Orchestrator Configuration
//!
//! Layered configuration: built-in defaults, then an optional TOML file, then
//! `DEAL_BATCH__*` environment variables. CLI flags override the result.
//!
//! ## Example
//!
//! ```toml
//! [statement]
//! table = "sales"
//! column = "products"
//! cast_type = "jsonb"
//! key_column = "ploomes_deal_id"
//! max_payload_bytes = 1048576
//!
//! [partition]
//! strategy = "size_bounded"
//! batch_size = 100
//! max_bytes = 10000
//!
//! [output]
//! directory = "batches"
//! file_prefix = "batch"
//!
//! [cursor]
//! state_path = "batches/cursor.json"
//! window_size = 5
//! resume_policy = "strict"
//!
//! [execution]
//! failure_policy = "continue_on_failure"
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

use crate::batch_processing::{BatchWriter, PartitionStrategy};
use crate::constants::{cursor, output, partition, template};
use crate::execution::{FailurePolicy, ResumePolicy};
use crate::ingestion::{StatementBuilder, StatementTemplate};
use crate::logging::LogFormat;

/// Root configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub statement: StatementConfig,
    pub partition: PartitionConfig,
    pub output: OutputConfig,
    pub cursor: CursorSettings,
    pub execution: ExecutionSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementConfig {
    pub table: String,
    pub column: String,
    pub cast_type: String,
    pub key_column: String,
    pub max_payload_bytes: usize,
}

impl Default for StatementConfig {
    fn default() -> Self {
        Self {
            table: template::DEFAULT_TABLE.to_string(),
            column: template::DEFAULT_COLUMN.to_string(),
            cast_type: template::DEFAULT_CAST_TYPE.to_string(),
            key_column: template::DEFAULT_KEY_COLUMN.to_string(),
            max_payload_bytes: template::DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl StatementConfig {
    pub fn template(&self) -> StatementTemplate {
        StatementTemplate {
            table: self.table.clone(),
            column: self.column.clone(),
            cast_type: self.cast_type.clone(),
            key_column: self.key_column.clone(),
        }
    }

    pub fn builder(&self) -> StatementBuilder {
        StatementBuilder::new(self.template(), self.max_payload_bytes)
    }
}

/// Which partition strategy a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    FixedCount,
    #[default]
    SizeBounded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    pub strategy: StrategyKind,
    pub batch_size: usize,
    pub max_bytes: usize,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            batch_size: partition::DEFAULT_BATCH_SIZE,
            max_bytes: partition::DEFAULT_MAX_BATCH_BYTES,
        }
    }
}

impl PartitionConfig {
    pub fn to_strategy(&self) -> PartitionStrategy {
        match self.strategy {
            StrategyKind::FixedCount => PartitionStrategy::FixedCount {
                batch_size: self.batch_size,
            },
            StrategyKind::SizeBounded => PartitionStrategy::SizeBounded {
                max_bytes: self.max_bytes,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub file_prefix: String,
    pub separator: String,
    pub manifest_file_name: String,
    pub plan_file_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(output::DEFAULT_OUTPUT_DIR),
            file_prefix: output::DEFAULT_FILE_PREFIX.to_string(),
            separator: output::DEFAULT_SEPARATOR.to_string(),
            manifest_file_name: output::MANIFEST_FILE_NAME.to_string(),
            plan_file_name: output::PLAN_FILE_NAME.to_string(),
        }
    }
}

impl OutputConfig {
    pub fn writer(&self) -> BatchWriter {
        BatchWriter::new(&self.directory)
            .with_file_prefix(&self.file_prefix)
            .with_separator(&self.separator)
            .with_manifest_file_name(&self.manifest_file_name)
            .with_plan_file_name(&self.plan_file_name)
    }
}

/// Durable cursor location and window settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorSettings {
    pub state_path: PathBuf,
    pub window_size: usize,
    pub resume_policy: ResumePolicy,
}

impl Default for CursorSettings {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from(cursor::DEFAULT_STATE_PATH),
            window_size: cursor::DEFAULT_WINDOW_SIZE,
            resume_policy: ResumePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl BatchConfig {
    /// Point the output directory at `dir`
    ///
    /// A cursor record stored inside the previous output directory moves
    /// with it. A cursor path outside that directory is left alone.
    pub fn relocate_output(&mut self, dir: impl AsRef<Path>) {
        let dir = dir.as_ref();
        if let Ok(relative) = self.cursor.state_path.strip_prefix(&self.output.directory) {
            self.cursor.state_path = dir.join(relative);
        }
        self.output.directory = dir.to_path_buf();
    }

    /// Explicit validation; no silent fallbacks for values that cannot work
    pub fn validate(&self) -> ConfigResult<()> {
        let identifiers = [
            ("statement.table", &self.statement.table),
            ("statement.column", &self.statement.column),
            ("statement.cast_type", &self.statement.cast_type),
            ("statement.key_column", &self.statement.key_column),
            ("output.file_prefix", &self.output.file_prefix),
            ("output.manifest_file_name", &self.output.manifest_file_name),
        ];
        for (field, value) in identifiers {
            if value.trim().is_empty() {
                return Err(ConfigurationError::invalid_value(
                    field,
                    value,
                    "must not be empty",
                ));
            }
        }

        let sizes = [
            ("statement.max_payload_bytes", self.statement.max_payload_bytes),
            ("partition.batch_size", self.partition.batch_size),
            ("partition.max_bytes", self.partition.max_bytes),
            ("cursor.window_size", self.cursor.window_size),
        ];
        for (field, value) in sizes {
            if value == 0 {
                return Err(ConfigurationError::invalid_value(
                    field,
                    value,
                    "must be at least 1",
                ));
            }
        }

        // Batch files are read back one statement per line
        if !self.output.separator.contains('\n') {
            return Err(ConfigurationError::invalid_value(
                "output.separator",
                self.output.separator.escape_debug(),
                "must contain a newline",
            ));
        }

        Ok(())
    }
}
