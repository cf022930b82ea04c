//! # Constants
//!
//! Defaults shared by the builder, partitioner, writer and CLI. Every value
//! here can be overridden through [`crate::config::BatchConfig`].

/// Statement template defaults
pub mod template {
    pub const DEFAULT_TABLE: &str = "sales";
    pub const DEFAULT_COLUMN: &str = "products";
    pub const DEFAULT_CAST_TYPE: &str = "jsonb";
    pub const DEFAULT_KEY_COLUMN: &str = "ploomes_deal_id";

    /// Upper bound on a single serialized payload (1 MiB)
    pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;
}

/// Partitioning defaults
pub mod partition {
    /// Statements per batch for the fixed-count strategy
    pub const DEFAULT_BATCH_SIZE: usize = 100;

    /// Byte budget per batch for the size-bounded strategy (~10KB per call)
    pub const DEFAULT_MAX_BATCH_BYTES: usize = 10_000;
}

/// Output artifact naming
pub mod output {
    pub const DEFAULT_OUTPUT_DIR: &str = "batches";
    pub const DEFAULT_FILE_PREFIX: &str = "batch";
    pub const BATCH_FILE_EXTENSION: &str = "sql";
    pub const DEFAULT_SEPARATOR: &str = "\n";
    pub const MANIFEST_FILE_NAME: &str = "manifest.json";
    pub const PLAN_FILE_NAME: &str = "EXECUTION-PLAN.txt";
}

/// Cursor defaults
pub mod cursor {
    pub const DEFAULT_STATE_PATH: &str = "batches/cursor.json";
    pub const DEFAULT_WINDOW_SIZE: usize = 5;
}

/// Environment variables read outside of the layered config
pub mod env {
    pub const ENVIRONMENT: &str = "DEAL_BATCH_ENV";
    pub const LOG_FILTER: &str = "DEAL_BATCH_LOG";
    pub const CONFIG_PATH: &str = "DEAL_BATCH_CONFIG_PATH";
    pub const CONFIG_PREFIX: &str = "DEAL_BATCH";
}
