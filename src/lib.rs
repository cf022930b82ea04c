#![allow(clippy::doc_markdown)] // Allow technical terms like JSONB, SQL in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Deal Batch Core
//!
//! Batch orchestration for bulk JSON-column updates against a remote
//! relational store that can only be reached through a constrained,
//! size-limited execution channel.
//!
//! ## Overview
//!
//! A dataset of deal records is filtered to the ones carrying a product
//! payload, rendered into one escaped `UPDATE` statement per deal, split into
//! batches that fit the channel, and written out as numbered batch files plus
//! a manifest. A durable cursor hands those statements out window by window
//! across separate invocations, and a reconciliation pass compares what was
//! submitted with what the store actually holds.
//!
//! ## Module Organization
//!
//! - [`ingestion`] - Dataset loading, statement rendering, reading rendered statements back
//! - [`batch_processing`] - Partitioning strategies and batch/manifest output
//! - [`execution`] - Durable cursor and the executor seam
//! - [`reconciliation`] - Detection of submitted-but-not-applied updates
//! - [`pipeline`] - The stages wired into a single run
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deal_batch_core::config::BatchConfig;
//! use deal_batch_core::pipeline::BatchPipeline;
//!
//! # fn example() -> Result<(), deal_batch_core::BatchError> {
//! let config = BatchConfig::default();
//! let pipeline = BatchPipeline::from_config(&config)?;
//!
//! let report = pipeline.split_dataset("ploomes-deals-with-products.json")?;
//! println!(
//!     "{} statements in {} batches",
//!     report.manifest.total_statements, report.manifest.total_batches
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, integration and property tests
//! ```

pub mod batch_processing;
pub mod config;
pub mod constants;
pub mod error;
pub mod execution;
pub mod ingestion;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod reconciliation;

pub use batch_processing::{BatchPartitioner, BatchWriter, PartitionStrategy};
pub use config::{BatchConfig, ConfigLoader, ConfigurationError};
pub use error::{BatchError, BatchResult, ValidationError};
pub use execution::{
    CursorError, CursorStore, EmitExecutor, ExecutionCursor, ExecutionDriver, ExecutionSummary,
    FailurePolicy, FileCursorStore, InMemoryCursorStore, ResumePolicy, StatementExecutor,
};
pub use ingestion::{DealLoader, StatementBuilder, StatementFileReader, StatementTemplate};
pub use logging::{init_structured_logging, LogFormat};
pub use models::{Batch, Entity, Manifest, Statement};
pub use pipeline::{BatchPipeline, PipelineReport};
pub use reconciliation::{
    lookup_query, AuthoritativeReader, DiscrepancyFinder, ReconciliationReport, StillEmptySnapshot,
};
