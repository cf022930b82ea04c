//! # Models
//!
//! Value records that flow through the pipeline: entities in, statements
//! built from them, batches borrowed over the statements, and the manifest
//! describing the written batch files.

pub mod batch;
pub mod entity;
pub mod manifest;
pub mod statement;

pub use batch::{Batch, BatchSummary};
pub use entity::Entity;
pub use manifest::{Manifest, ManifestEntry, SkippedEntity};
pub use statement::{Statement, StatementParser};
