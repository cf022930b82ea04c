//! Batch Processing Infrastructure
//!
//! Splits the ordered statement list into batches and writes them out.
//!
//! # Overview
//!
//! - **Partitioner**: one abstraction, two strategies (`FixedCount`, `SizeBounded`)
//! - **Writer**: batch files, the write-once manifest, and the execution plan

mod partitioner;
mod writer;

pub use partitioner::{BatchPartitioner, PartitionStrategy};
pub use writer::BatchWriter;
