//! # Batch Partitioner
//!
//! Splits the ordered statement list into contiguous, 1-based batches.
//!
//! ## Strategies
//!
//! - **FixedCount**: `ceil(len / n)` batches of exactly `n` statements, the
//!   last one possibly smaller.
//! - **SizeBounded**: single greedy pass with one open batch. A statement that
//!   would push a non-empty open batch past `max_bytes` closes it and opens
//!   the next one. A statement larger than `max_bytes` on its own is never
//!   split or dropped; it ends up alone in its batch.
//!
//! Both strategies keep statement order, so concatenating the batches in
//! index order reproduces the input exactly.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{BatchError, BatchResult};
use crate::models::{Batch, Statement};

/// How statements are grouped into batches
///
/// # Serialization Format
///
/// ```json
/// { "type": "fixed_count", "batch_size": 100 }
/// { "type": "size_bounded", "max_bytes": 10000 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PartitionStrategy {
    FixedCount { batch_size: usize },
    SizeBounded { max_bytes: usize },
}

impl PartitionStrategy {
    pub fn fixed_count(batch_size: usize) -> BatchResult<Self> {
        let strategy = Self::FixedCount { batch_size };
        strategy.validate()?;
        Ok(strategy)
    }

    pub fn size_bounded(max_bytes: usize) -> BatchResult<Self> {
        let strategy = Self::SizeBounded { max_bytes };
        strategy.validate()?;
        Ok(strategy)
    }

    /// A zero count or zero byte budget can never produce a valid batch
    pub fn validate(&self) -> BatchResult<()> {
        match self {
            Self::FixedCount { batch_size: 0 } => Err(BatchError::InvalidConfiguration(
                "fixed_count batch_size must be at least 1".to_string(),
            )),
            Self::SizeBounded { max_bytes: 0 } => Err(BatchError::InvalidConfiguration(
                "size_bounded max_bytes must be at least 1".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for PartitionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FixedCount { batch_size } => write!(f, "fixed_count({batch_size})"),
            Self::SizeBounded { max_bytes } => write!(f, "size_bounded({max_bytes} bytes)"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchPartitioner {
    strategy: PartitionStrategy,
}

impl BatchPartitioner {
    pub fn new(strategy: PartitionStrategy) -> BatchResult<Self> {
        strategy.validate()?;
        Ok(Self { strategy })
    }

    pub fn strategy(&self) -> PartitionStrategy {
        self.strategy
    }

    /// Partition `statements` into batches that borrow from the input slice
    pub fn partition<'a>(&self, statements: &'a [Statement]) -> Vec<Batch<'a>> {
        let batches = match self.strategy {
            PartitionStrategy::FixedCount { batch_size } => {
                Self::fixed_count(statements, batch_size)
            }
            PartitionStrategy::SizeBounded { max_bytes } => {
                Self::size_bounded(statements, max_bytes)
            }
        };

        for batch in &batches {
            debug!(
                batch_index = batch.index,
                statement_count = batch.statement_count(),
                total_size_bytes = batch.total_size_bytes,
                "Partitioned batch"
            );
        }

        info!(
            strategy = %self.strategy,
            total_statements = statements.len(),
            total_batches = batches.len(),
            "✂️ PARTITION: Split statements into batches"
        );

        batches
    }

    fn fixed_count(statements: &[Statement], batch_size: usize) -> Vec<Batch<'_>> {
        statements
            .chunks(batch_size)
            .enumerate()
            .map(|(i, chunk)| Batch::new(i + 1, chunk))
            .collect()
    }

    fn size_bounded(statements: &[Statement], max_bytes: usize) -> Vec<Batch<'_>> {
        let mut batches = Vec::new();
        let mut open_start = 0;
        let mut open_bytes = 0;

        for (position, statement) in statements.iter().enumerate() {
            let size = statement.size_bytes();

            if position > open_start && open_bytes + size > max_bytes {
                batches.push(Self::close(
                    statements,
                    open_start,
                    position,
                    max_bytes,
                    batches.len(),
                ));
                open_start = position;
                open_bytes = 0;
            }

            open_bytes += size;
        }

        if open_start < statements.len() {
            batches.push(Self::close(
                statements,
                open_start,
                statements.len(),
                max_bytes,
                batches.len(),
            ));
        }

        batches
    }

    fn close(
        statements: &[Statement],
        start: usize,
        end: usize,
        max_bytes: usize,
        closed_so_far: usize,
    ) -> Batch<'_> {
        let batch = Batch::new(closed_so_far + 1, &statements[start..end]);

        if batch.total_size_bytes > max_bytes {
            // Only a lone oversize statement can get here
            warn!(
                batch_index = batch.index,
                target_id = %statements[start].target_id(),
                size_bytes = batch.total_size_bytes,
                max_bytes = max_bytes,
                "Oversize statement placed alone in its own batch"
            );
        }

        batch
    }
}
