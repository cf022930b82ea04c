//! # Manifest
//!
//! Read-only record of how a run split its statements into batch files. It is
//! written once, after every batch file is on disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

use crate::batch_processing::PartitionStrategy;

/// An entity that failed validation and was left out of the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntity {
    pub id: String,
    pub reason: String,
}

/// One line of the manifest per batch file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub index: usize,
    pub file_name: String,
    pub statement_count: usize,
    pub size_bytes: usize,
}

/// Totals and per-batch counts for one partitioning run
///
/// # Example
/// ```json
/// {
///   "run_id": "1b4e28ba-2fa1-41d2-883f-0016d3cca427",
///   "generated_at": "2025-10-02T14:03:11Z",
///   "strategy": { "type": "size_bounded", "max_bytes": 10000 },
///   "total_statements": 23,
///   "total_batches": 3,
///   "per_batch_counts": [10, 10, 3],
///   "batches": [...],
///   "skipped": []
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub strategy: PartitionStrategy,
    pub total_statements: usize,
    pub total_batches: usize,
    pub per_batch_counts: Vec<usize>,
    pub batches: Vec<ManifestEntry>,
    #[serde(default)]
    pub skipped: Vec<SkippedEntity>,
}

impl Manifest {
    pub fn new(
        strategy: PartitionStrategy,
        batches: Vec<ManifestEntry>,
        skipped: Vec<SkippedEntity>,
    ) -> Self {
        let per_batch_counts: Vec<usize> = batches.iter().map(|b| b.statement_count).collect();

        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            strategy,
            total_statements: per_batch_counts.iter().sum(),
            total_batches: batches.len(),
            per_batch_counts,
            batches,
            skipped,
        }
    }

    /// Plain-text execution plan for operators working through the batches by hand
    pub fn render_plan(&self) -> String {
        let mut plan = String::new();
        let rule = "=".repeat(70);

        // Writing into a String cannot fail
        let _ = writeln!(plan, "Batch Execution Plan");
        let _ = writeln!(plan, "{rule}");
        let _ = writeln!(plan);
        let _ = writeln!(plan, "Run: {}", self.run_id);
        let _ = writeln!(plan, "Generated: {}", self.generated_at.to_rfc3339());
        let _ = writeln!(plan, "Strategy: {}", self.strategy);
        let _ = writeln!(plan, "Total Statements: {}", self.total_statements);
        let _ = writeln!(plan, "Total Batches: {}", self.total_batches);
        if !self.skipped.is_empty() {
            let _ = writeln!(plan, "Skipped Entities: {}", self.skipped.len());
        }
        let _ = writeln!(plan);

        for entry in &self.batches {
            let _ = writeln!(
                plan,
                "Batch {}: {} statements, {} bytes, {}",
                entry.index, entry.statement_count, entry.size_bytes, entry.file_name
            );
        }

        plan
    }
}
