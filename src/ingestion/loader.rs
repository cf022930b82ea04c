//! # Deal Loader
//!
//! Reads the raw dataset and keeps, in original order, the entities that have
//! something to write. Order is never changed so batching stays reproducible
//! across runs over the same file.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{BatchError, BatchResult};
use crate::models::Entity;

/// Counts observed while loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    pub total_records: usize,
    pub qualifying_records: usize,
}

impl LoadReport {
    pub fn filtered_out(&self) -> usize {
        self.total_records - self.qualifying_records
    }
}

#[derive(Debug, Clone)]
pub struct DealLoader {
    records: Vec<Entity>,
}

impl DealLoader {
    /// Load a dataset file holding a JSON array of entity records
    pub fn from_path(path: impl AsRef<Path>) -> BatchResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| BatchError::io(path, e))?;

        let records: Vec<Entity> = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            BatchError::Dataset(format!("Failed to parse dataset {}: {e}", path.display()))
        })?;

        debug!(
            path = %path.display(),
            records = records.len(),
            "Loaded raw dataset"
        );

        Ok(Self { records })
    }

    pub fn from_records(records: Vec<Entity>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Entity] {
        &self.records
    }

    /// Entities whose payload is present and non-empty, in dataset order
    pub fn qualifying(&self) -> Vec<&Entity> {
        self.records.iter().filter(|e| e.has_payload()).collect()
    }

    /// Consume the loader, returning the qualifying entities and load counts
    pub fn into_qualifying(self) -> (Vec<Entity>, LoadReport) {
        let total_records = self.records.len();
        let qualifying: Vec<Entity> = self
            .records
            .into_iter()
            .filter(Entity::has_payload)
            .collect();

        let report = LoadReport {
            total_records,
            qualifying_records: qualifying.len(),
        };

        info!(
            total_records = report.total_records,
            qualifying_records = report.qualifying_records,
            filtered_out = report.filtered_out(),
            "📦 DATASET: Filtered entities with payload"
        );

        (qualifying, report)
    }
}
