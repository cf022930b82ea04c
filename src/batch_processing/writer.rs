//! # Batch Writer
//!
//! Emits one file per batch, then the manifest, then the execution plan.
//!
//! The manifest is written last and through a temp file + rename, so an
//! aborted run leaves batch files without a manifest rather than a manifest
//! that describes output which never made it to disk. Batch files left over
//! from an earlier run with the same prefix are removed first; regenerating
//! from the same dataset is always safe.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::output::{
    BATCH_FILE_EXTENSION, DEFAULT_FILE_PREFIX, DEFAULT_OUTPUT_DIR, DEFAULT_SEPARATOR,
    MANIFEST_FILE_NAME, PLAN_FILE_NAME,
};
use crate::error::{BatchError, BatchResult};
use crate::logging::log_batch_operation;
use crate::models::{Batch, Manifest, ManifestEntry, SkippedEntity};

use super::PartitionStrategy;

/// Where and how batch artifacts are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchWriter {
    output_dir: PathBuf,
    file_prefix: String,
    separator: String,
    manifest_file_name: String,
    plan_file_name: String,
}

impl Default for BatchWriter {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}

impl BatchWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
            manifest_file_name: MANIFEST_FILE_NAME.to_string(),
            plan_file_name: PLAN_FILE_NAME.to_string(),
        }
    }

    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_manifest_file_name(mut self, name: impl Into<String>) -> Self {
        self.manifest_file_name = name.into();
        self
    }

    pub fn with_plan_file_name(mut self, name: impl Into<String>) -> Self {
        self.plan_file_name = name.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join(&self.manifest_file_name)
    }

    pub fn plan_path(&self) -> PathBuf {
        self.output_dir.join(&self.plan_file_name)
    }

    /// `batch-007.sql` for index 7 with the default prefix
    pub fn batch_file_name(&self, index: usize) -> String {
        format!("{}-{index:03}.{BATCH_FILE_EXTENSION}", self.file_prefix)
    }

    /// Write every batch file, then the manifest and plan
    ///
    /// Any I/O failure aborts the stage. No manifest is produced in that case.
    pub fn write(
        &self,
        batches: &[Batch<'_>],
        strategy: PartitionStrategy,
        skipped: Vec<SkippedEntity>,
    ) -> BatchResult<Manifest> {
        fs::create_dir_all(&self.output_dir).map_err(|e| BatchError::io(&self.output_dir, e))?;
        self.remove_stale_artifacts()?;

        let mut entries = Vec::with_capacity(batches.len());
        for batch in batches {
            let file_name = self.batch_file_name(batch.index);
            let path = self.output_dir.join(&file_name);

            fs::write(&path, batch.render(&self.separator)).map_err(|e| BatchError::io(&path, e))?;

            log_batch_operation(
                "write_batch",
                Some(batch.index),
                batch.statement_count(),
                "written",
                Some(&file_name),
            );

            entries.push(ManifestEntry {
                index: batch.index,
                file_name,
                statement_count: batch.statement_count(),
                size_bytes: batch.total_size_bytes,
            });
        }

        let manifest = Manifest::new(strategy, entries, skipped);
        let manifest_json = serde_json::to_string_pretty(&manifest)?;
        write_atomically(&self.manifest_path(), manifest_json.as_bytes())?;
        write_atomically(&self.plan_path(), manifest.render_plan().as_bytes())?;

        info!(
            output_dir = %self.output_dir.display(),
            run_id = %manifest.run_id,
            total_statements = manifest.total_statements,
            total_batches = manifest.total_batches,
            skipped = manifest.skipped.len(),
            "✅ OUTPUT: Batch files and manifest written"
        );

        Ok(manifest)
    }

    /// Read back the manifest written by a previous run
    pub fn read_manifest(&self) -> BatchResult<Manifest> {
        let path = self.manifest_path();
        let raw = fs::read_to_string(&path).map_err(|e| BatchError::io(&path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Batch files and the manifest from an earlier run with this prefix
    fn remove_stale_artifacts(&self) -> BatchResult<()> {
        let prefix = format!("{}-", self.file_prefix);
        let suffix = format!(".{BATCH_FILE_EXTENSION}");

        let entries =
            fs::read_dir(&self.output_dir).map_err(|e| BatchError::io(&self.output_dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| BatchError::io(&self.output_dir, e))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();

            let is_stale_batch = name.starts_with(&prefix) && name.ends_with(&suffix);
            let is_stale_summary = name == self.manifest_file_name.as_str()
                || name == self.plan_file_name.as_str();

            if is_stale_batch || is_stale_summary {
                let path = entry.path();
                debug!(path = %path.display(), "Removing artifact from previous run");
                fs::remove_file(&path).map_err(|e| BatchError::io(&path, e))?;
            }
        }

        Ok(())
    }
}

/// Write to a sibling temp file and rename over the destination
fn write_atomically(path: &Path, contents: &[u8]) -> BatchResult<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, contents).map_err(|e| BatchError::io(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| BatchError::io(path, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch_processing::BatchPartitioner;
    use crate::models::Statement;

    fn statements(count: usize) -> Vec<Statement> {
        (1..=count)
            .map(|i| {
                Statement::new(
                    i.to_string(),
                    format!(
                        "UPDATE sales SET products = '[{i}]'::jsonb WHERE ploomes_deal_id = '{i}';"
                    ),
                )
            })
            .collect()
    }

    #[test]
    fn test_batch_file_name_is_zero_padded() {
        let writer = BatchWriter::new("out").with_file_prefix("mcp-batch");
        assert_eq!(writer.batch_file_name(7), "mcp-batch-007.sql");
        assert_eq!(writer.batch_file_name(1234), "mcp-batch-1234.sql");
    }

    #[test]
    fn test_write_emits_batches_manifest_and_plan() {
        let dir = tempfile::tempdir().unwrap();
        let writer = BatchWriter::new(dir.path());
        let statements = statements(5);
        let strategy = PartitionStrategy::FixedCount { batch_size: 2 };
        let batches = BatchPartitioner::new(strategy).unwrap().partition(&statements);

        let manifest = writer.write(&batches, strategy, vec![]).unwrap();

        assert_eq!(manifest.total_statements, 5);
        assert_eq!(manifest.per_batch_counts, vec![2, 2, 1]);

        let first = fs::read_to_string(dir.path().join("batch-001.sql")).unwrap();
        assert_eq!(first.lines().count(), 2);
        assert!(first.ends_with("WHERE ploomes_deal_id = '2';"));

        let persisted = writer.read_manifest().unwrap();
        assert_eq!(persisted, manifest);

        let plan = fs::read_to_string(writer.plan_path()).unwrap();
        assert!(plan.contains("Batch 3: 1 statements"));
    }

    #[test]
    fn test_rewrite_removes_stale_batch_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = BatchWriter::new(dir.path());
        let strategy = PartitionStrategy::FixedCount { batch_size: 1 };

        let many = statements(4);
        let batches = BatchPartitioner::new(strategy).unwrap().partition(&many);
        writer.write(&batches, strategy, vec![]).unwrap();
        assert!(dir.path().join("batch-004.sql").exists());

        let few = statements(2);
        let batches = BatchPartitioner::new(strategy).unwrap().partition(&few);
        writer.write(&batches, strategy, vec![]).unwrap();

        assert!(dir.path().join("batch-002.sql").exists());
        assert!(!dir.path().join("batch-003.sql").exists());
        assert!(!dir.path().join("batch-004.sql").exists());
        assert_eq!(writer.read_manifest().unwrap().total_batches, 2);
    }

    #[test]
    fn test_stale_manifest_and_plan_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let writer = BatchWriter::new(dir.path());
        fs::write(writer.plan_path(), "Batch 9: 1 statements").unwrap();
        fs::write(dir.path().join("manifest.json"), "{}").unwrap();

        writer.remove_stale_artifacts().unwrap();

        assert!(!writer.plan_path().exists());
        assert!(!dir.path().join("manifest.json").exists());
    }

    #[test]
    fn test_unrelated_files_survive_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cursor.json"), "{}").unwrap();
        fs::write(dir.path().join("delta-001.sql"), "keep").unwrap();

        let writer = BatchWriter::new(dir.path());
        let strategy = PartitionStrategy::FixedCount { batch_size: 10 };
        let statements = statements(1);
        let batches = BatchPartitioner::new(strategy).unwrap().partition(&statements);
        writer.write(&batches, strategy, vec![]).unwrap();

        assert!(dir.path().join("cursor.json").exists());
        assert!(dir.path().join("delta-001.sql").exists());
    }

    #[test]
    fn test_custom_separator() {
        let dir = tempfile::tempdir().unwrap();
        let writer = BatchWriter::new(dir.path()).with_separator("\n\n");
        let strategy = PartitionStrategy::FixedCount { batch_size: 10 };
        let statements = statements(2);
        let batches = BatchPartitioner::new(strategy).unwrap().partition(&statements);
        writer.write(&batches, strategy, vec![]).unwrap();

        let body = fs::read_to_string(dir.path().join("batch-001.sql")).unwrap();
        assert_eq!(body.matches("\n\n").count(), 1);
    }
}
