//! # Batch Pipeline
//!
//! The sequential stages of a run wired together:
//! `DealLoader → StatementBuilder → BatchPartitioner → BatchWriter`.
//!
//! A resplit enters at the partitioner with statements read back from files
//! rendered earlier, for example a consolidated file or a reconciliation
//! resubmit set.

use std::path::Path;
use tracing::info;

use crate::batch_processing::{BatchPartitioner, BatchWriter, PartitionStrategy};
use crate::config::BatchConfig;
use crate::error::BatchResult;
use crate::ingestion::{DealLoader, LoadReport, StatementBuilder, StatementFileReader};
use crate::models::{Entity, Manifest, SkippedEntity, Statement};

/// What one pipeline run produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Present when the run started from a dataset
    pub load: Option<LoadReport>,
    pub manifest: Manifest,
}

#[derive(Debug, Clone)]
pub struct BatchPipeline {
    builder: StatementBuilder,
    partitioner: BatchPartitioner,
    writer: BatchWriter,
}

impl BatchPipeline {
    pub fn new(
        builder: StatementBuilder,
        strategy: PartitionStrategy,
        writer: BatchWriter,
    ) -> BatchResult<Self> {
        builder.template().validate()?;
        Ok(Self {
            builder,
            partitioner: BatchPartitioner::new(strategy)?,
            writer,
        })
    }

    pub fn from_config(config: &BatchConfig) -> BatchResult<Self> {
        config.validate()?;
        Self::new(
            config.statement.builder(),
            config.partition.to_strategy(),
            config.output.writer(),
        )
    }

    pub fn writer(&self) -> &BatchWriter {
        &self.writer
    }

    pub fn strategy(&self) -> PartitionStrategy {
        self.partitioner.strategy()
    }

    /// Full run from a dataset file
    pub fn split_dataset(&self, dataset_path: impl AsRef<Path>) -> BatchResult<PipelineReport> {
        let loader = DealLoader::from_path(dataset_path)?;
        self.split_loaded(loader)
    }

    /// Full run from records already in memory
    pub fn split_loaded(&self, loader: DealLoader) -> BatchResult<PipelineReport> {
        let (entities, load_report) = loader.into_qualifying();
        let manifest = self.split_entities(&entities, load_report.filtered_out())?;

        Ok(PipelineReport {
            load: Some(load_report),
            manifest,
        })
    }

    /// Re-partition statements rendered earlier
    pub fn resplit(&self, statements: &[Statement]) -> BatchResult<PipelineReport> {
        let manifest = self.partition_and_write(statements, Vec::new())?;
        Ok(PipelineReport {
            load: None,
            manifest,
        })
    }

    /// Read statement files and re-partition them
    pub fn resplit_files<P: AsRef<Path>>(&self, paths: &[P]) -> BatchResult<PipelineReport> {
        let statements = self.statement_reader().read_paths(paths)?;
        self.resplit(&statements)
    }

    /// Every statement of the last run, in batch then position order
    ///
    /// Reads the manifest and the batch files it names. The configured
    /// separator always contains a line break, which is what the file reader
    /// splits on.
    pub fn written_statements(&self) -> BatchResult<Vec<Statement>> {
        let manifest = self.writer.read_manifest()?;
        let paths: Vec<_> = manifest
            .batches
            .iter()
            .map(|entry| self.writer.output_dir().join(&entry.file_name))
            .collect();

        self.statement_reader().read_paths(&paths)
    }

    pub fn statement_reader(&self) -> StatementFileReader {
        StatementFileReader::new(&self.builder.template().key_column)
    }

    fn split_entities(&self, entities: &[Entity], filtered_out: usize) -> BatchResult<Manifest> {
        let output = self.builder.build_all(entities);

        info!(
            statements = output.statements.len(),
            skipped = output.skipped.len(),
            filtered_out = filtered_out,
            "🧱 STATEMENTS: Rendered update statements"
        );

        self.partition_and_write(&output.statements, output.skipped)
    }

    fn partition_and_write(
        &self,
        statements: &[Statement],
        skipped: Vec<SkippedEntity>,
    ) -> BatchResult<Manifest> {
        let batches = self.partitioner.partition(statements);
        self.writer.write(&batches, self.partitioner.strategy(), skipped)
    }
}
