//! # deal-batch
//!
//! Command-line front end for splitting deal payload updates into batch
//! files, handing them out window by window, and reconciling the result.
//!
//! Exit status is `0` on success and `1` on any fatal error.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use tracing::info;

use deal_batch_core::config::StrategyKind;
use deal_batch_core::{
    init_structured_logging, lookup_query, BatchConfig, BatchPipeline, ConfigLoader, CursorError,
    DiscrepancyFinder, EmitExecutor, ExecutionCursor, ExecutionDriver, FileCursorStore, LogFormat,
    ResumePolicy, StillEmptySnapshot,
};

#[derive(Parser)]
#[command(name = "deal-batch")]
#[command(about = "Split, hand out and reconcile bulk payload updates")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "DEAL_BATCH_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormatArg>,

    /// Directory holding batch files, the manifest and the plan
    ///
    /// A cursor record kept inside the configured output directory moves here too.
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render and partition a dataset into batch files
    Split {
        /// JSON array of deal records
        #[arg(short, long)]
        dataset: PathBuf,

        #[command(flatten)]
        partition: PartitionArgs,
    },

    /// Re-partition statements rendered earlier
    Resplit {
        /// Statement files, one statement per line
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        partition: PartitionArgs,
    },

    /// Durable execution cursor over the written statements
    Cursor {
        #[command(subcommand)]
        action: CursorAction,
    },

    /// Compare submitted ids with an authoritative still-empty snapshot
    Reconcile {
        /// Snapshot file: JSON ids, JSON rows, or one id per line
        #[arg(short, long)]
        still_empty: PathBuf,

        /// Write the regenerated statements as batches here
        #[arg(long)]
        resubmit_dir: Option<PathBuf>,
    },

    /// Print the query that lists still-empty ids
    LookupQuery {
        /// Ids to check; defaults to every written statement
        #[arg(long, value_delimiter = ',')]
        ids: Vec<String>,
    },
}

#[derive(Subcommand)]
enum CursorAction {
    /// Create the cursor at offset zero
    Init {
        /// Replace an existing cursor
        #[arg(long)]
        force: bool,
    },

    /// Emit the next window of statements to stdout
    Next {
        #[arg(short, long)]
        window: Option<usize>,

        /// Commit the window as soon as it is emitted
        #[arg(long)]
        advance: bool,
    },

    /// Record that the window starting at `start` was applied
    Commit {
        #[arg(long)]
        start: usize,

        #[arg(short, long)]
        window: Option<usize>,
    },

    /// Show the persisted offset
    Status,
}

#[derive(Args)]
struct PartitionArgs {
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Statements per batch for the fixed-count strategy
    #[arg(long)]
    batch_size: Option<usize>,

    /// Byte budget per batch for the size-bounded strategy
    #[arg(long)]
    max_bytes: Option<usize>,

    /// Batch file name prefix
    #[arg(long)]
    prefix: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    FixedCount,
    SizeBounded,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

impl PartitionArgs {
    fn apply(&self, config: &mut BatchConfig) {
        if let Some(strategy) = self.strategy {
            config.partition.strategy = match strategy {
                StrategyArg::FixedCount => StrategyKind::FixedCount,
                StrategyArg::SizeBounded => StrategyKind::SizeBounded,
            };
        }
        if let Some(batch_size) = self.batch_size {
            config.partition.batch_size = batch_size;
        }
        if let Some(max_bytes) = self.max_bytes {
            config.partition.max_bytes = max_bytes;
        }
        if let Some(prefix) = &self.prefix {
            config.output.file_prefix = prefix.clone();
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("❌ {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = ConfigLoader::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    if let Some(format) = cli.log_format {
        config.logging.format = match format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        };
    }
    if let Some(dir) = &cli.output_dir {
        config.relocate_output(dir);
    }

    init_structured_logging(config.logging.format);

    match cli.command {
        Commands::Split { dataset, partition } => {
            partition.apply(&mut config);
            split(&config, dataset)
        }
        Commands::Resplit { files, partition } => {
            partition.apply(&mut config);
            resplit(&config, &files)
        }
        Commands::Cursor { action } => cursor(&config, action),
        Commands::Reconcile {
            still_empty,
            resubmit_dir,
        } => reconcile(&config, still_empty, resubmit_dir),
        Commands::LookupQuery { ids } => print_lookup_query(&config, ids),
    }
}

fn split(config: &BatchConfig, dataset: PathBuf) -> Result<()> {
    let pipeline = BatchPipeline::from_config(config).context("Invalid pipeline configuration")?;
    let report = pipeline
        .split_dataset(&dataset)
        .with_context(|| format!("Failed to split dataset {}", dataset.display()))?;

    print!("{}", report.manifest.render_plan());
    Ok(())
}

fn resplit(config: &BatchConfig, files: &[PathBuf]) -> Result<()> {
    let pipeline = BatchPipeline::from_config(config).context("Invalid pipeline configuration")?;
    let report = pipeline
        .resplit_files(files)
        .context("Failed to re-partition statement files")?;

    print!("{}", report.manifest.render_plan());
    Ok(())
}

fn cursor(config: &BatchConfig, action: CursorAction) -> Result<()> {
    let pipeline = BatchPipeline::from_config(config).context("Invalid pipeline configuration")?;
    let statements = pipeline
        .written_statements()
        .context("Failed to read written batches; run `split` first")?;
    let store = FileCursorStore::new(&config.cursor.state_path);

    match action {
        CursorAction::Init { force } => {
            ExecutionCursor::initialize(store, statements.len(), force)
                .context("Failed to initialize cursor")?;
            println!(
                "Cursor initialized at {} for {} statements",
                config.cursor.state_path.display(),
                statements.len()
            );
        }
        CursorAction::Next { window, advance } => {
            let cursor = open_cursor(config, store, statements.len())?;
            let window_size = window.unwrap_or(config.cursor.window_size);
            let window = cursor.next_window(&statements, window_size)?;

            if window.exhausted {
                println!("-- cursor exhausted: all {} statements issued", statements.len());
                return Ok(());
            }

            println!(
                "-- window [{}, {}) of {}",
                window.start,
                window.end,
                statements.len()
            );
            let stdout = io::stdout();
            let mut driver = ExecutionDriver::new(
                EmitExecutor::new(stdout.lock()),
                config.execution.failure_policy,
            );
            let summary = driver.run(window.items);

            if advance && !summary.halted {
                cursor.commit(&window)?;
            } else {
                eprintln!(
                    "Apply the window, then run: deal-batch cursor commit --start {} --window {}",
                    window.start, window_size
                );
            }
        }
        CursorAction::Commit { start, window } => {
            let cursor = open_cursor(config, store, statements.len())?;
            let window_size = window.unwrap_or(config.cursor.window_size);
            let window = cursor.next_window(&statements, window_size)?;

            if window.start != start {
                return Err(CursorError::StaleWindow {
                    window_start: start,
                    stored_offset: window.start,
                }
                .into());
            }
            let record = cursor.commit(&window)?;
            println!(
                "Committed [{}, {}); next offset {} of {}",
                window.start, window.end, record.next_offset, record.total_statements
            );
        }
        CursorAction::Status => {
            let cursor = open_cursor(config, store, statements.len())?;
            let status = cursor.status()?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}

fn open_cursor(
    config: &BatchConfig,
    store: FileCursorStore,
    total: usize,
) -> Result<ExecutionCursor<FileCursorStore>> {
    let policy: ResumePolicy = config.cursor.resume_policy;
    ExecutionCursor::open(store, total, policy).context("Failed to open cursor")
}

fn reconcile(
    config: &BatchConfig,
    still_empty: PathBuf,
    resubmit_dir: Option<PathBuf>,
) -> Result<()> {
    let pipeline = BatchPipeline::from_config(config).context("Invalid pipeline configuration")?;
    let statements = pipeline
        .written_statements()
        .context("Failed to read written batches")?;
    let snapshot = StillEmptySnapshot::from_path(&still_empty, &config.statement.key_column)
        .with_context(|| format!("Failed to read snapshot {}", still_empty.display()))?;

    let report = DiscrepancyFinder::reconcile(&statements, &snapshot)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.is_clean() {
        return Ok(());
    }

    match resubmit_dir {
        Some(dir) => {
            let mut resubmit_config = config.clone();
            resubmit_config.relocate_output(dir);
            let resubmit = BatchPipeline::from_config(&resubmit_config)?
                .resplit(&report.resubmit)
                .context("Failed to write resubmit batches")?;

            info!(
                output_dir = %resubmit_config.output.directory.display(),
                batches = resubmit.manifest.total_batches,
                "Resubmit batches written"
            );
            print!("{}", resubmit.manifest.render_plan());
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            for statement in &report.resubmit {
                writeln!(out, "{}", statement.rendered_text())?;
            }
        }
    }

    Ok(())
}

fn print_lookup_query(config: &BatchConfig, ids: Vec<String>) -> Result<()> {
    let ids: BTreeSet<String> = if ids.is_empty() {
        BatchPipeline::from_config(config)?
            .written_statements()
            .context("Failed to read written batches")?
            .iter()
            .map(|statement| statement.target_id().to_string())
            .collect()
    } else {
        ids.into_iter().map(|id| id.trim().to_string()).collect()
    };

    if ids.is_empty() {
        bail!("No ids to look up");
    }

    let query = lookup_query(&config.statement.template(), ids.iter().map(String::as_str))?;
    println!("{query}");
    Ok(())
}
