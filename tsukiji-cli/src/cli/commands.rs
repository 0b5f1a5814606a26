//! Command implementations and argument parsing for the tsukiji CLI.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use thiserror::Error;
use tracing::{Span, field, info, instrument};
use tsukiji_core::{
    DocId, Generation, HnswError, HnswInvariant, HnswInvariantViolation, HnswParams, MemoryUsage,
    Pipeline, PipelineConfig, PipelineError, SquaredEuclidean,
};

use super::fvecs::{FvecsError, read_fvecs_path};

const REMOVE_SHARE: f64 = 0.7;
const PROGRESS_STEPS: usize = 10;

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(name = "tsukiji", about = "Exercise the tsukiji concurrent HNSW index.")]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Drive random mutations through the pipeline and verify the index.
    Stress(StressCommand),
}

/// Options accepted by the `stress` command.
#[derive(Debug, Args, Clone)]
pub struct StressCommand {
    /// Number of add, update and remove operations to submit.
    #[arg(long, default_value_t = 50_000)]
    pub ops: usize,

    /// Size of the document id space.
    #[arg(long, default_value_t = 10_000)]
    pub docs: DocId,

    /// Dimensionality of generated vectors.
    #[arg(long, default_value_t = 128)]
    pub dims: usize,

    /// Number of distinct vectors operations draw from.
    #[arg(long = "vector-pool", default_value_t = 1_000)]
    pub vector_pool: usize,

    /// Read the vector pool from an `.fvecs` file instead of generating it.
    #[arg(long)]
    pub fvecs: Option<PathBuf>,

    /// Maximum connections per node above layer zero.
    #[arg(long, default_value_t = 16)]
    pub m: usize,

    /// Candidate list size used while inserting.
    #[arg(long = "ef-construction", default_value_t = 200)]
    pub ef_construction: usize,

    /// Keep the nearest candidates instead of the diversity heuristic.
    #[arg(long = "no-heuristic")]
    pub no_heuristic: bool,

    /// Threads preparing insertions.
    #[arg(long = "prepare-threads", default_value_t = 10)]
    pub prepare_threads: usize,

    /// Prepare tasks allowed in flight.
    #[arg(long = "prepare-queue", default_value_t = 50)]
    pub prepare_queue: usize,

    /// Completions allowed to wait for the writer.
    #[arg(long = "write-queue", default_value_t = 15)]
    pub write_queue: usize,

    /// Seed for level draws, vector generation and the operation mix.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The vector file could not be loaded.
    #[error(transparent)]
    Fvecs(#[from] FvecsError),
    /// A command-line value was unusable.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Argument name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
    /// The mutation pipeline failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// The index rejected its configuration or a query.
    #[error(transparent)]
    Index(#[from] HnswError),
    /// The drained index held a different document set than expected.
    #[error(
        "index holds {actual} documents, expected {expected}; first difference at document {first_difference}"
    )]
    DocumentMismatch {
        /// Documents that should exist.
        expected: usize,
        /// Documents present in the index.
        actual: usize,
        /// Lowest document present in only one of the two sets.
        first_difference: DocId,
    },
    /// The drained index violated a structural invariant.
    #[error("index invariant violated: {0}")]
    Invariant(#[from] HnswInvariantViolation),
}

/// Outcome of a stress run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StressSummary {
    /// Operations submitted.
    pub operations: usize,
    /// Adds submitted.
    pub adds: usize,
    /// Updates submitted.
    pub updates: usize,
    /// Removes submitted.
    pub removes: usize,
    /// Documents present after draining.
    pub documents: usize,
    /// Generation after the last commit.
    pub generation: Generation,
    /// First generation still observable by a reader.
    pub first_used: Generation,
    /// Memory held by the graph after reclamation.
    pub memory: MemoryUsage,
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when the run fails or the drained index does not
/// verify.
///
/// # Examples
/// ```
/// use clap::Parser;
/// use tsukiji_cli::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from([
///     "tsukiji", "stress", "--ops", "200", "--docs", "50", "--dims", "8",
///     "--vector-pool", "32", "--m", "4", "--ef-construction", "16",
///     "--prepare-threads", "2",
/// ]);
/// let summary = run_cli(cli)?;
/// assert_eq!(summary.operations, 200);
/// assert_eq!(summary.generation, summary.first_used);
/// # Ok::<(), tsukiji_cli::cli::CliError>(())
/// ```
#[instrument(name = "cli.run", err, skip(cli), fields(command = field::Empty))]
pub fn run_cli(cli: Cli) -> Result<StressSummary, CliError> {
    match cli.command {
        Command::Stress(stress) => {
            Span::current().record("command", field::display("stress"));
            run_stress(stress)
        }
    }
}

#[instrument(
    name = "cli.stress",
    err,
    skip(command),
    fields(ops = command.ops, docs = command.docs, source = field::Empty),
)]
pub(super) fn run_stress(command: StressCommand) -> Result<StressSummary, CliError> {
    if command.docs == 0 {
        return Err(CliError::InvalidArgument {
            name: "docs",
            reason: "must be greater than zero".into(),
        });
    }
    let params = HnswParams::new(command.m, command.ef_construction)?
        .with_heuristic_select_neighbours(!command.no_heuristic)
        .with_rng_seed(command.seed);
    let config = PipelineConfig::new(
        command.prepare_threads,
        command.prepare_queue,
        command.write_queue,
    )?;
    let pool = load_vector_pool(&command)?;
    let pipeline = Pipeline::new(params, SquaredEuclidean, config)?;

    let mut rng = SmallRng::seed_from_u64(command.seed ^ 0x9e37_79b9_7f4a_7c15);
    let mut expected = BTreeSet::new();
    let mut summary = StressSummary {
        operations: 0,
        adds: 0,
        updates: 0,
        removes: 0,
        documents: 0,
        generation: Generation::default(),
        first_used: Generation::default(),
        memory: MemoryUsage::default(),
    };
    let progress_every = (command.ops / PROGRESS_STEPS).max(1);

    while summary.operations < command.ops {
        let doc = rng.gen_range(0..command.docs);
        if pipeline.is_in_flight(doc) {
            continue;
        }
        let vector = pool[rng.gen_range(0..pool.len())].clone();
        if !expected.contains(&doc) {
            pipeline.submit_add(doc, vector)?;
            expected.insert(doc);
            summary.adds += 1;
        } else if rng.gen_bool(REMOVE_SHARE) {
            pipeline.submit_remove(doc)?;
            expected.remove(&doc);
            summary.removes += 1;
        } else {
            pipeline.submit_update(doc, vector)?;
            summary.updates += 1;
        }
        summary.operations += 1;
        if summary.operations % progress_every == 0 {
            info!(
                submitted = summary.operations,
                documents = expected.len(),
                "stress progress"
            );
        }
    }
    pipeline.drain()?;

    let index = pipeline.index();
    verify_documents(&expected, &index.documents())?;
    index.invariants().check_many(HnswInvariant::structural())?;
    index.reclaim_memory()?;

    let handler = index.generation_handler();
    summary.documents = index.len();
    summary.generation = handler.current_generation();
    summary.first_used = handler.first_used_generation();
    summary.memory = index.memory_usage();
    info!(
        documents = summary.documents,
        generation = summary.generation.get(),
        memory = %summary.memory,
        "stress run verified"
    );
    Ok(summary)
}

fn load_vector_pool(command: &StressCommand) -> Result<Vec<Vec<f32>>, CliError> {
    if command.vector_pool == 0 {
        return Err(CliError::InvalidArgument {
            name: "vector-pool",
            reason: "must be greater than zero".into(),
        });
    }
    let span = Span::current();
    if let Some(path) = &command.fvecs {
        span.record("source", field::display(path.display()));
        return Ok(read_fvecs_path(path, command.vector_pool)?);
    }
    if command.dims == 0 {
        return Err(CliError::InvalidArgument {
            name: "dims",
            reason: "must be greater than zero".into(),
        });
    }
    span.record("source", field::display("generated"));
    let mut rng = SmallRng::seed_from_u64(command.seed);
    Ok((0..command.vector_pool)
        .map(|_| (0..command.dims).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect())
}

pub(super) fn verify_documents(
    expected: &BTreeSet<DocId>,
    actual: &[DocId],
) -> Result<(), CliError> {
    let first_difference = expected
        .iter()
        .copied()
        .zip(actual.iter().copied())
        .find(|(left, right)| left != right)
        .map(|(left, right)| left.min(right))
        .or_else(|| match expected.len().cmp(&actual.len()) {
            Ordering::Greater => expected.iter().nth(actual.len()).copied(),
            Ordering::Less => actual.get(expected.len()).copied(),
            Ordering::Equal => None,
        });
    match first_difference {
        None => Ok(()),
        Some(doc) => Err(CliError::DocumentMismatch {
            expected: expected.len(),
            actual: actual.len(),
            first_difference: doc,
        }),
    }
}

/// Renders `summary` to `writer` as `key: value` lines.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// use tsukiji_cli::cli::{StressSummary, render_summary};
/// use tsukiji_core::{Generation, MemoryUsage};
///
/// let summary = StressSummary {
///     operations: 10,
///     adds: 6,
///     updates: 1,
///     removes: 3,
///     documents: 3,
///     generation: Generation::new(10),
///     first_used: Generation::new(10),
///     memory: MemoryUsage::new(2_048, 1_024, 1_024, 0),
/// };
/// let mut buffer = Vec::new();
/// render_summary(&summary, &mut buffer)?;
/// let text = String::from_utf8(buffer).expect("utf-8");
/// assert!(text.contains("operations: 10 (adds 6, updates 1, removes 3)"));
/// assert!(text.contains("memory: allocated 2.0 KiB, used 1.0 KiB, dead 1.0 KiB, on hold 0 B"));
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn render_summary(summary: &StressSummary, mut writer: impl Write) -> io::Result<()> {
    writeln!(
        writer,
        "operations: {} (adds {}, updates {}, removes {})",
        summary.operations, summary.adds, summary.updates, summary.removes
    )?;
    writeln!(writer, "documents: {}", summary.documents)?;
    writeln!(writer, "generation: {}", summary.generation)?;
    writeln!(writer, "first used generation: {}", summary.first_used)?;
    writeln!(writer, "memory: {}", summary.memory)?;
    Ok(())
}
