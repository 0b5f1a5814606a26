//! Unit tests for the stress command and the fvecs reader.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::Parser;
use rstest::rstest;
use tempfile::TempDir;
use tracing_subscriber::layer::SubscriberExt;
use tsukiji_core::{HnswError, PipelineError};
use tsukiji_test_support::tracing::RecordingLayer;

use super::commands::{run_stress, verify_documents};
use super::{Cli, CliError, Command, FvecsError, StressCommand, read_fvecs, read_fvecs_path};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn record(dimension: i32, values: &[f32]) -> Vec<u8> {
    let mut bytes = dimension.to_le_bytes().to_vec();
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn small_stress() -> StressCommand {
    let cli = Cli::parse_from([
        "tsukiji",
        "stress",
        "--ops",
        "400",
        "--docs",
        "60",
        "--dims",
        "6",
        "--vector-pool",
        "24",
        "--m",
        "4",
        "--ef-construction",
        "24",
        "--prepare-threads",
        "3",
        "--prepare-queue",
        "6",
        "--write-queue",
        "2",
    ]);
    match cli.command {
        Command::Stress(command) => command,
    }
}

fn write_fvecs(dir: &TempDir, name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes)?;
    Ok(path)
}

#[test]
fn stress_defaults_match_the_reference_scenario() {
    let cli = Cli::parse_from(["tsukiji", "stress"]);
    let Command::Stress(command) = cli.command;
    assert_eq!(command.ops, 50_000);
    assert_eq!(command.docs, 10_000);
    assert_eq!(command.m, 16);
    assert_eq!(command.ef_construction, 200);
    assert_eq!(
        (command.prepare_threads, command.prepare_queue, command.write_queue),
        (10, 50, 15)
    );
    assert!(!command.no_heuristic);
    assert!(command.fvecs.is_none());
}

#[test]
fn stress_run_verifies_and_reports() {
    let layer = RecordingLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());
    let summary = tracing::subscriber::with_default(subscriber, || run_stress(small_stress()))
        .expect("stress run succeeds");

    assert_eq!(summary.operations, 400);
    assert_eq!(summary.adds + summary.updates + summary.removes, 400);
    assert!(summary.adds > 0 && summary.removes > 0);
    assert_eq!(summary.generation, summary.first_used);
    assert_eq!(summary.memory.on_hold_bytes(), 0);
    assert!(layer.has_event("stress run verified"));
    assert!(layer.has_span("cli.stress"));
}

#[test]
fn stress_run_without_heuristic_draws_from_fvecs() -> TestResult {
    let dir = TempDir::new()?;
    let records: Vec<Vec<f32>> = (0..16_u8)
        .map(|i| vec![f32::from(i), f32::from(i % 4), 1.0])
        .collect();
    let bytes: Vec<u8> = records.iter().flat_map(|values| record(3, values)).collect();
    let path = write_fvecs(&dir, "pool.fvecs", &bytes)?;

    let mut command = small_stress();
    command.fvecs = Some(path);
    command.no_heuristic = true;
    let summary = run_stress(command)?;
    assert_eq!(summary.operations, 400);
    Ok(())
}

#[rstest]
#[case::docs(|c: &mut StressCommand| c.docs = 0, "docs")]
#[case::pool(|c: &mut StressCommand| c.vector_pool = 0, "vector-pool")]
#[case::dims(|c: &mut StressCommand| c.dims = 0, "dims")]
fn stress_rejects_empty_spaces(#[case] tweak: fn(&mut StressCommand), #[case] expected: &str) {
    let mut command = small_stress();
    tweak(&mut command);
    let err = run_stress(command).expect_err("argument must be rejected");
    assert!(
        matches!(&err, CliError::InvalidArgument { name, .. } if *name == expected),
        "unexpected error: {err}"
    );
}

#[test]
fn stress_surfaces_parameter_and_config_errors() {
    let mut command = small_stress();
    command.m = 0;
    assert!(matches!(
        run_stress(command),
        Err(CliError::Index(HnswError::InvalidParameters { .. }))
    ));

    let mut command = small_stress();
    command.write_queue = 0;
    assert!(matches!(
        run_stress(command),
        Err(CliError::Pipeline(PipelineError::InvalidConfig { .. }))
    ));
}

#[rstest]
#[case::equal(&[1, 2, 3], &[1, 2, 3], None)]
#[case::missing(&[1, 2, 3], &[1, 3], Some(2))]
#[case::extra(&[1, 2], &[1, 2, 9], Some(9))]
#[case::shorter(&[1, 2, 5], &[1, 2], Some(5))]
fn verify_documents_reports_first_difference(
    #[case] expected: &[u32],
    #[case] actual: &[u32],
    #[case] difference: Option<u32>,
) {
    let expected: BTreeSet<u32> = expected.iter().copied().collect();
    match (verify_documents(&expected, actual), difference) {
        (Ok(()), None) => {}
        (Err(CliError::DocumentMismatch { first_difference, .. }), Some(doc)) => {
            assert_eq!(first_difference, doc);
        }
        (other, _) => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn read_fvecs_honours_the_limit() -> TestResult {
    let bytes = [record(2, &[1.0, 2.0]), record(2, &[3.0, 4.0]), record(2, &[5.0, 6.0])].concat();
    let vectors = read_fvecs(bytes.as_slice(), 2)?;
    assert_eq!(vectors, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    Ok(())
}

#[rstest]
#[case::empty(Vec::new())]
#[case::inconsistent([record(2, &[1.0, 2.0]), record(3, &[1.0, 2.0, 3.0])].concat())]
#[case::zero_dimension(record(0, &[]))]
#[case::negative_dimension(record(-4, &[]))]
#[case::truncated_payload({
    let mut bytes = record(2, &[1.0, 2.0]);
    bytes.truncate(bytes.len() - 2);
    bytes
})]
#[case::truncated_header(vec![2, 0])]
fn read_fvecs_rejects_malformed_input(#[case] bytes: Vec<u8>) {
    let err = read_fvecs(bytes.as_slice(), 10).expect_err("input must be rejected");
    assert!(matches!(
        err,
        FvecsError::Empty
            | FvecsError::InconsistentDimension { .. }
            | FvecsError::InvalidDimension { .. }
            | FvecsError::Truncated { vector: 0 }
    ));
}

#[test]
fn read_fvecs_path_reports_missing_files() {
    let dir = TempDir::new().expect("temp dir");
    let missing = dir.path().join("absent.fvecs");
    let err = read_fvecs_path(&missing, 4).expect_err("file is missing");
    assert!(matches!(err, FvecsError::Io { path, .. } if path == missing));
}
