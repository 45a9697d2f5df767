// Tests for CLI handlers and helpers

use hostgraph::handlers::*;
use hostgraph::{DEFAULT_DB_PATH, command_argument_builder};
use hostgraph_core::{ConflictPolicy, DomainNode, GraphStore, GraphSynchronizer, MemoryStore};
use hostgraph_core::data::{RunKind, RunStatus};
use hostgraph_ingest::{IngestError, IngestSummary};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};

const SUBDOMAINS: &str = r#"{"host":"a.b.example.com","input":"example.com","source":"subfinder"}
{"host":"www.example.com","input":"example.com","source":"amass"}
{"host":"www.example.com","input":"example.com","source":"crtsh"}
"#;

fn matches(args: &[&str]) -> clap::ArgMatches {
    command_argument_builder()
        .try_get_matches_from(args.iter().copied())
        .unwrap()
}

fn init_db(dir: &TempDir) -> PathBuf {
    let db_path = dir.path().join("nested").join("hostgraph.db");
    let db = db_path.to_str().unwrap();
    let m = matches(&["hostgraph", "--db", db, "init", "--force"]);
    handle_init(m.subcommand_matches("init").unwrap()).unwrap();
    db_path
}

fn ingest(db_path: &Path, input: &Path, policy: &str) {
    let m = matches(&[
        "hostgraph",
        "--db",
        db_path.to_str().unwrap(),
        "ingest",
        "subdomains",
        "-i",
        input.to_str().unwrap(),
        "-p",
        policy,
    ]);
    let ingest = m.subcommand_matches("ingest").unwrap();
    handle_ingest_subdomains(ingest.subcommand_matches("subdomains").unwrap()).unwrap();
}

fn input_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

// ============================================================================
// Helper Tests
// ============================================================================

#[test]
fn test_resolve_db_path_expands_tilde() {
    let resolved = resolve_db_path(DEFAULT_DB_PATH);
    assert!(!resolved.to_string_lossy().starts_with('~'));
    assert!(resolved.ends_with(".config/hostgraph/hostgraph.db"));

    assert_eq!(resolve_db_path("/tmp/x.db"), PathBuf::from("/tmp/x.db"));
}

#[test]
fn test_open_database_requires_init() {
    let temp_dir = TempDir::new().unwrap();
    let result = open_database(&temp_dir.path().join("missing.db"));

    let err = result.err().unwrap();
    assert!(err.to_string().contains("hostgraph init"));
}

#[test]
fn test_parse_policy() {
    assert_eq!(parse_policy("reject").unwrap(), ConflictPolicy::Reject);
    assert_eq!(parse_policy("merge").unwrap(), ConflictPolicy::MergeSources);
    assert!(parse_policy("overwrite").is_err());
}

#[test]
fn test_format_summary() {
    let summary = IngestSummary {
        records: 4,
        synced: 3,
        skipped: 1,
        ..IngestSummary::default()
    };
    let text = format_summary(&summary);
    assert!(text.contains("records: 4"));
    assert!(text.contains("synced: 3"));
    assert!(text.contains("skipped: 1"));
}

#[test]
fn test_write_output_to_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("report.txt");

    write_output("hello", Some(&path)).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
}

#[test]
fn test_render_forest() {
    let sync = GraphSynchronizer::new(MemoryStore::new(), ConflictPolicy::Reject);
    sync.sync(&DomainNode::new("api.example.com", "example.com", "amass"))
        .unwrap();
    sync.sync(&DomainNode::new("www.example.org", "example.org", "crt"))
        .unwrap();
    let store = sync.into_inner().unwrap();

    let forest = render_forest(&store, None).unwrap();
    assert!(forest.contains("example.com\n└── api.example.com [amass]\n"));
    assert!(forest.contains("example.org\n└── www.example.org [crt]\n"));

    let subtree = render_forest(&store, Some("example.org")).unwrap();
    assert!(!subtree.contains("example.com"));
    assert!(render_forest(&store, Some("nope.example.com")).is_err());
}

// ============================================================================
// Command Line Tests
// ============================================================================

#[test]
fn test_command_defaults() {
    let m = matches(&["hostgraph", "report"]);
    assert_eq!(
        m.get_one::<String>("db").map(String::as_str),
        Some(DEFAULT_DB_PATH)
    );
    let report = m.subcommand_matches("report").unwrap();
    assert_eq!(
        report.get_one::<String>("format").map(String::as_str),
        Some("text")
    );
}

#[test]
fn test_command_rejects_unknown_policy() {
    let result = command_argument_builder().try_get_matches_from([
        "hostgraph",
        "ingest",
        "subdomains",
        "-i",
        "x.jsonl",
        "-p",
        "overwrite",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_ingest_requires_input() {
    let result =
        command_argument_builder().try_get_matches_from(["hostgraph", "ingest", "subdomains"]);
    assert!(result.is_err());
}

// ============================================================================
// Handler Integration Tests
// ============================================================================

#[test]
fn test_init_creates_database() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = init_db(&temp_dir);
    assert!(db_path.exists());
}

#[test]
fn test_ingest_records_run_and_graph() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = init_db(&temp_dir);
    let input = input_file(SUBDOMAINS);

    ingest(&db_path, input.path(), "merge");

    let db = open_database(&db_path).unwrap();
    let runs = db.list_runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].stats.synced, 3);
    assert_eq!(runs[0].stats.conflicts, 1);

    let www = db.read_domain("www.example.com").unwrap().unwrap();
    assert_eq!(www.sources, vec!["amass", "crtsh"]);
}

#[test]
fn test_ingest_reject_policy_records_conflict() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = init_db(&temp_dir);
    let input = input_file(SUBDOMAINS);

    ingest(&db_path, input.path(), "reject");

    let db = open_database(&db_path).unwrap();
    assert_eq!(db.conflicts().unwrap().len(), 1);
    assert_eq!(db.list_runs().unwrap()[0].stats.synced, 2);
}

#[test]
fn test_dry_run_leaves_database_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = init_db(&temp_dir);
    let input = input_file(SUBDOMAINS);

    let m = matches(&[
        "hostgraph",
        "--db",
        db_path.to_str().unwrap(),
        "ingest",
        "subdomains",
        "-i",
        input.path().to_str().unwrap(),
        "--dry-run",
    ]);
    let ingest = m.subcommand_matches("ingest").unwrap();
    handle_ingest_subdomains(ingest.subcommand_matches("subdomains").unwrap()).unwrap();

    let db = open_database(&db_path).unwrap();
    assert!(db.domains().unwrap().is_empty());
    assert!(db.list_runs().unwrap().is_empty());
}

#[test]
fn test_report_written_to_file() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = init_db(&temp_dir);
    let input = input_file(SUBDOMAINS);
    ingest(&db_path, input.path(), "merge");

    let out = temp_dir.path().join("report.csv");
    let m = matches(&[
        "hostgraph",
        "--db",
        db_path.to_str().unwrap(),
        "report",
        "-f",
        "csv",
        "-o",
        out.to_str().unwrap(),
    ]);
    handle_report(m.subcommand_matches("report").unwrap()).unwrap();

    let csv = std::fs::read_to_string(&out).unwrap();
    assert!(csv.starts_with("host,root,source"));
    assert_eq!(csv.lines().count(), 5);
}

#[test]
fn test_verify_passes_on_ingested_graph() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = init_db(&temp_dir);
    let input = input_file(SUBDOMAINS);
    ingest(&db_path, input.path(), "merge");

    let m = matches(&["hostgraph", "--db", db_path.to_str().unwrap(), "verify"]);
    assert!(handle_verify(m.subcommand_matches("verify").unwrap()).is_ok());
}

#[test]
fn test_handlers_fail_without_database() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("missing.db");

    let m = matches(&["hostgraph", "--db", db.to_str().unwrap(), "tree"]);
    assert!(handle_tree(m.subcommand_matches("tree").unwrap()).is_err());
    assert!(!db.exists());
}

#[test]
fn test_aborted_run_keeps_partial_counts() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = init_db(&temp_dir);
    let db = open_database(&db_path).unwrap();
    let run_id = db.create_run(RunKind::Subdomains, "subs.jsonl").unwrap();

    let partial = IngestSummary {
        records: 4,
        synced: 2,
        skipped: 1,
        conflicts: 1,
        ..IngestSummary::default()
    };
    let aborted = IngestError::Aborted {
        summary: Box::new(partial),
        source: Box::new(IngestError::IoError(std::io::Error::other("device went away"))),
    };
    assert!(finish_run(&db, &run_id, Err(aborted)).is_err());

    let run = db.get_run(&run_id).unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.stats.synced, 2);
    assert_eq!(run.stats.skipped, 1);
    assert_eq!(run.stats.conflicts, 1);
}
