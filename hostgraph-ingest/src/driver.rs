// Batch ingestion: one record per line, one synchronized chain per record

use crate::error::{IngestError, Result};
use crate::lines::Lines;
use crate::record::{parse_dns_line, parse_subdomain_line};
use hostgraph_core::data::RunStats;
use hostgraph_core::{GraphStore, GraphSynchronizer, SyncError, SyncOutcome};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Options for an ingestion batch
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Stop after this many records.
    pub limit: Option<usize>,
    /// Timestamp given to DNS records that carry none, so one batch is one snapshot.
    pub snapshot_time: String,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            limit: None,
            snapshot_time: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Counters for one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub records: u64,
    pub synced: u64,
    /// Lines dropped before reaching the store (bad JSON, missing fields, bad hostnames).
    pub skipped: u64,
    /// Rejected plus merged provenance conflicts.
    pub conflicts: u64,
    /// Chains that failed in the synchronizer for any other reason.
    pub errors: u64,
    pub vertices_created: u64,
    pub edges_upserted: u64,
}

impl IngestSummary {
    pub fn run_stats(&self) -> RunStats {
        RunStats {
            synced: self.synced,
            skipped: self.skipped,
            conflicts: self.conflicts,
            errors: self.errors,
        }
    }

    fn absorb(&mut self, outcome: &SyncOutcome) {
        self.synced += 1;
        self.conflicts += outcome.conflicts.len() as u64;
        self.vertices_created += outcome.vertices_created as u64;
        self.edges_upserted += outcome.edges_upserted as u64;
    }

    fn fail(&mut self, line: usize, err: &SyncError) {
        match err {
            SyncError::ProvenanceConflict(_) => self.conflicts += 1,
            _ => self.errors += 1,
        }
        warn!(line, error = %err, "observation not synchronized");
    }
}

/// Callback invoked after each record with the running summary
pub type IngestProgressCallback = Arc<dyn Fn(&IngestSummary) + Send + Sync>;

/// Ingest subdomain enumeration results (`host`, `input`, `source` per line).
///
/// Records are synchronized in input order. Malformed lines and failed chains
/// are counted and logged; only a read failure on the input aborts the batch,
/// and the returned [`IngestError::Aborted`] carries the counts reached so far.
pub fn ingest_subdomains<R, S>(
    reader: R,
    synchronizer: &GraphSynchronizer<S>,
    options: &IngestOptions,
    progress: Option<&IngestProgressCallback>,
) -> Result<IngestSummary>
where
    R: BufRead,
    S: GraphStore,
{
    run_batch(reader, options, progress, |line, text| {
        let node = parse_subdomain_line(line, text)?;
        Ok(synchronizer.sync(&node))
    })
}

/// Ingest resolver results and attach them to already known domains.
pub fn ingest_dns<R, S>(
    reader: R,
    synchronizer: &GraphSynchronizer<S>,
    options: &IngestOptions,
    progress: Option<&IngestProgressCallback>,
) -> Result<IngestSummary>
where
    R: BufRead,
    S: GraphStore,
{
    run_batch(reader, options, progress, |line, text| {
        let record = parse_dns_line(line, text, &options.snapshot_time)?;
        Ok(synchronizer.sync_dns_record(record))
    })
}

pub fn ingest_subdomains_file<S: GraphStore>(
    path: &Path,
    synchronizer: &GraphSynchronizer<S>,
    options: &IngestOptions,
    progress: Option<&IngestProgressCallback>,
) -> Result<IngestSummary> {
    let file = File::open(path)?;
    info!(path = %path.display(), "ingesting subdomain records");
    ingest_subdomains(BufReader::new(file), synchronizer, options, progress)
}

pub fn ingest_dns_file<S: GraphStore>(
    path: &Path,
    synchronizer: &GraphSynchronizer<S>,
    options: &IngestOptions,
    progress: Option<&IngestProgressCallback>,
) -> Result<IngestSummary> {
    let file = File::open(path)?;
    info!(path = %path.display(), "ingesting DNS records");
    ingest_dns(BufReader::new(file), synchronizer, options, progress)
}

fn run_batch<R, F>(
    reader: R,
    options: &IngestOptions,
    progress: Option<&IngestProgressCallback>,
    mut handle: F,
) -> Result<IngestSummary>
where
    R: BufRead,
    F: FnMut(usize, &str) -> Result<std::result::Result<SyncOutcome, SyncError>>,
{
    let mut summary = IngestSummary::default();

    for item in Lines::new(reader) {
        if options.limit.is_some_and(|limit| summary.records as usize >= limit) {
            break;
        }

        let (line, text) = match item {
            Ok(entry) => entry,
            Err(IngestError::Encoding { line }) => {
                summary.records += 1;
                summary.skipped += 1;
                warn!(line, "skipping line with invalid encoding");
                continue;
            }
            Err(e) => return Err(aborted(summary, e)),
        };
        summary.records += 1;

        match handle(line, &text) {
            Ok(Ok(outcome)) => summary.absorb(&outcome),
            Ok(Err(err)) => summary.fail(line, &err),
            Err(err) if err.is_record_error() => {
                summary.skipped += 1;
                warn!(line, error = %err, "skipping malformed record");
            }
            Err(err) => return Err(aborted(summary, err)),
        }

        if let Some(callback) = progress {
            callback(&summary);
        }
    }

    info!(
        records = summary.records,
        synced = summary.synced,
        skipped = summary.skipped,
        conflicts = summary.conflicts,
        errors = summary.errors,
        "ingestion batch finished"
    );
    Ok(summary)
}

fn aborted(summary: IngestSummary, source: IngestError) -> IngestError {
    warn!(records = summary.records, error = %source, "ingestion batch aborted");
    IngestError::Aborted {
        summary: Box::new(summary),
        source: Box::new(source),
    }
}
