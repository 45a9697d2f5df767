use crate::error::{StoreError, StoreResult};
use crate::model::{
    ConflictResolution, DnsRecordNode, DomainVertex, ProvenanceConflict, current_timestamp,
};
use crate::store::{Edge, EdgeType, GraphStore, Vertex, VertexId, VertexLabel};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

/// SQLite backed graph store.
pub struct Database {
    conn: Connection,
    in_transaction: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunKind {
    Subdomains,
    Dns,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::Subdomains => "subdomains",
            RunKind::Dns => "dns",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}

/// Per-batch counters kept on the ingest run row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub synced: u64,
    pub skipped: u64,
    pub conflicts: u64,
    pub errors: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRun {
    pub id: String,
    pub kind: String,
    pub input_path: String,
    pub status: RunStatus,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub stats: RunStats,
}

fn map_store_error(err: rusqlite::Error) -> StoreError {
    match err.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
            StoreError::Unavailable(err.to_string())
        }
        _ => StoreError::Sqlite(err),
    }
}

/// How long a writer waits on another connection's lock before giving up.
pub const BUSY_TIMEOUT: Duration = Duration::from_millis(250);

impl Database {
    pub fn drop(path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(map_store_error)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database {
            conn,
            in_transaction: false,
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Open a throwaway database that lives only as long as the handle.
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Database {
            conn,
            in_transaction: false,
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn.execute_batch(
            "
            -- Ingestion batches
            CREATE TABLE IF NOT EXISTS ingest_runs (
    id TEXT PRIMARY KEY,
    start_time INTEGER NOT NULL,
    end_time INTEGER,
    status TEXT NOT NULL CHECK(status IN ('running', 'completed', 'failed')),
    kind TEXT NOT NULL CHECK(kind IN ('subdomains', 'dns')),
    input_path TEXT NOT NULL,
    synced INTEGER NOT NULL DEFAULT 0,
    skipped INTEGER NOT NULL DEFAULT 0,
    conflicts INTEGER NOT NULL DEFAULT 0,
    errors INTEGER NOT NULL DEFAULT 0
);

-- Domain vertices, one per host
CREATE TABLE IF NOT EXISTS domains (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    host TEXT NOT NULL UNIQUE,
    root TEXT NOT NULL,
    source TEXT NOT NULL,
    sources TEXT NOT NULL DEFAULT '[]',  -- JSON array of explicit sources
    roots TEXT NOT NULL DEFAULT '[]',    -- JSON array of roots seen by explicit sources
    is_implicit BOOLEAN NOT NULL,
    is_root BOOLEAN NOT NULL,
    first_seen INTEGER NOT NULL,
    last_seen INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_domains_root ON domains(root);
CREATE INDEX IF NOT EXISTS idx_domains_source ON domains(source);

-- DNS snapshots, one per host and timestamp
CREATE TABLE IF NOT EXISTS dns_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    record_key TEXT NOT NULL UNIQUE,
    host TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    status_code TEXT NOT NULL,
    records TEXT NOT NULL  -- JSON object keyed by record type
);

CREATE INDEX IF NOT EXISTS idx_dns_records_host ON dns_records(host);

-- Edges in the graph
CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    edge_type TEXT NOT NULL CHECK(edge_type IN (
        'HAS_SUBDOMAIN',   -- parent domain to child domain
        'HAS_DNSR'         -- domain to DNS snapshot
    )),
    from_key TEXT NOT NULL,
    to_key TEXT NOT NULL,
    discovered_at INTEGER NOT NULL,
    UNIQUE(edge_type, from_key, to_key)
);

CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(edge_type, from_key);
CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(edge_type, to_key);

-- Audit trail of disagreeing explicit observations
CREATE TABLE IF NOT EXISTS provenance_conflicts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    host TEXT NOT NULL,
    existing_source TEXT NOT NULL,
    existing_root TEXT NOT NULL,
    incoming_source TEXT NOT NULL,
    incoming_root TEXT NOT NULL,
    resolution TEXT NOT NULL CHECK(resolution IN ('rejected', 'merged')),
    recorded_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conflicts_host ON provenance_conflicts(host);
            ",
        )?;
        Ok(())
    }

    // Run management
    pub fn create_run(&self, kind: RunKind, input_path: &str) -> StoreResult<String> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let timestamp = current_timestamp();

        self.conn.execute(
            "INSERT INTO ingest_runs (id, start_time, status, kind, input_path) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![&run_id, timestamp, RunStatus::Running.as_str(), kind.as_str(), input_path],
        )?;

        Ok(run_id)
    }

    pub fn complete_run(&self, run_id: &str, stats: &RunStats) -> StoreResult<()> {
        self.finish_run(run_id, RunStatus::Completed, stats)
    }

    pub fn fail_run(&self, run_id: &str, stats: &RunStats) -> StoreResult<()> {
        self.finish_run(run_id, RunStatus::Failed, stats)
    }

    fn finish_run(&self, run_id: &str, status: RunStatus, stats: &RunStats) -> StoreResult<()> {
        let timestamp = current_timestamp();
        self.conn.execute(
            "UPDATE ingest_runs
             SET status = ?1, end_time = ?2, synced = ?3, skipped = ?4, conflicts = ?5, errors = ?6
             WHERE id = ?7",
            params![
                status.as_str(),
                timestamp,
                stats.synced as i64,
                stats.skipped as i64,
                stats.conflicts as i64,
                stats.errors as i64,
                run_id
            ],
        )?;
        Ok(())
    }

    pub fn get_run(&self, run_id: &str) -> StoreResult<Option<IngestRun>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, input_path, status, start_time, end_time, synced, skipped, conflicts, errors
             FROM ingest_runs WHERE id = ?1",
        )?;
        let run = stmt.query_row(params![run_id], run_from_row).optional()?;
        Ok(run)
    }

    pub fn list_runs(&self) -> StoreResult<Vec<IngestRun>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, input_path, status, start_time, end_time, synced, skipped, conflicts, errors
             FROM ingest_runs ORDER BY start_time, rowid",
        )?;
        let runs = stmt
            .query_map([], run_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }

    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }

    fn require_transaction(&self) -> StoreResult<()> {
        if self.in_transaction {
            Ok(())
        } else {
            Err(StoreError::NoTransaction)
        }
    }

    fn key_exists(&self, label: VertexLabel, key: &str) -> StoreResult<bool> {
        let sql = match label {
            VertexLabel::Domain => "SELECT 1 FROM domains WHERE host = ?1",
            VertexLabel::DnsRecord => "SELECT 1 FROM dns_records WHERE record_key = ?1",
        };
        let found: Option<i64> = self
            .conn
            .query_row(sql, params![key], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    fn upsert_domain(&self, domain: &DomainVertex) -> StoreResult<VertexId> {
        let sources = serde_json::to_string(&domain.sources)?;
        let roots = serde_json::to_string(&domain.roots)?;
        let id = self.conn.query_row(
            "INSERT INTO domains (host, root, source, sources, roots, is_implicit, is_root, first_seen, last_seen)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(host) DO UPDATE SET
                root = excluded.root,
                source = excluded.source,
                sources = excluded.sources,
                roots = excluded.roots,
                is_implicit = excluded.is_implicit,
                is_root = excluded.is_root,
                first_seen = excluded.first_seen,
                last_seen = excluded.last_seen
             RETURNING id",
            params![
                &domain.host,
                &domain.root,
                &domain.source,
                sources,
                roots,
                domain.is_implicit,
                domain.is_root,
                domain.first_seen,
                domain.last_seen,
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn upsert_dns_record(&self, record: &DnsRecordNode) -> StoreResult<VertexId> {
        let records = serde_json::to_string(&record.records)?;
        let id = self.conn.query_row(
            "INSERT INTO dns_records (record_key, host, timestamp, status_code, records)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(record_key) DO UPDATE SET
                status_code = excluded.status_code,
                records = excluded.records
             RETURNING id",
            params![
                record.key(),
                &record.host,
                &record.timestamp,
                &record.status_code,
                records
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<IngestRun> {
    let status: String = row.get(3)?;
    Ok(IngestRun {
        id: row.get(0)?,
        kind: row.get(1)?,
        input_path: row.get(2)?,
        status: RunStatus::from_str(&status).unwrap_or(RunStatus::Failed),
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        stats: RunStats {
            synced: row.get::<_, i64>(6)? as u64,
            skipped: row.get::<_, i64>(7)? as u64,
            conflicts: row.get::<_, i64>(8)? as u64,
            errors: row.get::<_, i64>(9)? as u64,
        },
    })
}

/// A domain row with its JSON `sources` and `roots` columns still encoded.
type DomainRow = (DomainVertex, String, String);

fn domain_from_row(row: &Row<'_>) -> rusqlite::Result<DomainRow> {
    Ok((
        DomainVertex {
            host: row.get(0)?,
            root: row.get(1)?,
            source: row.get(2)?,
            sources: Vec::new(),
            roots: Vec::new(),
            is_implicit: row.get(5)?,
            is_root: row.get(6)?,
            first_seen: row.get(7)?,
            last_seen: row.get(8)?,
        },
        row.get(3)?,
        row.get(4)?,
    ))
}

fn decode_domain((mut domain, sources, roots): DomainRow) -> StoreResult<DomainVertex> {
    domain.sources = serde_json::from_str(&sources)?;
    domain.roots = serde_json::from_str(&roots)?;
    Ok(domain)
}

const DOMAIN_COLUMNS: &str =
    "host, root, source, sources, roots, is_implicit, is_root, first_seen, last_seen";

impl GraphStore for Database {
    fn begin(&mut self) -> StoreResult<()> {
        if self.in_transaction {
            return Err(StoreError::TransactionOpen);
        }
        // IMMEDIATE takes the write lock up front, so a second writer gives up after BUSY_TIMEOUT.
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(map_store_error)?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.require_transaction()?;
        self.conn.execute_batch("COMMIT").map_err(map_store_error)?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> StoreResult<()> {
        self.require_transaction()?;
        self.in_transaction = false;
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(map_store_error)?;
        Ok(())
    }

    fn upsert_vertex(&mut self, vertex: &Vertex) -> StoreResult<VertexId> {
        self.require_transaction()?;
        match vertex {
            Vertex::Domain(domain) => self.upsert_domain(domain),
            Vertex::DnsRecord(record) => self.upsert_dns_record(record),
        }
    }

    fn upsert_edge(&mut self, edge_type: EdgeType, from_key: &str, to_key: &str) -> StoreResult<()> {
        self.require_transaction()?;
        let to_label = match edge_type {
            EdgeType::HasSubdomain => VertexLabel::Domain,
            EdgeType::HasDnsRecord => VertexLabel::DnsRecord,
        };
        if !self.key_exists(VertexLabel::Domain, from_key)? {
            return Err(StoreError::MissingVertex(from_key.to_string()));
        }
        if !self.key_exists(to_label, to_key)? {
            return Err(StoreError::MissingVertex(to_key.to_string()));
        }

        self.conn.execute(
            "INSERT OR IGNORE INTO edges (edge_type, from_key, to_key, discovered_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![edge_type.as_str(), from_key, to_key, current_timestamp()],
        )?;
        Ok(())
    }

    fn read_vertex(&self, label: VertexLabel, key: &str) -> StoreResult<Option<Vertex>> {
        match label {
            VertexLabel::Domain => {
                let sql = format!("SELECT {DOMAIN_COLUMNS} FROM domains WHERE host = ?1");
                let row = self
                    .conn
                    .query_row(&sql, params![key], domain_from_row)
                    .optional()?;
                row.map(decode_domain)
                    .transpose()
                    .map(|d| d.map(Vertex::Domain))
            }
            VertexLabel::DnsRecord => {
                let row: Option<(String, String, String, String)> = self
                    .conn
                    .query_row(
                        "SELECT host, status_code, timestamp, records FROM dns_records WHERE record_key = ?1",
                        params![key],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                    )
                    .optional()?;
                match row {
                    Some((host, status_code, timestamp, records)) => {
                        Ok(Some(Vertex::DnsRecord(DnsRecordNode {
                            host,
                            status_code,
                            timestamp,
                            records: serde_json::from_str(&records)?,
                        })))
                    }
                    None => Ok(None),
                }
            }
        }
    }

    fn count(&self, label: VertexLabel) -> StoreResult<u64> {
        let sql = match label {
            VertexLabel::Domain => "SELECT COUNT(*) FROM domains",
            VertexLabel::DnsRecord => "SELECT COUNT(*) FROM dns_records",
        };
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_edges(&self, edge_type: EdgeType) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM edges WHERE edge_type = ?1",
            params![edge_type.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn domains(&self) -> StoreResult<Vec<DomainVertex>> {
        let sql = format!("SELECT {DOMAIN_COLUMNS} FROM domains ORDER BY host");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], domain_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(decode_domain).collect()
    }

    fn edges(&self, edge_type: EdgeType) -> StoreResult<Vec<Edge>> {
        let mut stmt = self.conn.prepare(
            "SELECT from_key, to_key FROM edges WHERE edge_type = ?1 ORDER BY from_key, to_key",
        )?;
        let edges = stmt
            .query_map(params![edge_type.as_str()], |row| {
                Ok(Edge {
                    edge_type,
                    from: row.get(0)?,
                    to: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    fn record_conflict(&mut self, conflict: &ProvenanceConflict) -> StoreResult<()> {
        self.require_transaction()?;
        self.conn.execute(
            "INSERT INTO provenance_conflicts (
                host, existing_source, existing_root, incoming_source, incoming_root,
                resolution, recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &conflict.host,
                &conflict.existing_source,
                &conflict.existing_root,
                &conflict.incoming_source,
                &conflict.incoming_root,
                conflict.resolution.as_str(),
                conflict.recorded_at,
            ],
        )?;
        Ok(())
    }

    fn conflicts(&self) -> StoreResult<Vec<ProvenanceConflict>> {
        let mut stmt = self.conn.prepare(
            "SELECT host, existing_source, existing_root, incoming_source, incoming_root,
                    resolution, recorded_at
             FROM provenance_conflicts ORDER BY id",
        )?;
        let conflicts = stmt
            .query_map([], |row| {
                let resolution: String = row.get(5)?;
                Ok(ProvenanceConflict {
                    host: row.get(0)?,
                    existing_source: row.get(1)?,
                    existing_root: row.get(2)?,
                    incoming_source: row.get(3)?,
                    incoming_root: row.get(4)?,
                    resolution: ConflictResolution::from_str(&resolution)
                        .unwrap_or(ConflictResolution::Rejected),
                    recorded_at: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(conflicts)
    }
}
