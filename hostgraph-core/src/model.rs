use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source recorded on domains inferred from a longer observed hostname.
pub const IMPLICIT_SOURCE: &str = "implicit";

pub(crate) fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// One observed (or inferred) domain, before it is written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainNode {
    pub host: String,
    pub root: String,
    pub source: String,
    pub is_root: bool,
    pub is_implicit: bool,
}

impl DomainNode {
    /// An observation of `host` under the scan target `root`, as reported by `source`.
    ///
    /// The sentinel source `implicit` yields an implicit node.
    pub fn new(host: impl Into<String>, root: impl Into<String>, source: impl Into<String>) -> Self {
        let host = host.into();
        let root = root.into();
        let source = source.into();
        Self {
            is_root: host == root,
            is_implicit: source == IMPLICIT_SOURCE,
            host,
            root,
            source,
        }
    }

    pub fn implicit(host: impl Into<String>, root: impl Into<String>) -> Self {
        Self::new(host, root, IMPLICIT_SOURCE)
    }

    pub fn is_explicit(&self) -> bool {
        !self.is_implicit
    }
}

/// Persisted form of a domain vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainVertex {
    pub host: String,
    pub root: String,
    pub source: String,
    /// Every explicit source that reported this host, in first-seen order.
    pub sources: Vec<String>,
    /// Every scan root an explicit source reported this host under.
    #[serde(default)]
    pub roots: Vec<String>,
    pub is_implicit: bool,
    pub is_root: bool,
    pub first_seen: i64,
    pub last_seen: i64,
}

impl DomainVertex {
    pub fn from_node(node: &DomainNode, seen_at: i64) -> Self {
        let (sources, roots) = if node.is_implicit {
            (Vec::new(), Vec::new())
        } else {
            (vec![node.source.clone()], vec![node.root.clone()])
        };
        Self {
            host: node.host.clone(),
            root: node.root.clone(),
            source: node.source.clone(),
            sources,
            roots,
            is_implicit: node.is_implicit,
            is_root: node.is_root,
            first_seen: seen_at,
            last_seen: seen_at,
        }
    }

    pub fn has_source(&self, source: &str) -> bool {
        self.sources.iter().any(|s| s == source)
    }

    pub fn has_root(&self, root: &str) -> bool {
        self.root == root || self.roots.iter().any(|r| r == root)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecordType {
    A,
    Aaaa,
    Mx,
    Ns,
    Txt,
    Cname,
    Soa,
    Ptr,
    Spf,
    Dkim,
    Dmarc,
}

impl RecordType {
    pub const ALL: [RecordType; 11] = [
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Mx,
        RecordType::Ns,
        RecordType::Txt,
        RecordType::Cname,
        RecordType::Soa,
        RecordType::Ptr,
        RecordType::Spf,
        RecordType::Dkim,
        RecordType::Dmarc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "a",
            RecordType::Aaaa => "aaaa",
            RecordType::Mx => "mx",
            RecordType::Ns => "ns",
            RecordType::Txt => "txt",
            RecordType::Cname => "cname",
            RecordType::Soa => "soa",
            RecordType::Ptr => "ptr",
            RecordType::Spf => "spf",
            RecordType::Dkim => "dkim",
            RecordType::Dmarc => "dmarc",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        RecordType::ALL.into_iter().find(|t| t.as_str() == lower)
    }
}

/// DNS answers for one host at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecordNode {
    pub host: String,
    pub status_code: String,
    pub timestamp: String,
    pub records: BTreeMap<RecordType, Vec<String>>,
}

impl DnsRecordNode {
    pub fn new(host: impl Into<String>, status_code: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            status_code: status_code.into(),
            timestamp: timestamp.into(),
            records: BTreeMap::new(),
        }
    }

    pub fn with_records(mut self, record_type: RecordType, values: Vec<String>) -> Self {
        self.add_records(record_type, values);
        self
    }

    /// Snapshot key, unique per host and timestamp.
    pub fn key(&self) -> String {
        format!("{}@{}", self.host, self.timestamp)
    }

    pub fn values(&self, record_type: RecordType) -> &[String] {
        self.records
            .get(&record_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Add values to a record set, skipping ones already present.
    pub fn add_records(&mut self, record_type: RecordType, values: Vec<String>) {
        if values.is_empty() {
            return;
        }
        let set = self.records.entry(record_type).or_default();
        for value in values {
            if !set.contains(&value) {
                set.push(value);
            }
        }
    }

    /// Merge another snapshot of the same key into this one.
    ///
    /// Record sets are unioned in first-seen order and the newer status wins.
    pub fn merge(&mut self, other: DnsRecordNode) {
        self.status_code = other.status_code;
        for (record_type, values) in other.records {
            self.add_records(record_type, values);
        }
    }

    pub fn record_count(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictResolution {
    /// The chain was rolled back and the observation dropped.
    Rejected,
    /// The incoming source was appended to the existing vertex.
    Merged,
}

impl ConflictResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictResolution::Rejected => "rejected",
            ConflictResolution::Merged => "merged",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "rejected" => Some(ConflictResolution::Rejected),
            "merged" => Some(ConflictResolution::Merged),
            _ => None,
        }
    }
}

/// Two explicit observations of one host that disagree on source or root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceConflict {
    pub host: String,
    pub existing_source: String,
    pub existing_root: String,
    pub incoming_source: String,
    pub incoming_root: String,
    pub resolution: ConflictResolution,
    pub recorded_at: i64,
}
