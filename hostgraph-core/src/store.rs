// Graph store contract

use crate::error::StoreResult;
use crate::model::{DnsRecordNode, DomainVertex, ProvenanceConflict};

pub type VertexId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexLabel {
    Domain,
    DnsRecord,
}

impl VertexLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            VertexLabel::Domain => "Domain",
            VertexLabel::DnsRecord => "DNSR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeType {
    /// Parent domain to its immediate child.
    HasSubdomain,
    /// Domain to one of its DNS snapshots.
    HasDnsRecord,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::HasSubdomain => "HAS_SUBDOMAIN",
            EdgeType::HasDnsRecord => "HAS_DNSR",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "HAS_SUBDOMAIN" => Some(EdgeType::HasSubdomain),
            "HAS_DNSR" => Some(EdgeType::HasDnsRecord),
            _ => None,
        }
    }
}

/// A typed vertex record. The key field is `host` for domains and the
/// snapshot key for DNS records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Vertex {
    Domain(DomainVertex),
    DnsRecord(DnsRecordNode),
}

impl Vertex {
    pub fn label(&self) -> VertexLabel {
        match self {
            Vertex::Domain(_) => VertexLabel::Domain,
            Vertex::DnsRecord(_) => VertexLabel::DnsRecord,
        }
    }

    pub fn key(&self) -> String {
        match self {
            Vertex::Domain(domain) => domain.host.clone(),
            Vertex::DnsRecord(record) => record.key(),
        }
    }

    pub fn into_domain(self) -> Option<DomainVertex> {
        match self {
            Vertex::Domain(domain) => Some(domain),
            Vertex::DnsRecord(_) => None,
        }
    }

    pub fn into_dns_record(self) -> Option<DnsRecordNode> {
        match self {
            Vertex::DnsRecord(record) => Some(record),
            Vertex::Domain(_) => None,
        }
    }
}

/// A directed edge between two vertex keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    pub edge_type: EdgeType,
    pub from: String,
    pub to: String,
}

/// Backend that persists the domain graph.
///
/// Mutations between `begin` and `commit` form one unit of work; `rollback`
/// discards all of them. Upserts are idempotent on the vertex key and on the
/// `(edge_type, from, to)` triple. Writing outside a unit of work is an error.
pub trait GraphStore {
    fn begin(&mut self) -> StoreResult<()>;
    fn commit(&mut self) -> StoreResult<()>;
    fn rollback(&mut self) -> StoreResult<()>;

    /// Insert the vertex, or replace the stored attributes of the vertex with the same key.
    fn upsert_vertex(&mut self, vertex: &Vertex) -> StoreResult<VertexId>;
    /// Insert the edge unless it already exists. Both endpoints must exist.
    fn upsert_edge(&mut self, edge_type: EdgeType, from_key: &str, to_key: &str) -> StoreResult<()>;
    fn read_vertex(&self, label: VertexLabel, key: &str) -> StoreResult<Option<Vertex>>;

    fn count(&self, label: VertexLabel) -> StoreResult<u64>;
    fn count_edges(&self, edge_type: EdgeType) -> StoreResult<u64>;

    /// All domain vertices ordered by host.
    fn domains(&self) -> StoreResult<Vec<DomainVertex>>;
    fn edges(&self, edge_type: EdgeType) -> StoreResult<Vec<Edge>>;

    fn record_conflict(&mut self, conflict: &ProvenanceConflict) -> StoreResult<()>;
    fn conflicts(&self) -> StoreResult<Vec<ProvenanceConflict>>;

    fn read_domain(&self, host: &str) -> StoreResult<Option<DomainVertex>> {
        Ok(self
            .read_vertex(VertexLabel::Domain, host)?
            .and_then(Vertex::into_domain))
    }
}
