// In-process graph store, used for dry runs and tests

use crate::error::{StoreError, StoreResult};
use crate::model::{DnsRecordNode, DomainVertex, ProvenanceConflict};
use crate::store::{Edge, EdgeType, GraphStore, Vertex, VertexId, VertexLabel};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
struct Snapshot {
    domains: BTreeMap<String, (VertexId, DomainVertex)>,
    dns_records: BTreeMap<String, (VertexId, DnsRecordNode)>,
    edges: BTreeSet<Edge>,
    conflicts: Vec<ProvenanceConflict>,
    next_id: VertexId,
}

impl Snapshot {
    fn allocate_id(&mut self) -> VertexId {
        self.next_id += 1;
        self.next_id
    }

    fn contains(&self, label: VertexLabel, key: &str) -> bool {
        match label {
            VertexLabel::Domain => self.domains.contains_key(key),
            VertexLabel::DnsRecord => self.dns_records.contains_key(key),
        }
    }
}

/// Graph store held in memory.
///
/// A unit of work mutates a copy of the committed state; `commit` swaps it in
/// and `rollback` throws it away, so readers never see a partial chain.
#[derive(Debug, Default)]
pub struct MemoryStore {
    committed: Snapshot,
    pending: Option<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_transaction(&self) -> bool {
        self.pending.is_some()
    }

    fn view(&self) -> &Snapshot {
        self.pending.as_ref().unwrap_or(&self.committed)
    }

    fn pending_mut(&mut self) -> StoreResult<&mut Snapshot> {
        self.pending.as_mut().ok_or(StoreError::NoTransaction)
    }
}

impl GraphStore for MemoryStore {
    fn begin(&mut self) -> StoreResult<()> {
        if self.pending.is_some() {
            return Err(StoreError::TransactionOpen);
        }
        self.pending = Some(self.committed.clone());
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        let pending = self.pending.take().ok_or(StoreError::NoTransaction)?;
        self.committed = pending;
        Ok(())
    }

    fn rollback(&mut self) -> StoreResult<()> {
        self.pending
            .take()
            .map(|_| ())
            .ok_or(StoreError::NoTransaction)
    }

    fn upsert_vertex(&mut self, vertex: &Vertex) -> StoreResult<VertexId> {
        let snapshot = self.pending_mut()?;
        let key = vertex.key();
        let existing = match vertex {
            Vertex::Domain(_) => snapshot.domains.get(&key).map(|(id, _)| *id),
            Vertex::DnsRecord(_) => snapshot.dns_records.get(&key).map(|(id, _)| *id),
        };
        let id = existing.unwrap_or_else(|| snapshot.allocate_id());
        match vertex {
            Vertex::Domain(domain) => {
                snapshot.domains.insert(key, (id, domain.clone()));
            }
            Vertex::DnsRecord(record) => {
                snapshot.dns_records.insert(key, (id, record.clone()));
            }
        }
        Ok(id)
    }

    fn upsert_edge(&mut self, edge_type: EdgeType, from_key: &str, to_key: &str) -> StoreResult<()> {
        let snapshot = self.pending_mut()?;
        let to_label = match edge_type {
            EdgeType::HasSubdomain => VertexLabel::Domain,
            EdgeType::HasDnsRecord => VertexLabel::DnsRecord,
        };
        if !snapshot.contains(VertexLabel::Domain, from_key) {
            return Err(StoreError::MissingVertex(from_key.to_string()));
        }
        if !snapshot.contains(to_label, to_key) {
            return Err(StoreError::MissingVertex(to_key.to_string()));
        }
        snapshot.edges.insert(Edge {
            edge_type,
            from: from_key.to_string(),
            to: to_key.to_string(),
        });
        Ok(())
    }

    fn read_vertex(&self, label: VertexLabel, key: &str) -> StoreResult<Option<Vertex>> {
        let snapshot = self.view();
        Ok(match label {
            VertexLabel::Domain => snapshot
                .domains
                .get(key)
                .map(|(_, d)| Vertex::Domain(d.clone())),
            VertexLabel::DnsRecord => snapshot
                .dns_records
                .get(key)
                .map(|(_, r)| Vertex::DnsRecord(r.clone())),
        })
    }

    fn count(&self, label: VertexLabel) -> StoreResult<u64> {
        let snapshot = self.view();
        Ok(match label {
            VertexLabel::Domain => snapshot.domains.len() as u64,
            VertexLabel::DnsRecord => snapshot.dns_records.len() as u64,
        })
    }

    fn count_edges(&self, edge_type: EdgeType) -> StoreResult<u64> {
        Ok(self
            .view()
            .edges
            .iter()
            .filter(|e| e.edge_type == edge_type)
            .count() as u64)
    }

    fn domains(&self) -> StoreResult<Vec<DomainVertex>> {
        Ok(self
            .view()
            .domains
            .values()
            .map(|(_, d)| d.clone())
            .collect())
    }

    fn edges(&self, edge_type: EdgeType) -> StoreResult<Vec<Edge>> {
        Ok(self
            .view()
            .edges
            .iter()
            .filter(|e| e.edge_type == edge_type)
            .cloned()
            .collect())
    }

    fn record_conflict(&mut self, conflict: &ProvenanceConflict) -> StoreResult<()> {
        self.pending_mut()?.conflicts.push(conflict.clone());
        Ok(())
    }

    fn conflicts(&self) -> StoreResult<Vec<ProvenanceConflict>> {
        Ok(self.view().conflicts.clone())
    }
}
