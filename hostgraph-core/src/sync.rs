// Idempotent projection of observations into the graph store

use crate::error::{Result, StoreError, SyncError};
use crate::hierarchy::expand_node;
use crate::hostname::parent_of;
use crate::model::{
    ConflictResolution, DnsRecordNode, DomainNode, DomainVertex, ProvenanceConflict,
    current_timestamp,
};
use crate::store::{EdgeType, GraphStore, Vertex, VertexLabel};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// What to do when two explicit observations of a host disagree on source or root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictPolicy {
    /// Roll back the chain and fail with [`SyncError::ProvenanceConflict`].
    #[default]
    Reject,
    /// Keep the existing source and root, add the new source to the vertex's source set.
    MergeSources,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::Reject => "reject",
            ConflictPolicy::MergeSources => "merge",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "reject" => Some(ConflictPolicy::Reject),
            "merge" | "merge-sources" => Some(ConflictPolicy::MergeSources),
            _ => None,
        }
    }
}

/// Summary of one committed unit of work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub vertices_created: usize,
    pub vertices_updated: usize,
    pub edges_upserted: usize,
    /// Conflicts merged under [`ConflictPolicy::MergeSources`].
    pub conflicts: Vec<ProvenanceConflict>,
}

/// Writes observed domains and their inferred ancestors to a [`GraphStore`].
///
/// The store sits behind a mutex: each call holds it for the whole
/// read-modify-write of one chain, so callers sharing a synchronizer across
/// threads are serialized chain by chain.
pub struct GraphSynchronizer<S: GraphStore> {
    store: Mutex<S>,
    policy: ConflictPolicy,
}

impl<S: GraphStore> GraphSynchronizer<S> {
    pub fn new(store: S, policy: ConflictPolicy) -> Self {
        Self {
            store: Mutex::new(store),
            policy,
        }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Lock the underlying store for reads or bookkeeping outside a sync.
    pub fn lock_store(&self) -> Result<MutexGuard<'_, S>> {
        self.store
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()).into())
    }

    pub fn into_inner(self) -> Result<S> {
        self.store
            .into_inner()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()).into())
    }

    /// Project one observation, and every domain between it and its root, into the store.
    ///
    /// All vertices and edges of the chain are committed together or not at all.
    pub fn sync(&self, node: &DomainNode) -> Result<SyncOutcome> {
        let chain = expand_node(node)?;

        let mut links = Vec::with_capacity(chain.len().saturating_sub(1));
        for element in chain.iter().filter(|n| !n.is_root) {
            links.push((parent_of(&element.host)?.to_string(), element.host.clone()));
        }

        debug!(host = %node.host, root = %node.root, source = %node.source, chain = chain.len(), "syncing domain chain");

        let mut store = self.lock_store()?;
        let policy = self.policy;
        let result = in_unit_of_work(&mut *store, |store| {
            let mut outcome = SyncOutcome::default();
            for element in &chain {
                upsert_domain(store, element, policy, &mut outcome)?;
            }
            for (parent, child) in &links {
                store.upsert_edge(EdgeType::HasSubdomain, parent, child)?;
                outcome.edges_upserted += 1;
            }
            Ok(outcome)
        });

        match result {
            Err(SyncError::ProvenanceConflict(conflict)) => {
                warn!(
                    host = %conflict.host,
                    existing = %conflict.existing_source,
                    incoming = %conflict.incoming_source,
                    "rejected conflicting observation"
                );
                let audit = in_unit_of_work(&mut *store, |store| {
                    store.record_conflict(&conflict)?;
                    Ok(())
                });
                if let Err(e) = audit {
                    warn!(host = %conflict.host, error = %e, "failed to record conflict");
                }
                Err(SyncError::ProvenanceConflict(conflict))
            }
            other => other,
        }
    }

    /// Attach a DNS snapshot to its domain, merging with an existing snapshot of the same key.
    pub fn sync_dns_record(&self, record: DnsRecordNode) -> Result<SyncOutcome> {
        let mut store = self.lock_store()?;
        in_unit_of_work(&mut *store, |store| {
            if store.read_domain(&record.host)?.is_none() {
                return Err(SyncError::MissingDomain(record.host.clone()));
            }

            let key = record.key();
            let host = record.host.clone();
            let mut outcome = SyncOutcome::default();
            let existing = store
                .read_vertex(VertexLabel::DnsRecord, &key)?
                .and_then(Vertex::into_dns_record);

            let merged = match existing {
                Some(mut existing) => {
                    existing.merge(record);
                    outcome.vertices_updated += 1;
                    existing
                }
                None => {
                    outcome.vertices_created += 1;
                    record
                }
            };

            debug!(host = %host, key = %key, records = merged.record_count(), "upserting DNS snapshot");
            store.upsert_vertex(&Vertex::DnsRecord(merged))?;
            store.upsert_edge(EdgeType::HasDnsRecord, &host, &key)?;
            outcome.edges_upserted += 1;
            Ok(outcome)
        })
    }
}

/// Run `f` between `begin` and `commit`, rolling back on any error.
fn in_unit_of_work<S, R>(store: &mut S, f: impl FnOnce(&mut S) -> Result<R>) -> Result<R>
where
    S: GraphStore,
{
    store.begin()?;
    match f(store) {
        Ok(value) => match store.commit() {
            Ok(()) => Ok(value),
            Err(e) => {
                if let Err(rollback_err) = store.rollback() {
                    warn!(error = %rollback_err, "rollback after failed commit failed");
                }
                Err(e.into())
            }
        },
        Err(e) => {
            if let Err(rollback_err) = store.rollback() {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(e)
        }
    }
}

fn upsert_domain<S: GraphStore>(
    store: &mut S,
    element: &DomainNode,
    policy: ConflictPolicy,
    outcome: &mut SyncOutcome,
) -> Result<()> {
    let now = current_timestamp();

    let Some(mut vertex) = store.read_domain(&element.host)? else {
        debug!(host = %element.host, implicit = element.is_implicit, "creating domain vertex");
        store.upsert_vertex(&Vertex::Domain(DomainVertex::from_node(element, now)))?;
        outcome.vertices_created += 1;
        return Ok(());
    };

    // Implicit observations never touch an existing vertex.
    if element.is_implicit {
        return Ok(());
    }

    if vertex.is_implicit {
        debug!(host = %element.host, source = %element.source, "promoting implicit domain to explicit");
        vertex.root = element.root.clone();
        vertex.source = element.source.clone();
        vertex.is_implicit = false;
        vertex.is_root = element.is_root;
        if !vertex.has_source(&element.source) {
            vertex.sources.push(element.source.clone());
        }
        if !vertex.roots.contains(&element.root) {
            vertex.roots.push(element.root.clone());
        }
    } else if vertex.has_root(&element.root)
        && (vertex.source == element.source || vertex.has_source(&element.source))
    {
        // Same observation again, or a root and source merged earlier.
    } else {
        let conflict = |resolution| ProvenanceConflict {
            host: vertex.host.clone(),
            existing_source: vertex.source.clone(),
            existing_root: vertex.root.clone(),
            incoming_source: element.source.clone(),
            incoming_root: element.root.clone(),
            resolution,
            recorded_at: now,
        };
        match policy {
            ConflictPolicy::Reject => {
                return Err(SyncError::ProvenanceConflict(Box::new(conflict(
                    ConflictResolution::Rejected,
                ))));
            }
            ConflictPolicy::MergeSources => {
                let conflict = conflict(ConflictResolution::Merged);
                warn!(
                    host = %conflict.host,
                    existing = %conflict.existing_source,
                    incoming = %conflict.incoming_source,
                    "merging conflicting observation"
                );
                store.record_conflict(&conflict)?;
                outcome.conflicts.push(conflict);
                if !vertex.has_source(&element.source) {
                    vertex.sources.push(element.source.clone());
                }
                if !vertex.roots.contains(&element.root) {
                    vertex.roots.push(element.root.clone());
                }
            }
        }
    }

    vertex.last_seen = now;
    store.upsert_vertex(&Vertex::Domain(vertex))?;
    outcome.vertices_updated += 1;
    Ok(())
}
