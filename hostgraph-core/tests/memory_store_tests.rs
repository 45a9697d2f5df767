// Tests for the in-memory graph store

use hostgraph_core::model::RecordType;
use hostgraph_core::{
    DnsRecordNode, DomainNode, DomainVertex, EdgeType, GraphStore, MemoryStore, StoreError,
    Vertex, VertexLabel,
};

fn domain(host: &str, root: &str) -> Vertex {
    Vertex::Domain(DomainVertex::from_node(&DomainNode::new(host, root, "amass"), 1))
}

// ============================================================================
// Unit of Work Tests
// ============================================================================

#[test]
fn test_writes_require_unit_of_work() {
    let mut store = MemoryStore::new();

    assert!(matches!(
        store.upsert_vertex(&domain("example.com", "example.com")),
        Err(StoreError::NoTransaction)
    ));
    assert!(matches!(store.commit(), Err(StoreError::NoTransaction)));
    assert!(matches!(store.rollback(), Err(StoreError::NoTransaction)));
}

#[test]
fn test_begin_twice_fails() {
    let mut store = MemoryStore::new();
    store.begin().unwrap();
    assert!(matches!(store.begin(), Err(StoreError::TransactionOpen)));
    assert!(store.in_transaction());
}

#[test]
fn test_commit_publishes_pending_writes() {
    let mut store = MemoryStore::new();

    store.begin().unwrap();
    store.upsert_vertex(&domain("example.com", "example.com")).unwrap();
    store.upsert_vertex(&domain("api.example.com", "example.com")).unwrap();
    store
        .upsert_edge(EdgeType::HasSubdomain, "example.com", "api.example.com")
        .unwrap();
    store.commit().unwrap();

    assert!(!store.in_transaction());
    assert_eq!(store.count(VertexLabel::Domain).unwrap(), 2);
    assert_eq!(store.count_edges(EdgeType::HasSubdomain).unwrap(), 1);
}

#[test]
fn test_rollback_restores_committed_state() {
    let mut store = MemoryStore::new();

    store.begin().unwrap();
    store.upsert_vertex(&domain("example.com", "example.com")).unwrap();
    store.commit().unwrap();

    store.begin().unwrap();
    store.upsert_vertex(&domain("api.example.com", "example.com")).unwrap();
    assert_eq!(store.count(VertexLabel::Domain).unwrap(), 2);
    store.rollback().unwrap();

    assert_eq!(store.count(VertexLabel::Domain).unwrap(), 1);
    assert!(store.read_domain("api.example.com").unwrap().is_none());
}

// ============================================================================
// Vertex and Edge Tests
// ============================================================================

#[test]
fn test_vertex_ids_are_stable() {
    let mut store = MemoryStore::new();

    store.begin().unwrap();
    let first = store.upsert_vertex(&domain("example.com", "example.com")).unwrap();
    let other = store.upsert_vertex(&domain("api.example.com", "example.com")).unwrap();
    let again = store.upsert_vertex(&domain("example.com", "example.com")).unwrap();
    store.commit().unwrap();

    assert_eq!(first, again);
    assert_ne!(first, other);
}

#[test]
fn test_duplicate_edges_collapse() {
    let mut store = MemoryStore::new();

    store.begin().unwrap();
    store.upsert_vertex(&domain("example.com", "example.com")).unwrap();
    store.upsert_vertex(&domain("api.example.com", "example.com")).unwrap();
    store
        .upsert_edge(EdgeType::HasSubdomain, "example.com", "api.example.com")
        .unwrap();
    store
        .upsert_edge(EdgeType::HasSubdomain, "example.com", "api.example.com")
        .unwrap();
    store.commit().unwrap();

    assert_eq!(store.edges(EdgeType::HasSubdomain).unwrap().len(), 1);
}

#[test]
fn test_edge_to_missing_vertex_fails() {
    let mut store = MemoryStore::new();

    store.begin().unwrap();
    store.upsert_vertex(&domain("example.com", "example.com")).unwrap();
    let result = store.upsert_edge(EdgeType::HasSubdomain, "example.com", "api.example.com");
    assert!(matches!(result, Err(StoreError::MissingVertex(_))));
}

#[test]
fn test_dns_edge_targets_record_vertex() {
    let mut store = MemoryStore::new();
    let record = DnsRecordNode::new("example.com", "NOERROR", "t0")
        .with_records(RecordType::Txt, vec!["v=spf1 -all".to_string()]);

    store.begin().unwrap();
    store.upsert_vertex(&domain("example.com", "example.com")).unwrap();
    store.upsert_vertex(&Vertex::DnsRecord(record.clone())).unwrap();
    store
        .upsert_edge(EdgeType::HasDnsRecord, "example.com", &record.key())
        .unwrap();
    store.commit().unwrap();

    assert_eq!(store.count_edges(EdgeType::HasDnsRecord).unwrap(), 1);
    assert_eq!(store.count_edges(EdgeType::HasSubdomain).unwrap(), 0);
    assert_eq!(
        store
            .read_vertex(VertexLabel::DnsRecord, "example.com@t0")
            .unwrap(),
        Some(Vertex::DnsRecord(record))
    );
}
