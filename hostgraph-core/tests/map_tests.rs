// Tests for the domain map and integrity checks

use hostgraph_core::map::{DomainMap, Violation};
use hostgraph_core::{
    ConflictPolicy, DomainNode, DomainVertex, EdgeType, GraphStore, GraphSynchronizer,
    MemoryStore, Vertex,
};

fn synced(observations: &[(&str, &str, &str)]) -> MemoryStore {
    let sync = GraphSynchronizer::new(MemoryStore::new(), ConflictPolicy::MergeSources);
    for (host, root, source) in observations {
        sync.sync(&DomainNode::new(*host, *root, *source)).unwrap();
    }
    sync.into_inner().unwrap()
}

fn raw_domain(store: &mut MemoryStore, host: &str, root: &str) {
    let node = DomainNode::new(host, root, "amass");
    store
        .upsert_vertex(&Vertex::Domain(DomainVertex::from_node(&node, 1)))
        .unwrap();
}

// ============================================================================
// Traversal Tests
// ============================================================================

#[test]
fn test_load_counts() {
    let store = synced(&[
        ("a.b.example.com", "example.com", "subfinder"),
        ("www.example.com", "example.com", "amass"),
    ]);
    let map = DomainMap::load(&store).unwrap();

    assert_eq!(map.node_count(), 4);
    assert_eq!(map.edge_count(), 3);
    assert!(map.get("b.example.com").unwrap().is_implicit);
    assert!(map.get("missing.example.com").is_none());
}

#[test]
fn test_roots_and_children() {
    let store = synced(&[
        ("www.example.com", "example.com", "amass"),
        ("api.example.com", "example.com", "amass"),
        ("shop.example.org", "example.org", "crt"),
    ]);
    let map = DomainMap::load(&store).unwrap();

    let roots: Vec<&str> = map.roots().iter().map(|d| d.host.as_str()).collect();
    assert_eq!(roots, vec!["example.com", "example.org"]);

    let children: Vec<&str> = map
        .children("example.com")
        .iter()
        .map(|d| d.host.as_str())
        .collect();
    assert_eq!(children, vec!["api.example.com", "www.example.com"]);
    assert!(map.children("nope.example.com").is_empty());
}

#[test]
fn test_descendant_count() {
    let store = synced(&[
        ("a.b.example.com", "example.com", "subfinder"),
        ("c.b.example.com", "example.com", "subfinder"),
        ("www.example.com", "example.com", "amass"),
    ]);
    let map = DomainMap::load(&store).unwrap();

    assert_eq!(map.descendant_count("example.com"), 4);
    assert_eq!(map.descendant_count("b.example.com"), 2);
    assert_eq!(map.descendant_count("www.example.com"), 0);
}

#[test]
fn test_render_tree() {
    let store = synced(&[
        ("a.b.example.com", "example.com", "subfinder"),
        ("www.example.com", "example.com", "amass"),
        ("www.example.com", "example.com", "crt"),
    ]);
    let map = DomainMap::load(&store).unwrap();

    let expected = "\
example.com
├── b.example.com
│   └── a.b.example.com [subfinder]
└── www.example.com [amass, crt]
";
    assert_eq!(map.render_tree("example.com"), expected);
    assert_eq!(map.render_tree("missing.example.com"), "");
}

// ============================================================================
// Verification Tests
// ============================================================================

#[test]
fn test_synced_graph_verifies_clean() {
    let store = synced(&[
        ("a.b.c.example.com", "example.com", "subfinder"),
        ("x.c.example.com", "example.com", "amass"),
        ("example.com", "example.com", "amass"),
        ("mail.example.org", "example.org", "crt"),
    ]);
    let map = DomainMap::load(&store).unwrap();
    assert!(map.verify().is_empty());
}

#[test]
fn test_verify_reports_orphan() {
    let mut store = MemoryStore::new();
    store.begin().unwrap();
    raw_domain(&mut store, "example.com", "example.com");
    raw_domain(&mut store, "api.example.com", "example.com");
    store.commit().unwrap();

    let map = DomainMap::load(&store).unwrap();
    assert_eq!(
        map.verify(),
        vec![Violation::Orphan("api.example.com".to_string())]
    );
}

#[test]
fn test_verify_reports_wrong_parent() {
    let mut store = MemoryStore::new();
    store.begin().unwrap();
    raw_domain(&mut store, "example.com", "example.com");
    raw_domain(&mut store, "a.b.example.com", "example.com");
    store
        .upsert_edge(EdgeType::HasSubdomain, "example.com", "a.b.example.com")
        .unwrap();
    store.commit().unwrap();

    let map = DomainMap::load(&store).unwrap();
    assert_eq!(
        map.verify(),
        vec![Violation::WrongParent {
            parent: "example.com".to_string(),
            child: "a.b.example.com".to_string(),
        }]
    );
}

#[test]
fn test_verify_reports_cycle() {
    let mut store = MemoryStore::new();
    store.begin().unwrap();
    raw_domain(&mut store, "example.com", "example.com");
    raw_domain(&mut store, "api.example.com", "example.com");
    store
        .upsert_edge(EdgeType::HasSubdomain, "example.com", "api.example.com")
        .unwrap();
    store
        .upsert_edge(EdgeType::HasSubdomain, "api.example.com", "example.com")
        .unwrap();
    store.commit().unwrap();

    let violations = DomainMap::load(&store).unwrap().verify();
    assert!(violations.contains(&Violation::Cycle));
    assert!(violations.contains(&Violation::WrongParent {
        parent: "api.example.com".to_string(),
        child: "example.com".to_string(),
    }));
}

#[test]
fn test_verify_reports_multiple_parents() {
    let mut store = MemoryStore::new();
    store.begin().unwrap();
    raw_domain(&mut store, "b.example.com", "example.com");
    raw_domain(&mut store, "c.example.com", "example.com");
    raw_domain(&mut store, "a.b.example.com", "example.com");
    store
        .upsert_edge(EdgeType::HasSubdomain, "b.example.com", "a.b.example.com")
        .unwrap();
    store
        .upsert_edge(EdgeType::HasSubdomain, "c.example.com", "a.b.example.com")
        .unwrap();
    store.commit().unwrap();

    let violations = DomainMap::load(&store).unwrap().verify();
    assert!(violations.contains(&Violation::MultipleParents {
        host: "a.b.example.com".to_string(),
        parents: vec!["b.example.com".to_string(), "c.example.com".to_string()],
    }));
    assert!(violations.contains(&Violation::WrongParent {
        parent: "c.example.com".to_string(),
        child: "a.b.example.com".to_string(),
    }));
    assert!(violations.contains(&Violation::Orphan("b.example.com".to_string())));
}
