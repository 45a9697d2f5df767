// Tests for hostname helpers

use hostgraph_core::HostnameError;
use hostgraph_core::hostname::{is_subdomain_of, labels, normalize, parent_of};

// ============================================================================
// Parent Tests
// ============================================================================

#[test]
fn test_parent_of_drops_leftmost_label() {
    assert_eq!(parent_of("a.b.example.com").unwrap(), "b.example.com");
    assert_eq!(parent_of("b.example.com").unwrap(), "example.com");
    assert_eq!(parent_of("example.com").unwrap(), "com");
}

#[test]
fn test_parent_of_single_label_fails() {
    assert_eq!(
        parent_of("localhost"),
        Err(HostnameError::NoParent("localhost".to_string()))
    );
}

#[test]
fn test_parent_of_ignores_public_suffixes() {
    assert_eq!(parent_of("foo.co.uk").unwrap(), "co.uk");
    assert_eq!(parent_of("co.uk").unwrap(), "uk");
}

#[test]
fn test_parent_of_borrows_from_input() {
    let host = String::from("www.example.com");
    let parent = parent_of(&host).unwrap();
    assert!(std::ptr::eq(parent.as_ptr(), host[4..].as_ptr()));
}

// ============================================================================
// Label and Suffix Tests
// ============================================================================

#[test]
fn test_labels() {
    assert_eq!(labels("a.b.example.com"), vec!["a", "b", "example", "com"]);
    assert_eq!(labels("localhost"), vec!["localhost"]);
}

#[test]
fn test_is_subdomain_of() {
    assert!(is_subdomain_of("api.example.com", "example.com"));
    assert!(is_subdomain_of("a.b.example.com", "example.com"));
    assert!(is_subdomain_of("example.com", "example.com"));
}

#[test]
fn test_is_subdomain_of_requires_label_boundary() {
    assert!(!is_subdomain_of("badexample.com", "example.com"));
    assert!(!is_subdomain_of("example.com", "api.example.com"));
    assert!(!is_subdomain_of("example.org", "example.com"));
}

// ============================================================================
// Normalization Tests
// ============================================================================

#[test]
fn test_normalize_lowercases_and_trims() {
    assert_eq!(normalize("  API.Example.COM ").unwrap(), "api.example.com");
}

#[test]
fn test_normalize_strips_trailing_dot() {
    assert_eq!(normalize("www.example.com.").unwrap(), "www.example.com");
}

#[test]
fn test_normalize_rejects_malformed_names() {
    assert!(matches!(normalize(""), Err(HostnameError::Malformed(_, _))));
    assert!(matches!(normalize("   "), Err(HostnameError::Malformed(_, _))));
    assert!(matches!(normalize("a..example.com"), Err(HostnameError::Malformed(_, _))));
    assert!(matches!(normalize(".example.com"), Err(HostnameError::Malformed(_, _))));
    assert!(matches!(normalize("bad host.com"), Err(HostnameError::Malformed(_, _))));
}

#[test]
fn test_normalize_rejects_long_labels_and_names() {
    let long_label = format!("{}.example.com", "a".repeat(64));
    assert!(normalize(&long_label).is_err());

    let ok_label = format!("{}.example.com", "a".repeat(63));
    assert!(normalize(&ok_label).is_ok());

    let long_name = vec!["abcdefghi"; 30].join(".");
    assert!(long_name.len() > 253);
    assert!(normalize(&long_name).is_err());
}
