// Hostname helpers
//
// Splitting is label based and does not consult a public suffix list, so
// `foo.co.uk` has the parent `co.uk` and the grandparent `uk`. Graphs already
// on disk were built with this rule; changing it changes their shape.

use crate::error::HostnameError;

const MAX_NAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Return the immediate parent of `host` by dropping its leftmost label.
///
/// Fails with [`HostnameError::NoParent`] when `host` has fewer than two labels.
pub fn parent_of(host: &str) -> Result<&str, HostnameError> {
    match host.split_once('.') {
        Some((_, parent)) => Ok(parent),
        None => Err(HostnameError::NoParent(host.to_string())),
    }
}

/// Split a hostname into its dot separated labels.
pub fn labels(host: &str) -> Vec<&str> {
    host.split('.').collect()
}

/// True when `root` is a dot-bounded suffix of `host`, or equal to it.
pub fn is_subdomain_of(host: &str, root: &str) -> bool {
    if host == root {
        return true;
    }
    host.len() > root.len()
        && host.ends_with(root)
        && host.as_bytes()[host.len() - root.len() - 1] == b'.'
}

/// Normalize a raw hostname coming from tool output.
///
/// Trims whitespace, drops one trailing dot and lowercases. Empty labels,
/// embedded whitespace and over-long names are rejected.
pub fn normalize(raw: &str) -> Result<String, HostnameError> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);

    if trimmed.is_empty() {
        return Err(HostnameError::Malformed(raw.to_string(), "empty hostname"));
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(HostnameError::Malformed(raw.to_string(), "name longer than 253 bytes"));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(HostnameError::Malformed(raw.to_string(), "contains whitespace"));
    }
    for label in trimmed.split('.') {
        if label.is_empty() {
            return Err(HostnameError::Malformed(raw.to_string(), "empty label"));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(HostnameError::Malformed(raw.to_string(), "label longer than 63 bytes"));
        }
    }

    Ok(trimmed.to_ascii_lowercase())
}
