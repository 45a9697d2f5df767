use crate::error::HostnameError;
use crate::hostname::{is_subdomain_of, labels};
use crate::model::DomainNode;

/// Expand one observation into the chain of domains from `root` down to `host`.
///
/// The returned chain is root first and host last. Only the element equal to
/// `host` carries `source`; the root and every intermediate domain are
/// implicit. For `host == root` the chain has a single element.
pub fn expand(host: &str, root: &str, source: &str) -> Result<Vec<DomainNode>, HostnameError> {
    if !is_subdomain_of(host, root) {
        return Err(HostnameError::NotASubdomain {
            host: host.to_string(),
            root: root.to_string(),
        });
    }

    let host_labels = labels(host);
    let extra = host_labels.len() - labels(root).len();

    let mut chain = Vec::with_capacity(extra + 1);
    chain.push(node_for(root, root, host, source));

    // Walk the labels unique to host from right to left, growing the name.
    for start in (0..extra).rev() {
        let name = host_labels[start..].join(".");
        chain.push(node_for(&name, root, host, source));
    }

    Ok(chain)
}

/// Expand a [`DomainNode`] observation.
pub fn expand_node(node: &DomainNode) -> Result<Vec<DomainNode>, HostnameError> {
    expand(&node.host, &node.root, &node.source)
}

fn node_for(name: &str, root: &str, observed: &str, source: &str) -> DomainNode {
    if name == observed {
        DomainNode::new(name, root, source)
    } else {
        DomainNode::implicit(name, root)
    }
}
