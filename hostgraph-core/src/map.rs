// Domain hierarchy loaded into petgraph for traversal and checks

use crate::error::StoreResult;
use crate::hostname::parent_of;
use crate::model::DomainVertex;
use crate::store::{EdgeType, GraphStore};
use petgraph::Direction;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A structural problem found by [`DomainMap::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Violation {
    /// A non-root domain with no incoming `HAS_SUBDOMAIN` edge.
    Orphan(String),
    /// A domain with more than one parent edge.
    MultipleParents { host: String, parents: Vec<String> },
    /// An edge whose source is not the label-stripped parent of its target.
    WrongParent { parent: String, child: String },
    /// An edge pointing at a host with no vertex.
    DanglingEdge { from: String, to: String },
    Cycle,
}

pub struct DomainMap {
    graph: DiGraph<DomainVertex, ()>,
    index: HashMap<String, NodeIndex>,
    dangling: Vec<(String, String)>,
}

impl DomainMap {
    pub fn load<S: GraphStore + ?Sized>(store: &S) -> StoreResult<Self> {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        for domain in store.domains()? {
            let host = domain.host.clone();
            let idx = graph.add_node(domain);
            index.insert(host, idx);
        }

        let mut dangling = Vec::new();
        for edge in store.edges(EdgeType::HasSubdomain)? {
            match (index.get(&edge.from), index.get(&edge.to)) {
                (Some(&from), Some(&to)) => {
                    graph.add_edge(from, to, ());
                }
                _ => dangling.push((edge.from, edge.to)),
            }
        }

        Ok(Self {
            graph,
            index,
            dangling,
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn get(&self, host: &str) -> Option<&DomainVertex> {
        self.index.get(host).map(|&idx| &self.graph[idx])
    }

    /// Domains with no parent edge, sorted by host.
    pub fn roots(&self) -> Vec<&DomainVertex> {
        let mut roots: Vec<&DomainVertex> = self
            .graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| &self.graph[idx])
            .collect();
        roots.sort_by(|a, b| a.host.cmp(&b.host));
        roots
    }

    /// Immediate children of `host`, sorted by host.
    pub fn children(&self, host: &str) -> Vec<&DomainVertex> {
        let Some(&idx) = self.index.get(host) else {
            return Vec::new();
        };
        let mut children: Vec<&DomainVertex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|child| &self.graph[child])
            .collect();
        children.sort_by(|a, b| a.host.cmp(&b.host));
        children
    }

    /// Number of domains below `host`, not counting `host` itself.
    pub fn descendant_count(&self, host: &str) -> usize {
        self.children(host)
            .iter()
            .map(|child| 1 + self.descendant_count(&child.host))
            .sum()
    }

    /// Render the subtree under `host` as an indented tree.
    ///
    /// Explicitly observed domains are followed by their source in brackets.
    pub fn render_tree(&self, host: &str) -> String {
        let mut out = String::new();
        if let Some(domain) = self.get(host) {
            out.push_str(&describe(domain));
            out.push('\n');
            self.render_children(host, "", &mut out);
        }
        out
    }

    fn render_children(&self, host: &str, prefix: &str, out: &mut String) {
        let children = self.children(host);
        let last = children.len().saturating_sub(1);
        for (i, child) in children.iter().enumerate() {
            let (branch, indent) = if i == last {
                ("└── ", "    ")
            } else {
                ("├── ", "│   ")
            };
            out.push_str(prefix);
            out.push_str(branch);
            out.push_str(&describe(child));
            out.push('\n');
            self.render_children(&child.host, &format!("{prefix}{indent}"), out);
        }
    }

    /// Check the hierarchy invariants: one parent per non-root domain, every
    /// edge from the label-stripped parent, no dangling edges and no cycles.
    pub fn verify(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        for (from, to) in &self.dangling {
            violations.push(Violation::DanglingEdge {
                from: from.clone(),
                to: to.clone(),
            });
        }

        let mut indices: Vec<NodeIndex> = self.graph.node_indices().collect();
        indices.sort_by(|a, b| self.graph[*a].host.cmp(&self.graph[*b].host));

        for idx in indices {
            let domain = &self.graph[idx];
            let mut parents: Vec<String> = self
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .map(|p| self.graph[p].host.clone())
                .collect();
            parents.sort();

            match parents.len() {
                0 if !domain.is_root => violations.push(Violation::Orphan(domain.host.clone())),
                0 | 1 => {}
                _ => violations.push(Violation::MultipleParents {
                    host: domain.host.clone(),
                    parents: parents.clone(),
                }),
            }

            for parent in parents {
                if parent_of(&domain.host).ok() != Some(parent.as_str()) {
                    violations.push(Violation::WrongParent {
                        parent,
                        child: domain.host.clone(),
                    });
                }
            }
        }

        if is_cyclic_directed(&self.graph) {
            violations.push(Violation::Cycle);
        }

        violations
    }
}

fn describe(domain: &DomainVertex) -> String {
    if domain.is_implicit {
        domain.host.clone()
    } else {
        format!("{} [{}]", domain.host, domain.sources.join(", "))
    }
}
