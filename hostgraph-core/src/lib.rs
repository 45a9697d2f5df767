pub mod data;
pub mod error;
pub mod hierarchy;
pub mod hostname;
pub mod map;
pub mod memory;
pub mod model;
pub mod report;
pub mod store;
pub mod sync;

pub use data::Database;
pub use error::{HostnameError, StoreError, SyncError};
pub use hierarchy::expand;
pub use hostname::parent_of;
pub use memory::MemoryStore;
pub use model::{DnsRecordNode, DomainNode, DomainVertex, IMPLICIT_SOURCE, ProvenanceConflict};
pub use store::{EdgeType, GraphStore, Vertex, VertexLabel};
pub use sync::{ConflictPolicy, GraphSynchronizer, SyncOutcome};

use colored::Colorize;

const BANNER: &str = r#"
 ┌─────────────────────────────┐
 │  h o s t g r a p h          │
 │  example.com ─┬─ api        │
 │               └─ mail ─ mx1 │
 └─────────────────────────────┘
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "domain hierarchy graphs for recon output".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
