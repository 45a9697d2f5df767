use crate::model::ProvenanceConflict;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostnameError {
    #[error("Domain {0} has no parent")]
    NoParent(String),

    #[error("{host} is not a subdomain of {root}")]
    NotASubdomain { host: String, root: String },

    #[error("Malformed hostname '{0}': {1}")]
    Malformed(String, &'static str),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Vertex {0} does not exist")]
    MissingVertex(String),

    #[error("No open unit of work")]
    NoTransaction,

    #[error("A unit of work is already open")]
    TransactionOpen,
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Hostname(#[from] HostnameError),

    #[error("Provenance conflict on {}: {} ({}) vs {} ({})",
        .0.host, .0.existing_source, .0.existing_root, .0.incoming_source, .0.incoming_root)]
    ProvenanceConflict(Box<ProvenanceConflict>),

    #[error("No domain vertex for {0}, cannot link DNS record")]
    MissingDomain(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
