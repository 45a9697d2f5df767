pub mod driver;
pub mod error;
pub mod lines;
pub mod record;

pub use driver::{
    IngestOptions, IngestProgressCallback, IngestSummary, ingest_dns, ingest_dns_file,
    ingest_subdomains, ingest_subdomains_file,
};
pub use error::IngestError;
pub use record::{parse_dns_line, parse_subdomain_line};
