// Record shapes emitted by passive recon tools, one JSON object per line

use crate::error::{IngestError, Result};
use hostgraph_core::hostname::normalize;
use hostgraph_core::model::{IMPLICIT_SOURCE, RecordType};
use hostgraph_core::{DnsRecordNode, DomainNode};
use serde::Deserialize;
use serde_json::Value;

/// A subdomain enumeration result such as `{"host": .., "input": .., "source": ..}`.
#[derive(Debug, Clone, Deserialize)]
struct SubdomainLine {
    host: Option<String>,
    #[serde(alias = "root")]
    input: Option<String>,
    source: Option<String>,
}

/// A resolver result in the dnsx JSON layout.
#[derive(Debug, Clone, Deserialize)]
struct DnsLine {
    host: Option<String>,
    status_code: Option<String>,
    timestamp: Option<String>,
    #[serde(default)]
    a: Vec<Value>,
    #[serde(default)]
    aaaa: Vec<Value>,
    #[serde(default)]
    mx: Vec<Value>,
    #[serde(default)]
    ns: Vec<Value>,
    #[serde(default)]
    txt: Vec<Value>,
    #[serde(default)]
    cname: Vec<Value>,
    #[serde(default)]
    soa: Vec<Value>,
    #[serde(default)]
    ptr: Vec<Value>,
    #[serde(default)]
    spf: Vec<Value>,
    #[serde(default)]
    dkim: Vec<Value>,
    #[serde(default)]
    dmarc: Vec<Value>,
}

fn required(value: Option<String>, line: usize, field: &'static str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(IngestError::MissingField { line, field }),
    }
}

fn hostname(raw: &str, line: usize) -> Result<String> {
    normalize(raw).map_err(|source| IngestError::Malformed { line, source })
}

/// Parse one subdomain result into an explicit observation.
pub fn parse_subdomain_line(line: usize, text: &str) -> Result<DomainNode> {
    let record: SubdomainLine =
        serde_json::from_str(text).map_err(|source| IngestError::Json { line, source })?;

    let host = hostname(&required(record.host, line, "host")?, line)?;
    let root = hostname(&required(record.input, line, "input")?, line)?;
    let source = required(record.source, line, "source")?;
    let source = source.trim();
    if source.eq_ignore_ascii_case(IMPLICIT_SOURCE) {
        return Err(IngestError::ReservedSource {
            line,
            source_name: source.to_string(),
        });
    }

    Ok(DomainNode::new(host, root, source))
}

/// Parse one resolver result. Records without a timestamp take `default_timestamp`.
pub fn parse_dns_line(line: usize, text: &str, default_timestamp: &str) -> Result<DnsRecordNode> {
    let record: DnsLine =
        serde_json::from_str(text).map_err(|source| IngestError::Json { line, source })?;

    let host = hostname(&required(record.host, line, "host")?, line)?;
    let timestamp = record
        .timestamp
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| default_timestamp.to_string());
    let status_code = record.status_code.unwrap_or_else(|| "UNKNOWN".to_string());

    let mut node = DnsRecordNode::new(host, status_code, timestamp);
    let sets = [
        (RecordType::A, record.a),
        (RecordType::Aaaa, record.aaaa),
        (RecordType::Mx, record.mx),
        (RecordType::Ns, record.ns),
        (RecordType::Txt, record.txt),
        (RecordType::Cname, record.cname),
        (RecordType::Soa, record.soa),
        (RecordType::Ptr, record.ptr),
        (RecordType::Spf, record.spf),
        (RecordType::Dkim, record.dkim),
        (RecordType::Dmarc, record.dmarc),
    ];
    for (record_type, values) in sets {
        node.add_records(record_type, values.into_iter().map(value_to_string).collect());
    }

    Ok(node)
}

// SOA answers arrive as objects; keep them as compact JSON.
fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
