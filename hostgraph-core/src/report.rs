// Report generation from the graph store

use crate::error::StoreResult;
use crate::map::{DomainMap, Violation};
use crate::model::{DomainVertex, ProvenanceConflict};
use crate::store::{EdgeType, GraphStore, VertexLabel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootSummary {
    pub host: String,
    pub descendants: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub domain_count: u64,
    pub subdomain_edge_count: u64,
    pub dns_record_count: u64,
    pub dns_edge_count: u64,
    pub explicit_count: u64,
    pub implicit_count: u64,
    /// Explicit observations per source tool.
    pub sources: BTreeMap<String, u64>,
    pub roots: Vec<RootSummary>,
    pub conflicts: Vec<ProvenanceConflict>,
    pub violations: Vec<Violation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<DomainVertex>>,
}

pub fn gather_report_data<S: GraphStore + ?Sized>(
    store: &S,
    include_domains: bool,
) -> StoreResult<ReportData> {
    let domains = store.domains()?;
    let map = DomainMap::load(store)?;

    let explicit_count = domains.iter().filter(|d| !d.is_implicit).count() as u64;
    let mut sources = BTreeMap::new();
    for domain in &domains {
        for source in &domain.sources {
            *sources.entry(source.clone()).or_insert(0) += 1;
        }
    }

    let roots = map
        .roots()
        .into_iter()
        .map(|root| RootSummary {
            host: root.host.clone(),
            descendants: map.descendant_count(&root.host),
        })
        .collect();

    Ok(ReportData {
        domain_count: store.count(VertexLabel::Domain)?,
        subdomain_edge_count: store.count_edges(EdgeType::HasSubdomain)?,
        dns_record_count: store.count(VertexLabel::DnsRecord)?,
        dns_edge_count: store.count_edges(EdgeType::HasDnsRecord)?,
        explicit_count,
        implicit_count: domains.len() as u64 - explicit_count,
        sources,
        roots,
        conflicts: store.conflicts()?,
        violations: map.verify(),
        domains: include_domains.then_some(domains),
    })
}

pub fn generate_report(data: &ReportData, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(data)),
        ReportFormat::Json => generate_json_report(data),
        ReportFormat::Csv => Ok(generate_csv_report(data)),
    }
}

pub fn generate_text_report(data: &ReportData) -> String {
    let mut report = String::new();

    report.push_str(RULE);
    report.push_str("                          HOSTGRAPH DOMAIN REPORT\n");
    report.push_str(RULE);
    report.push('\n');

    report.push_str(&format!("Domains:        {}\n", data.domain_count));
    report.push_str(&format!("  Explicit:     {}\n", data.explicit_count));
    report.push_str(&format!("  Implicit:     {}\n", data.implicit_count));
    report.push_str(&format!("Subdomain edges: {}\n", data.subdomain_edge_count));
    report.push_str(&format!("DNS snapshots:  {}\n", data.dns_record_count));
    report.push_str(&format!("Conflicts:      {}\n", data.conflicts.len()));
    report.push('\n');

    if !data.roots.is_empty() {
        report.push_str(RULE);
        report.push_str("ROOTS\n");
        report.push_str(RULE);
        report.push('\n');
        for root in &data.roots {
            report.push_str(&format!("  {:<40} {} subdomains\n", root.host, root.descendants));
        }
        report.push('\n');
    }

    if !data.sources.is_empty() {
        report.push_str(RULE);
        report.push_str("SOURCES\n");
        report.push_str(RULE);
        report.push('\n');
        for (source, count) in &data.sources {
            report.push_str(&format!("  {:<24} {}\n", source, count));
        }
        report.push('\n');
    }

    if !data.conflicts.is_empty() {
        report.push_str(RULE);
        report.push_str("PROVENANCE CONFLICTS\n");
        report.push_str(RULE);
        report.push('\n');
        for conflict in &data.conflicts {
            report.push_str(&format!(
                "  [{}] {}: {} ({}) vs {} ({})\n",
                conflict.resolution.as_str().to_uppercase(),
                conflict.host,
                conflict.existing_source,
                conflict.existing_root,
                conflict.incoming_source,
                conflict.incoming_root
            ));
        }
        report.push('\n');
    }

    if !data.violations.is_empty() {
        report.push_str(RULE);
        report.push_str("INTEGRITY VIOLATIONS\n");
        report.push_str(RULE);
        report.push('\n');
        for violation in &data.violations {
            report.push_str(&format!("  {}\n", format_violation(violation)));
        }
        report.push('\n');
    }

    report
}

pub fn generate_json_report(data: &ReportData) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "hostgraph",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json",
            },
            "data": data,
        }
    });
    serde_json::to_string_pretty(&json_report)
}

/// One row per domain; empty body when domains were not gathered.
pub fn generate_csv_report(data: &ReportData) -> String {
    let mut csv = String::from("host,root,source,sources,is_implicit,is_root,first_seen,last_seen\n");
    for domain in data.domains.iter().flatten() {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            escape_csv(&domain.host),
            escape_csv(&domain.root),
            escape_csv(&domain.source),
            escape_csv(&domain.sources.join(";")),
            domain.is_implicit,
            domain.is_root,
            domain.first_seen,
            domain.last_seen
        ));
    }
    csv
}

fn escape_csv(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn format_violation(violation: &Violation) -> String {
    match violation {
        Violation::Orphan(host) => format!("{host} has no parent edge"),
        Violation::MultipleParents { host, parents } => {
            format!("{host} has {} parents: {}", parents.len(), parents.join(", "))
        }
        Violation::WrongParent { parent, child } => {
            format!("{parent} -> {child} does not follow the label hierarchy")
        }
        Violation::DanglingEdge { from, to } => format!("{from} -> {to} references a missing domain"),
        Violation::Cycle => "the subdomain graph contains a cycle".to_string(),
    }
}
