use crate::CLAP_STYLING;
use clap::{arg, command};

pub const DEFAULT_DB_PATH: &str = "~/.config/hostgraph/hostgraph.db";

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("hostgraph")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("hostgraph")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Enable debug logging").required(false))
        .arg(
            arg!(--"db" <PATH>)
                .required(false)
                .global(true)
                .help("Location of the hostgraph database")
                .default_value(DEFAULT_DB_PATH),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the hostgraph database on your filesystem")
                .arg(
                    arg!(-f --"force")
                        .help("Overwrite any existing database at the specified location.")
                        .required(false),
                ),
        )
        .subcommand(
            command!("ingest")
                .about("Ingest newline-delimited JSON produced by recon tools")
                .subcommand_required(true)
                .subcommand(
                    command!("subdomains")
                        .about(
                            "Ingest subdomain enumeration results ({\"host\", \"input\", \"source\"} \
                        per line). Builds the domain hierarchy.",
                        )
                        .arg(
                            arg!(-i --"input" <PATH>)
                                .required(true)
                                .help("Path to the JSONL file")
                                .value_parser(clap::value_parser!(std::path::PathBuf)),
                        )
                        .arg(
                            arg!(-p --"policy" <POLICY>)
                                .required(false)
                                .help("How to handle two tools disagreeing about a host")
                                .value_parser(["reject", "merge"])
                                .default_value("reject"),
                        )
                        .arg(
                            arg!(-l --"limit" <NUM_RECORDS>)
                                .required(false)
                                .help("Stop after this many records")
                                .value_parser(clap::value_parser!(usize)),
                        )
                        .arg(
                            arg!(--"dry-run")
                                .required(false)
                                .help("Build the graph in memory without touching the database")
                                .action(clap::ArgAction::SetTrue),
                        ),
                )
                .subcommand(
                    command!("dns")
                        .about(
                            "Ingest resolver results (dnsx JSON). Each record is attached to an \
                        already ingested domain.",
                        )
                        .arg(
                            arg!(-i --"input" <PATH>)
                                .required(true)
                                .help("Path to the JSONL file")
                                .value_parser(clap::value_parser!(std::path::PathBuf)),
                        )
                        .arg(
                            arg!(-l --"limit" <NUM_RECORDS>)
                                .required(false)
                                .help("Stop after this many records")
                                .value_parser(clap::value_parser!(usize)),
                        )
                        .arg(
                            arg!(--"timestamp" <RFC3339>)
                                .required(false)
                                .help("Snapshot time for records without one (default: now)"),
                        ),
                ),
        )
        .subcommand(
            command!("report")
                .about("Summarize the domain graph")
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, csv")
                        .value_parser(["text", "json", "csv"])
                        .default_value("text"),
                )
                .arg(
                    arg!(--"include-domains")
                        .required(false)
                        .help("Include every domain vertex in the report")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("tree")
                .about("Print the domain hierarchy as a tree")
                .arg(
                    arg!(-r --"root" <DOMAIN>)
                        .required(false)
                        .help("Only print the subtree under this domain"),
                ),
        )
        .subcommand(command!("conflicts").about("List recorded provenance conflicts"))
        .subcommand(command!("verify").about("Check the hierarchy for structural violations"))
        .subcommand(command!("runs").about("List ingestion runs"))
}
