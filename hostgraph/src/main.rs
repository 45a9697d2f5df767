use colored::Colorize;
use hostgraph::command_argument_builder;
use hostgraph::handlers::{
    handle_conflicts, handle_ingest_dns, handle_ingest_subdomains, handle_init, handle_report,
    handle_runs, handle_tree, handle_verify,
};
use hostgraph_core::print_banner;
use tracing::Level;

fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let verbose = chosen_command.get_flag("verbose");

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .init();

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    let result = match chosen_command.subcommand() {
        // No subcommand provided, just show the banner
        None => return,
        Some(("init", primary_command)) => handle_init(primary_command),
        Some(("ingest", primary_command)) => match primary_command.subcommand() {
            Some(("subdomains", secondary_command)) => handle_ingest_subdomains(secondary_command),
            Some(("dns", secondary_command)) => handle_ingest_dns(secondary_command),
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("report", primary_command)) => handle_report(primary_command),
        Some(("tree", primary_command)) => handle_tree(primary_command),
        Some(("conflicts", primary_command)) => handle_conflicts(primary_command),
        Some(("verify", primary_command)) => handle_verify(primary_command),
        Some(("runs", primary_command)) => handle_runs(primary_command),
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
