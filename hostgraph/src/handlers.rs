use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use hostgraph_core::data::{Database, RunKind, RunStatus};
use hostgraph_core::map::DomainMap;
use hostgraph_core::report::{ReportFormat, format_violation, gather_report_data, generate_report};
use hostgraph_core::{ConflictPolicy, GraphStore, GraphSynchronizer, MemoryStore};
use hostgraph_ingest::{
    IngestError, IngestOptions, IngestProgressCallback, IngestSummary, ingest_dns_file,
    ingest_subdomains_file,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// Helper functions

/// Expand `~` in the configured database location.
pub fn resolve_db_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Open an existing database, refusing to create one implicitly.
pub fn open_database(path: &Path) -> Result<Database> {
    if !Database::exists(path) {
        bail!(
            "No database at {}. Run `hostgraph init` first.",
            path.display()
        );
    }
    Database::new(path).with_context(|| format!("Failed to open database {}", path.display()))
}

pub fn parse_policy(value: &str) -> Result<ConflictPolicy> {
    ConflictPolicy::from_str(value).with_context(|| format!("Unknown conflict policy '{value}'"))
}

/// Render the whole forest, or the subtree under `root` when given.
pub fn render_forest<S: GraphStore + ?Sized>(store: &S, root: Option<&str>) -> Result<String> {
    let map = DomainMap::load(store)?;
    if let Some(root) = root {
        if map.get(root).is_none() {
            bail!("Domain {root} is not in the graph");
        }
        return Ok(map.render_tree(root));
    }

    let mut out = String::new();
    for root in map.roots() {
        out.push_str(&map.render_tree(&root.host));
        out.push('\n');
    }
    Ok(out)
}

pub fn format_summary(summary: &IngestSummary) -> String {
    format!(
        "records: {}  synced: {}  skipped: {}  conflicts: {}  errors: {}  new vertices: {}",
        summary.records,
        summary.synced,
        summary.skipped,
        summary.conflicts,
        summary.errors,
        summary.vertices_created
    )
}

/// Write to `output` if given, otherwise to stdout.
pub fn write_output(content: &str, output: Option<&PathBuf>) -> Result<()> {
    match output {
        Some(path) => fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            print!("{content}");
            Ok(())
        }
    }
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().to_lowercase())
}

fn db_path_arg(args: &ArgMatches) -> PathBuf {
    let raw = args
        .get_one::<String>("db")
        .map(String::as_str)
        .unwrap_or(crate::commands::DEFAULT_DB_PATH);
    resolve_db_path(raw)
}

fn progress_spinner(label: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(label.to_string());
    spinner
}

fn spinner_callback(spinner: &ProgressBar) -> IngestProgressCallback {
    let spinner = spinner.clone();
    Arc::new(move |summary: &IngestSummary| {
        spinner.set_message(format!(
            "{} records, {} synced, {} skipped",
            summary.records, summary.synced, summary.skipped
        ));
    })
}

fn print_ingest_result(summary: &IngestSummary) {
    println!("{} Ingestion complete", "✓".green().bold());
    println!("  {}", format_summary(summary));
    if summary.conflicts > 0 {
        println!(
            "  {} {} provenance conflict(s), see `hostgraph conflicts`",
            "⚠".yellow().bold(),
            summary.conflicts
        );
    }
}

// Handlers

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    print_divider();
    println!("{}", "  HOSTGRAPH INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let force = args.get_flag("force");
    let db_path = db_path_arg(args);
    let config_dir = db_path
        .parent()
        .context("Invalid database path")?
        .to_path_buf();

    println!(
        "{} Target: {}",
        "→".blue(),
        db_path.display().to_string().bright_white()
    );
    println!();

    if Database::exists(&db_path) {
        let overwrite = if force {
            true
        } else {
            println!("{}", "⚠ WARNING".yellow().bold());
            println!("Database already exists at:");
            println!(
                "  {} {}",
                "•".yellow(),
                db_path.display().to_string().bright_white()
            );
            println!();
            let response = print_prompt("Would you like to overwrite it? [y/N]:")?;
            println!();
            response == "y" || response == "yes"
        };

        if !overwrite {
            println!("{} Keeping existing database", "→".blue());
            return Ok(());
        }
        Database::drop(&db_path)
            .with_context(|| format!("Failed to remove {}", db_path.display()))?;
        println!("{} Existing database removed", "✓".green().bold());
    }

    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;
    println!("{} Creating database...", "→".blue());
    Database::new(&db_path).context("Failed to create database")?;

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    println!(
        "{} Database: {}",
        "✓".green().bold(),
        db_path.display().to_string().bright_white()
    );
    println!();
    Ok(())
}

pub fn handle_ingest_subdomains(args: &ArgMatches) -> Result<()> {
    let input = args
        .get_one::<PathBuf>("input")
        .context("--input is required")?;
    let policy = parse_policy(
        args.get_one::<String>("policy")
            .map(String::as_str)
            .unwrap_or("reject"),
    )?;
    let options = IngestOptions {
        limit: args.get_one::<usize>("limit").copied(),
        ..IngestOptions::default()
    };
    let dry_run = args.get_flag("dry-run");

    println!(
        "\n🌐 Ingesting subdomains from {} (policy: {}{})\n",
        input.display(),
        policy.as_str(),
        if dry_run { ", dry run" } else { "" }
    );

    let spinner = progress_spinner("Starting ingestion...");
    let callback = spinner_callback(&spinner);

    if dry_run {
        let synchronizer = GraphSynchronizer::new(MemoryStore::new(), policy);
        let summary = ingest_subdomains_file(input, &synchronizer, &options, Some(&callback));
        spinner.finish_and_clear();
        let summary = summary?;
        print_ingest_result(&summary);

        let store = synchronizer.into_inner()?;
        println!();
        print!("{}", render_forest(&store, None)?);
        return Ok(());
    }

    let db = open_database(&db_path_arg(args))?;
    let run_id = db.create_run(RunKind::Subdomains, &input.display().to_string())?;
    let synchronizer = GraphSynchronizer::new(db, policy);
    let result = ingest_subdomains_file(input, &synchronizer, &options, Some(&callback));
    spinner.finish_and_clear();

    let db = synchronizer.into_inner()?;
    finish_run(&db, &run_id, result)
}

pub fn handle_ingest_dns(args: &ArgMatches) -> Result<()> {
    let input = args
        .get_one::<PathBuf>("input")
        .context("--input is required")?;
    let mut options = IngestOptions {
        limit: args.get_one::<usize>("limit").copied(),
        ..IngestOptions::default()
    };
    if let Some(timestamp) = args.get_one::<String>("timestamp") {
        options.snapshot_time = timestamp.clone();
    }

    println!("\n📡 Ingesting DNS records from {}\n", input.display());

    let db = open_database(&db_path_arg(args))?;
    let run_id = db.create_run(RunKind::Dns, &input.display().to_string())?;

    let spinner = progress_spinner("Starting ingestion...");
    let callback = spinner_callback(&spinner);
    let synchronizer = GraphSynchronizer::new(db, ConflictPolicy::default());
    let result = ingest_dns_file(input, &synchronizer, &options, Some(&callback));
    spinner.finish_and_clear();

    let db = synchronizer.into_inner()?;
    finish_run(&db, &run_id, result)
}

/// Close the run record, keeping whatever counts an aborted batch reached.
pub fn finish_run(
    db: &Database,
    run_id: &str,
    result: std::result::Result<IngestSummary, IngestError>,
) -> Result<()> {
    match result {
        Ok(summary) => {
            db.complete_run(run_id, &summary.run_stats())?;
            print_ingest_result(&summary);
            Ok(())
        }
        Err(e) => {
            let stats = e
                .partial_summary()
                .map(IngestSummary::run_stats)
                .unwrap_or_default();
            db.fail_run(run_id, &stats)?;
            Err(e).context("Ingestion failed")
        }
    }
}

pub fn handle_report(args: &ArgMatches) -> Result<()> {
    let format_str = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");
    let format = ReportFormat::from_str(format_str)
        .with_context(|| format!("Unknown report format '{format_str}'"))?;
    let include_domains = args.get_flag("include-domains") || format == ReportFormat::Csv;
    let output = args.get_one::<PathBuf>("output");

    let db = open_database(&db_path_arg(args))?;
    let data = gather_report_data(&db, include_domains)?;
    let report = generate_report(&data, format)?;
    write_output(&report, output)?;

    if let Some(path) = output {
        println!(
            "{} Report written to {}",
            "✓".green().bold(),
            path.display().to_string().bright_white()
        );
    }
    Ok(())
}

pub fn handle_tree(args: &ArgMatches) -> Result<()> {
    let db = open_database(&db_path_arg(args))?;
    let root = args.get_one::<String>("root").map(String::as_str);
    print!("{}", render_forest(&db, root)?);
    Ok(())
}

pub fn handle_conflicts(args: &ArgMatches) -> Result<()> {
    let db = open_database(&db_path_arg(args))?;
    let conflicts = db.conflicts()?;
    if conflicts.is_empty() {
        println!("{} No provenance conflicts recorded", "✓".green().bold());
        return Ok(());
    }

    for conflict in conflicts {
        println!(
            "{} {} {} ({}) {} {} ({})",
            format!("[{}]", conflict.resolution.as_str()).yellow().bold(),
            conflict.host.bright_white(),
            conflict.existing_source,
            conflict.existing_root,
            "vs".bright_black(),
            conflict.incoming_source,
            conflict.incoming_root
        );
    }
    Ok(())
}

pub fn handle_verify(args: &ArgMatches) -> Result<()> {
    let db = open_database(&db_path_arg(args))?;
    let map = DomainMap::load(&db)?;
    let violations = map.verify();

    if violations.is_empty() {
        println!(
            "{} {} domains, {} edges, no violations",
            "✓".green().bold(),
            map.node_count(),
            map.edge_count()
        );
        return Ok(());
    }

    for violation in &violations {
        println!("{} {}", "✗".red().bold(), format_violation(violation));
    }
    bail!("{} violation(s) found", violations.len())
}

pub fn handle_runs(args: &ArgMatches) -> Result<()> {
    let db = open_database(&db_path_arg(args))?;
    for run in db.list_runs()? {
        let status = match run.status {
            RunStatus::Completed => run.status.as_str().green(),
            RunStatus::Running => run.status.as_str().yellow(),
            RunStatus::Failed => run.status.as_str().red(),
        };
        println!(
            "{} {:<10} {:<10} {}  synced: {}  skipped: {}  conflicts: {}  errors: {}",
            run.id.bright_black(),
            run.kind,
            status,
            run.input_path,
            run.stats.synced,
            run.stats.skipped,
            run.stats.conflicts,
            run.stats.errors
        );
    }
    Ok(())
}
