mod config;
mod report;
mod table;

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use job_dashboard::{dates, faults, Dashboard, Filters};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "job-dashboard",
    version,
    about = "Job lifecycle KPIs from ICT service-desk and D+ field-job exports",
    long_about = "\
Reads one or more ticket/job exports (CSV or Excel), detects whether they are\n\
ICT or D+ reports, de-duplicates jobs by id and reports MTTA/MTTI/MTTR, FTR,\n\
SLA, monthly trends, breakdowns, pending work and rejected rows.\n\
The `faults` command ranks fault/cause/solution scenarios from detailed\n\
fault reports."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Debug logging (RUST_LOG overrides).
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the KPI dashboard for one report type.
    Dashboard(DashboardArgs),
    /// Top fault scenarios from detailed fault reports.
    Faults(FaultsArgs),
}

#[derive(Args, Debug)]
struct DashboardArgs {
    /// Export files of the same report; later files repeat the first file's header.
    #[arg(long, required = true, num_args = 1.., value_name = "FILE")]
    input: Vec<PathBuf>,

    /// Only tickets of this technician/engineer ("All" for everyone).
    #[arg(long, value_name = "NAME")]
    technician: Option<String>,

    /// Only this category (ICT) or department (D+).
    #[arg(long, value_name = "NAME")]
    category: Option<String>,

    /// Only tickets finished in this month, e.g. "Jan'25".
    #[arg(long, value_name = "MON'YY")]
    month: Option<String>,

    /// JSON filter file with optional technician/category/month keys;
    /// command-line filters take precedence.
    #[arg(long, value_name = "FILE")]
    filters: Option<PathBuf>,

    /// Reference time for pending durations, e.g. "31/01/2025 17:00".
    /// Defaults to the local clock.
    #[arg(long, value_name = "DATETIME")]
    now: Option<String>,

    /// Output path: .xlsx writes a workbook, anything else JSON.
    /// JSON goes to stdout when omitted.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct FaultsArgs {
    /// Detailed fault report files, each with its own header row.
    #[arg(long, required = true, num_args = 1.., value_name = "FILE")]
    input: Vec<PathBuf>,

    /// Output path: .xlsx writes a workbook, anything else JSON.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn reference_time(raw: Option<&str>) -> Result<NaiveDateTime> {
    match raw {
        Some(s) => dates::parse_date(s).with_context(|| format!("cannot parse --now value: {s}")),
        None => Ok(chrono::Local::now().naive_local()),
    }
}

fn resolve_filters(args: &DashboardArgs) -> Result<Filters> {
    let from_file = match &args.filters {
        Some(p) => config::load_filters(p).context("failed to load filter file")?,
        None => Filters::default(),
    };
    let from_cli = Filters {
        technician: args.technician.clone(),
        category: args.category.clone(),
        month: args.month.clone(),
    };
    Ok(from_file.overridden_by(from_cli))
}

fn run_dashboard(args: DashboardArgs) -> Result<()> {
    let now = reference_time(args.now.as_deref())?;
    let filters = resolve_filters(&args)?;

    let tables = table::load_all(&args.input)?;
    let combined = table::combine(tables)?;
    let dashboard = Dashboard::load(combined, now).context("failed to process the export")?;
    tracing::info!(report = %dashboard.report_kind(), "loaded");
    if !dashboard.has_tickets() { bail!("No valid tickets found"); }

    let result = dashboard.render(&filters);

    match args.output.as_deref() {
        Some(path) if report::is_workbook_path(path) => report::write_dashboard_workbook(&result, path)
            .with_context(|| format!("failed to write {}", path.display()))?,
        other => report::write_json(&result, other)?,
    }
    if let Some(path) = &args.output { println!("{}", path.display()); }
    Ok(())
}

fn run_faults(args: FaultsArgs) -> Result<()> {
    let tables = table::load_all(&args.input)?;
    let scenarios = faults::analyze(&tables).context("fault analysis failed")?;
    match args.output.as_deref() {
        Some(path) if report::is_workbook_path(path) => report::write_faults_workbook(&scenarios, path)
            .with_context(|| format!("failed to write {}", path.display()))?,
        other => report::write_json(&scenarios, other)?,
    }
    if let Some(path) = &args.output { println!("{}", path.display()); }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Command::Dashboard(args) => run_dashboard(args),
        Command::Faults(args) => run_faults(args),
    }
}
