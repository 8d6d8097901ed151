//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use jobsweep_core::{Pipeline, ProgressReporter, RunOutcome, RunReport, RunRequest, Stage};
use jobsweep_shared::{AppConfig, RegistryStats, Tier, init_config, load_config, load_config_from};
use jobsweep_sources::TierSummary;
use jobsweep_storage::open_registry;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// jobsweep: find new accounts-payable job postings across job boards.
#[derive(Parser)]
#[command(
    name = "jobsweep",
    version,
    about = "Acquire, normalize, dedupe, and deliver US accounts-payable job postings.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.jobsweep/jobsweep.toml).
    #[arg(long = "config", global = true)]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the pipeline once.
    Run {
        /// Tiers to run: 1 (Google Jobs), 2 (JSearch), 3 (niche boards).
        #[arg(long = "tier", num_args = 1..)]
        tiers: Vec<Tier>,

        /// Override the configured search keywords.
        #[arg(long = "keyword")]
        keywords: Vec<String>,

        /// Override the configured search locations.
        #[arg(long = "location")]
        locations: Vec<String>,

        /// Skip the sink and registry; log what would be written.
        #[arg(long)]
        dry_run: bool,

        /// Wall-clock limit in seconds (0 disables).
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Show dedup registry statistics.
    Stats,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "jobsweep=info",
        1 => "jobsweep=debug",
        _ => "jobsweep=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_file.as_deref();
    match cli.command {
        Command::Run {
            tiers,
            keywords,
            locations,
            dry_run,
            timeout,
        } => {
            let config = resolve_config(config_path)?;
            let mut request = RunRequest::from_config(&config);
            if !tiers.is_empty() {
                request.tiers = tiers;
            }
            if !keywords.is_empty() {
                request.keywords = keywords;
            }
            if !locations.is_empty() {
                request.locations = locations;
            }
            if let Some(secs) = timeout {
                request.timeout = (secs > 0).then(|| Duration::from_secs(secs));
            }
            request.dry_run = dry_run;
            cmd_run(&config, &request).await
        }
        Command::Stats => cmd_stats(config_path).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config: &AppConfig, request: &RunRequest) -> Result<()> {
    info!(
        tiers = request.tiers.len(),
        keywords = request.keywords.len(),
        locations = request.locations.len(),
        dry_run = request.dry_run,
        "starting jobsweep run"
    );

    let pipeline = Pipeline::from_config(config).await?;
    let reporter = CliProgress::new();
    let report = pipeline.run(request, &reporter).await?;

    print_report(&report);
    Ok(())
}

async fn cmd_stats(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let registry = open_registry(&config.registry).await?;
    let stats = registry.stats().await?;

    println!();
    print_stats(&stats);
    println!();
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_report(report: &RunReport) {
    let c = &report.counts;

    println!();
    match &report.outcome {
        RunOutcome::Delivered { .. } => println!("  Run complete!"),
        RunOutcome::SinkUnavailable | RunOutcome::NotWritten => {
            println!("  Run finished without delivering postings.")
        }
        _ => println!("  Run finished."),
    }
    println!("  Run:        {}", report.run_id);
    println!("  Outcome:    {}", report.outcome);
    println!("  Acquired:   {}", c.raw);
    println!("  Normalized: {}", c.normalized);
    println!("  US:         {}", c.us);
    println!("  New:        {}", c.new);
    println!("  Written:    {}", c.written);
    println!("  Committed:  {}", c.committed);
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());

    if !report.tiers.is_empty() {
        println!();
        for tier in &report.tiers {
            println!("  {}", tier_line(tier));
        }
    }

    if !report.acquisition_errors.is_empty() {
        println!();
        println!("  {} failed searches:", report.acquisition_errors.len());
        for (label, error) in &report.acquisition_errors {
            println!("    {label}: {error}");
        }
    }

    if let Some(stats) = &report.registry {
        println!();
        print_stats(stats);
    }
    println!();
}

fn print_stats(stats: &RegistryStats) {
    println!("  Registry total:   {}", stats.total);
    println!("  Unique companies: {}", stats.unique_companies);
    println!("  Unique sources:   {}", stats.unique_sources);
    for (source, count) in &stats.by_source {
        println!("    {source:<24} {count}");
    }
}

fn tier_line(summary: &TierSummary) -> String {
    if summary.skipped {
        return format!("{}: skipped (not configured)", summary.tier);
    }
    format!(
        "{}: {} postings from {}/{} searches in {:.1}s",
        summary.tier,
        summary.records,
        summary.succeeded,
        summary.combinations,
        summary.elapsed.as_secs_f64()
    )
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn stage(&self, stage: Stage) {
        self.spinner.set_message(stage.to_string());
    }

    fn tier_progress(&self, summary: &TierSummary) {
        self.spinner.println(format!("  {}", tier_line(summary)));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}
