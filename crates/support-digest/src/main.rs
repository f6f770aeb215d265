//! support-digest CLI - summarize recent GitHub support issue activity into Slack digests.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use notify::Notifier;
use support_digest::config::env;
use support_digest::context::{MAX_HOURS_BACK, MAX_WORKERS};
use support_digest::{
    AIProvider, DigestConfig, DigestPipeline, GitHubClient, OpenAIProvider, Product, RunReport,
    SummaryEngine,
};

/// Support digest - scan support issues per product and post a categorized summary.
#[derive(Parser)]
#[command(name = "support-digest")]
#[command(about = "GitHub support issue digest for Slack")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build and deliver digests
    Run {
        /// Product shortname or label (default: PRODUCT_SHORTNAME, else every product)
        product: Option<String>,

        /// Team config file (default: CONFIG_FILE, else config.installers.json)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Lookback window in hours (default: HOURS_BACK, else config)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_HOURS_BACK)))]
        hours_back: Option<u32>,

        /// Print digests instead of posting them (also DRY_RUN)
        #[arg(long)]
        dry_run: bool,

        /// Concurrent requests per product (default: config)
        #[arg(long, value_parser = parse_max_workers)]
        max_workers: Option<usize>,
    },

    /// Validate team configuration files
    Validate {
        /// Team to validate (default: every config.*.json in the working directory)
        #[arg(long)]
        team: Option<String>,

        /// Also check the GitHub token and organization access
        #[arg(long)]
        check_github: bool,
    },
}

fn parse_max_workers(value: &str) -> Result<usize, String> {
    let workers: usize = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if (1..=MAX_WORKERS).contains(&workers) {
        Ok(workers)
    } else {
        Err(format!("must be between 1 and {MAX_WORKERS}"))
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("support_digest=debug,notify=debug,info")
        } else {
            EnvFilter::new("support_digest=info,notify=info,warn")
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let result = match cli.command {
        Commands::Run {
            product,
            config,
            hours_back,
            dry_run,
            max_workers,
        } => run(product, config, hours_back, dry_run, max_workers).await,
        Commands::Validate { team, check_github } => validate(team, check_github).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(
    product: Option<String>,
    config: Option<PathBuf>,
    hours_back: Option<u32>,
    dry_run: bool,
    max_workers: Option<usize>,
) -> Result<()> {
    let config_path = config.unwrap_or_else(env::config_path);
    load_env(&config_path)?;

    let config = DigestConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let products: Vec<Product> = match product.or_else(env::product) {
        Some(requested) => vec![config.resolve_product(&requested)?],
        None => config.products(),
    };

    let hours_back = match hours_back {
        Some(hours) => Some(hours),
        None => env::hours_back()?,
    };
    let ctx = config
        .defaults
        .run_context(Utc::now(), hours_back, max_workers);

    let dry_run = dry_run || env::flag(env::DRY_RUN_ENV);

    let github = GitHubClient::from_env().context("GitHub client unavailable")?;
    let provider = OpenAIProvider::from_env();
    if !provider.is_configured() {
        warn!(
            "{} not set, every entry will use its fallback summary",
            provider.api_key_env_var()
        );
    }
    let engine = SummaryEngine::new(Arc::new(provider)).context("Failed to load prompt templates")?;

    info!(
        products = products.len(),
        hours_back = ctx.hours_back,
        since = %ctx.since().format("%Y-%m-%d %H:%M UTC"),
        max_workers = ctx.max_workers,
        model = %ctx.model,
        dry_run,
        "Starting support digest"
    );

    let pipeline = DigestPipeline::new(Arc::new(github), engine)
        .with_notifier(Notifier::from_env(dry_run));
    let report = pipeline.run_all(&products, &ctx).await;

    print_run_summary(&report);

    if report.is_success() {
        Ok(())
    } else {
        let failed: Vec<&str> = report
            .failed_products()
            .map(|p| p.shortname.as_str())
            .collect();
        bail!(
            "{} product(s) failed to build ({}), {} delivery failure(s)",
            failed.len(),
            failed.join(", "),
            report.delivery_failures()
        )
    }
}

/// Load `.env.<team>` for the config file's team, then a plain `.env`.
fn load_env(config_path: &Path) -> Result<()> {
    if let Some(team) = env::team_name(config_path) {
        let dir = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        env::load_team_env(dir, &team)
            .with_context(|| format!("Failed to load environment for team '{team}'"))?;
    }
    dotenvy::dotenv().ok();
    Ok(())
}

fn print_run_summary(report: &RunReport) {
    println!();
    println!("{}", "Support digest summary".bold().underline());
    for outcome in &report.products {
        match &outcome.result {
            Ok(product) => {
                let stats = &product.stats;
                let status = if outcome.is_success() {
                    "ok".green()
                } else {
                    "delivery failed".red()
                };
                println!(
                    "  {} {}: {} entries ({} fallback), {} discarded, {}ms",
                    status,
                    outcome.shortname.cyan().bold(),
                    product.digest.entry_count(),
                    stats.fallbacks,
                    stats.discarded,
                    stats.elapsed_ms
                );
            }
            Err(e) => {
                println!("  {} {}: {e}", "failed".red().bold(), outcome.shortname.cyan().bold());
            }
        }
    }
}

async fn validate(team: Option<String>, check_github: bool) -> Result<()> {
    let dir = Path::new(".");
    let teams = match team {
        Some(team) => vec![team],
        None => env::discover_teams(dir),
    };

    if teams.is_empty() {
        bail!("No config.<team>.json files found in the working directory");
    }

    let mut all_valid = true;
    for team in &teams {
        println!();
        println!("{} {}", "Team:".bold(), team.cyan().bold());
        if !validate_team(dir, team, check_github).await {
            all_valid = false;
        }
    }

    println!();
    if all_valid {
        println!("{}", "All configurations are valid".green().bold());
        Ok(())
    } else {
        bail!("Configuration validation failed")
    }
}

async fn validate_team(dir: &Path, team: &str, check_github: bool) -> bool {
    match env::load_team_env(dir, team) {
        Ok(Some(path)) => println!("  {} Loaded environment from {}", "✓".green(), path.display()),
        Ok(None) => println!("  {} No .env.{team} file found", "!".yellow()),
        Err(e) => println!("  {} Could not load .env.{team}: {e}", "✗".red()),
    }

    let path = env::team_config_path(dir, team);
    let config = match DigestConfig::load(&path) {
        Ok(config) => config,
        Err(support_digest::ConfigError::Invalid { problems }) => {
            println!("  {} {} is invalid:", "✗".red(), path.display());
            for problem in problems {
                println!("      - {problem}");
            }
            return false;
        }
        Err(e) => {
            println!("  {} {e}", "✗".red());
            return false;
        }
    };
    println!("  {} {} loaded", "✓".green(), path.display());

    for (key, org) in &config.organizations {
        println!("  {} {} ({key})", "Organization".bold(), org.name);
        if !org.excluded_repos.is_empty() {
            println!("    Excluded repos: {}", org.excluded_repos.join(", "));
        }
        for (label, product) in &org.products {
            println!(
                "    {} {} [{}] {} -> {}",
                "✓".green(),
                product.name,
                product.shortname.cyan(),
                label,
                product.github_org
            );
            println!("        Labels: {}", product.issue_labels.join(", "));
        }
    }

    let defaults = &config.defaults;
    println!(
        "  {} hours_back={} max_workers={} model={} max_tokens={} timezone={}",
        "Defaults".bold(),
        defaults.hours_back,
        defaults.max_workers,
        defaults.openai_model,
        defaults.max_tokens,
        defaults.timezone
    );

    if check_github {
        let orgs: BTreeSet<String> = config.products().into_iter().map(|p| p.org).collect();
        return check_github_access(&orgs).await;
    }

    true
}

async fn check_github_access(orgs: &BTreeSet<String>) -> bool {
    let client = match GitHubClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            println!("  {} {e}, skipping GitHub access check", "!".yellow());
            return true;
        }
    };

    match client.authenticated_user().await {
        Ok(login) => println!("  {} GitHub token valid (authenticated as {login})", "✓".green()),
        Err(e) => {
            println!("  {} GitHub token invalid: {e}", "✗".red());
            return false;
        }
    }

    let mut ok = true;
    for org in orgs {
        match client.organization_name(org).await {
            Ok(name) => println!("    {} Can access organization {name}", "✓".green()),
            Err(e) => {
                println!("    {} Cannot access organization {org}: {e}", "✗".red());
                ok = false;
            }
        }
    }
    ok
}
