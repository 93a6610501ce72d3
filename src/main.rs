//! ghstat - GitHub activity rendered as SVG stat cards
//!
//! Aggregates an account's repositories, languages, traffic, line changes
//! and contributions through the GitHub API and writes overview and
//! language cards.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (invalid arguments, credentials, failed aggregation)

mod cli;
mod config;
mod github;
mod models;
mod report;
mod stats;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use github::GitHubClient;
use indicatif::{ProgressBar, ProgressStyle};
use stats::Aggregator;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("ghstat v{}", env!("CARGO_PKG_VERSION"));
    debug!("Output directory: {}", args.output.display());

    if let Err(e) = run(args).await {
        error!("Run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

/// Handle --init-config: generate a default .ghstat.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    std::fs::write(path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to set the login, filters and outputs.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Pick the access token: ACCESS_TOKEN if GitHub accepts it, else GITHUB_TOKEN.
async fn resolve_token(args: &Args, api_url: &str) -> Result<String> {
    if let Some(token) = non_empty(&args.token) {
        let candidate = GitHubClient::with_api_url(token, api_url)?;
        if candidate.is_token_valid().await {
            return Ok(token.to_string());
        }
        warn!("Access token was rejected, falling back to GITHUB_TOKEN");
    }

    non_empty(&args.github_token)
        .map(str::to_string)
        .context("No usable token: set --token / ACCESS_TOKEN or GITHUB_TOKEN")
}

fn spinner(quiet: bool, login: &str) -> Option<ProgressBar> {
    if quiet {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(format!("Collecting statistics for {}...", login));
    pb.enable_steady_tick(Duration::from_millis(120));
    Some(pb)
}

/// Run the complete aggregation workflow.
async fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let login = config
        .login()
        .context("No login given: use --user or set CUSTOM_ACTOR / GITHUB_ACTOR")?
        .to_string();

    let token = resolve_token(&args, &config.account.api_url).await?;
    let client = GitHubClient::with_api_url(token, config.account.api_url.clone())?;

    let cancel = CancellationToken::new();
    let engine = Aggregator::new(Arc::new(client), config.engine_config(&login))?
        .with_cancellation(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling outstanding requests");
            cancel.cancel();
        }
    });

    println!("📊 Aggregating GitHub statistics for {}", login);
    let progress = spinner(args.quiet, &login);
    let result = engine.collect().await;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let stats = result.context("Failed to get stats")?;

    let output_dir = Path::new(&config.output.directory);
    match report::write_outputs(&stats, output_dir, config.output.animation, config.output.debug) {
        Ok(written) => {
            for path in written {
                info!("Wrote {}", path.display());
            }
        }
        Err(e) => error!("Failed to save stats: {:#}", e),
    }

    if let Some(url) = config.webhook_url() {
        if let Err(e) = report::send_webhook(url, &stats, &config).await {
            error!("Failed to send webhook: {:#}", e);
        }
    }

    println!("\n📈 Summary for {}:", stats.name);
    println!("   Stars: {} | Forks: {}", stats.stargazers, stats.forks);
    println!(
        "   Repositories: {} | Languages: {}",
        stats.repos_count(),
        stats.languages.len()
    );
    println!(
        "   All-time contributions: {}",
        stats.contributions.total_contributions
    );
    if stats.line_changes.is_some() {
        println!("   Lines changed: {}", stats.lines_changed());
    }
    if let Some(views) = stats.views {
        println!("   Views (past two weeks): {}", views.count);
    }
    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    println!("\n✅ Cards saved to: {}", output_dir.display());

    Ok(())
}
