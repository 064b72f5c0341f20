mod check;
mod config;
mod diff;
mod github;
mod notify;
mod policy;

use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use policy::types::{CiState, Decision, PrRef, PrSnapshot, GATE_LABEL};

/// boopcheck: review-gate bot that keeps pull requests small and reviewable.
///
/// Polls GitHub for open PRs carrying the `boop` gate label, scores each diff
/// for review burden, and applies the matching label transition and comment.
#[derive(Parser, Debug)]
#[command(name = "boopcheck", version, about)]
struct Cli {
    /// Run a single check cycle and exit instead of polling
    #[arg(long)]
    once: bool,

    /// Evaluate and log decisions without mutating anything on GitHub
    #[arg(long)]
    dry_run: bool,

    /// Config file path (defaults to .boopcheck.toml in the current directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Evaluate a local diff file and print the decision (no GitHub token needed)
    #[arg(long)]
    diff: Option<PathBuf>,

    /// Title to check conventions like `[refactor]` against in --diff mode
    #[arg(long, default_value = "")]
    title: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => config::Config::load_from(path)?,
        None => config::Config::load()?,
    };

    if let Some(diff_path) = cli.diff.as_deref() {
        return evaluate_offline(diff_path, &cli.title, &config);
    }

    let token = config
        .github_token()
        .ok_or(github::GitHubError::MissingToken)?;
    let client = github::GitHubClient::new(token, config.api_url());

    if cli.once {
        check::run_once(&client, &config, cli.dry_run).await?;
        return Ok(());
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(config.poll.interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval_secs = config.poll.interval_secs, "starting poll loop");
    loop {
        ticker.tick().await;
        if let Err(err) = check::run_once(&client, &config, cli.dry_run).await {
            // A failed cycle is retried at the next tick; only per-PR
            // failures are isolated inside run_once.
            error!(error = %err, "boop check cycle failed");
        }
    }
}

/// Evaluate a diff from disk against a synthetic gate-open snapshot: the
/// offline analog of one poll cycle, handy for trying out thresholds.
fn evaluate_offline(
    path: &Path,
    title: &str,
    config: &config::Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let diff_text = std::fs::read_to_string(path)?;
    let cost = diff::cost(&diff_text);
    let files = diff::classify(&diff_text);

    let snapshot = PrSnapshot {
        pr: PrRef {
            owner: "local".to_string(),
            repo: "local".to_string(),
            number: 0,
        },
        title: title.to_string(),
        body: String::new(),
        labels: [GATE_LABEL.to_string()].into_iter().collect(),
        mergeable: None,
        merged: false,
        ci_state: CiState::None,
        reviews: vec![],
        diff_text,
    };
    let evaluation = policy::evaluate(&snapshot, cost, &files, &config.policy);

    println!("cost: {}", cost.to_string().bold());
    println!(
        "touched deps: {}   touched non-deps: {}",
        files.touched_deps, files.touched_non_deps
    );
    match &evaluation.primary {
        Decision::None => println!("decision: {}", "leave alone".green()),
        Decision::Unboop { reason, preboop } => {
            let verb = if *preboop { "unboop into preboop" } else { "unboop" };
            println!("decision: {}: {}", verb.red().bold(), reason);
        }
        Decision::Warn { label, message } => {
            println!("decision: {} `{}`", "warn".yellow().bold(), label);
            println!("{}", message);
        }
        Decision::Demote { label, message } => {
            println!("decision: {} `{}`", "demote".red().bold(), label);
            println!("{}", message);
        }
    }
    Ok(())
}
