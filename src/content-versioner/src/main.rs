//! Content Versioner — replays a script of content edits through the
//! versioning policy and reports one JSON line per step on stdout.

mod script;

use clap::Parser;
use mktops_core::config::AppConfig;
use mktops_versioning::{
    AuthoringService, InMemoryContentStore, InMemoryMembershipDirectory, SessionIdentityResolver, VersioningPolicy,
};
use script::{EditScript, StepOutcome};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "content-versioner")]
#[command(about = "Apply marketing content edits as immutable, numbered versions")]
#[command(version)]
struct Cli {
    /// JSON edit script to apply
    #[arg(long)]
    script: PathBuf,

    /// TOML config file (environment variables still override it)
    #[arg(long, env = "MKTOPS_CONFIG")]
    config: Option<PathBuf>,

    /// Attempts per edit when a version conflict occurs (overrides config)
    #[arg(long, env = "MKTOPS__VERSIONING__MAX_CONFLICT_ATTEMPTS")]
    max_conflict_attempts: Option<u32>,

    /// Start from the demo content items
    #[arg(long, default_value_t = false)]
    seed_demo_data: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the step reports.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "content_versioner=info,mktops_versioning=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config.as_deref() {
        // An explicit config file must load.
        Some(path) => AppConfig::load_from(Some(path))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load config, using defaults");
            AppConfig::default()
        }),
    };

    if let Some(attempts) = cli.max_conflict_attempts {
        config.versioning.max_conflict_attempts = attempts.max(1);
    }
    if cli.seed_demo_data {
        config.store.seed_demo_data = true;
    }

    info!(
        service = %config.service_name,
        max_conflict_attempts = config.versioning.max_conflict_attempts,
        seed_demo_data = config.store.seed_demo_data,
        sessions = config.auth.sessions.len(),
        "Configuration loaded"
    );

    let store = Arc::new(if config.store.seed_demo_data {
        InMemoryContentStore::with_demo_data()
    } else {
        InMemoryContentStore::new()
    });
    let policy = Arc::new(VersioningPolicy::new(store, &config.versioning));
    let service = AuthoringService::new(
        policy,
        Arc::new(SessionIdentityResolver::from_config(&config.auth)),
        Arc::new(InMemoryMembershipDirectory::from_config(&config.auth)),
    );

    let script = EditScript::from_path(&cli.script)?;
    info!(
        items = script.items.len(),
        edits = script.edits.len(),
        path = %cli.script.display(),
        "Applying edit script"
    );

    let reports = script.run(&service).await;
    let (mut created, mut unchanged, mut failed) = (0usize, 0usize, 0usize);
    for report in &reports {
        match report.outcome {
            StepOutcome::Created { .. } => created += 1,
            StepOutcome::Unchanged { .. } => unchanged += 1,
            StepOutcome::Error { .. } => failed += 1,
            StepOutcome::ItemCreated => {}
        }
        println!("{}", serde_json::to_string(report)?);
    }

    info!(created, unchanged, failed, "Edit script applied");
    Ok(())
}
