//! Shopwatch CLI
//!
//! Local execution entry point: one invocation is one watch run.
//! Scheduling (cron, CI workflows) lives outside this binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shopwatch::{
    error::Result,
    models::Config,
    notify::{LogNotifier, Notifier},
    pipeline,
    storage::{JsonStateStore, StateStore},
};

/// shopwatch - Storefront Catalog Watcher
#[derive(Parser, Debug)]
#[command(name = "shopwatch", version, about = "Storefront catalog change watcher")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Path to the persisted state file
    #[arg(short, long, default_value = "state.json")]
    state: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch all targets, diff against state, report changes
    Run {
        /// Detect and print changes without saving state or notifying
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Show a summary of the persisted state
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Build the notifier: SMTP when configured and compiled in, else log.
fn build_notifier(config: &Config) -> Box<dyn Notifier> {
    #[cfg(feature = "smtp")]
    if let Some(smtp) = &config.smtp {
        return Box::new(shopwatch::notify::SmtpNotifier::new(smtp.clone()));
    }

    #[cfg(not(feature = "smtp"))]
    if config.smtp.is_some() {
        log::warn!("smtp configured but this build lacks the 'smtp' feature; logging digest");
    }

    Box::new(LogNotifier)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("shopwatch starting...");

    let config = Config::load_or_default(&cli.config);
    let store = JsonStateStore::new(&cli.state);

    match cli.command {
        Command::Run { dry_run } => {
            let notifier = build_notifier(&config);
            let summary = pipeline::run_watch(&config, &store, notifier.as_ref(), dry_run).await?;

            log::info!(
                "Run complete: {}/{} target(s) ok, {} record(s), {} event(s)",
                summary.targets_total - summary.targets_failed,
                summary.targets_total,
                summary.records_seen,
                summary.events.len()
            );

            if dry_run {
                for event in &summary.events {
                    println!("{}", event);
                }
            }
        }

        Command::Validate => {
            let config = Config::load(&cli.config)?;
            config.validate()?;
            log::info!(
                "Configuration valid: {} target(s), removal policy {:?}",
                config.targets.len(),
                config.diff.removal_policy
            );
        }

        Command::Info => {
            let state = store.load().await?;
            if state.is_empty() {
                println!("State is empty ({})", cli.state.display());
                return Ok(());
            }

            let mut per_site: std::collections::BTreeMap<&str, usize> =
                std::collections::BTreeMap::new();
            let mut oldest = i64::MAX;
            let mut newest = i64::MIN;
            for (key, entry) in &state {
                *per_site.entry(key.site.as_str()).or_default() += 1;
                oldest = oldest.min(entry.last_seen);
                newest = newest.max(entry.last_seen);
            }

            println!("{} tracked item(s) in {}", state.len(), cli.state.display());
            for (site, count) in per_site {
                println!("  {}: {}", site, count);
            }
            println!("last_seen range: {} .. {}", oldest, newest);
        }
    }

    Ok(())
}
