use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use lawgit::{
    CabinetTimeline, CancellationToken, Deduplicator, DipClient, FetchOptions, FetchReport, GiiSource, GitHistoryStore,
    HistoryBuilder, LawgitConfig, LoggingYamlConfig, MarkdownRenderer, OffeneGesetzeClient, Retrying,
    SnapshotCache, WaybackSource,
};

#[derive(Parser)]
#[command(name = "lawgit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every law whose export changed since the last run
    Download {
        /// Ignore stored version tokens
        #[arg(long)]
        force: bool,
    },
    /// Import historical exports from the Internet Archive
    Import,
    /// Delete snapshots whose content equals an older snapshot
    Dedup,
    /// Replay the distinct snapshots as git commits
    History {
        /// Repository to write to, overriding the configuration
        #[arg(short, long)]
        repository: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => LawgitConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => LawgitConfig::default(),
    };
    init_tracing(&config.logging);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted");
            on_interrupt.cancel();
        }
    });

    run(cli.command, &config, cancel).await
}

fn init_tracing(logging: &LoggingYamlConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn run(command: Command, config: &LawgitConfig, cancel: CancellationToken) -> anyhow::Result<()> {
    let cache = SnapshotCache::new(&config.archive.root);
    let sources = &config.sources;

    match command {
        Command::Download { force } => {
            let source = GiiSource::new(&sources.gii_root, &sources.toc_path, sources.timeout())?;
            let options = FetchOptions {
                parallelism: config.archive.fetch_parallelism,
                force: force || config.archive.force,
            };
            let today = Utc::now().date_naive();
            // snapshots are persisted by rename, so dropping the batch leaves no partial file
            let Some(report) = cancel
                .run_until_cancelled(lawgit::download(&cache, &source, today, options))
                .await
            else {
                return Ok(());
            };
            print_fetch_report(&report?);
        }
        Command::Import => {
            let listing = GiiSource::new(&sources.gii_root, &sources.toc_path, sources.timeout())?;
            let wayback =
                WaybackSource::new(&sources.wayback_cdx, sources.timeout())?.with_replay_root(&sources.wayback_replay);
            let import = lawgit::import_captures(&cache, &listing, &wayback, config.archive.fetch_parallelism);
            let Some(report) = cancel.run_until_cancelled(import).await else {
                return Ok(());
            };
            print_fetch_report(&report?);
        }
        Command::Dedup => {
            let report = lawgit::dedup(&cache, &Deduplicator::default())?;
            println!(
                "removed {} duplicates, {} distinct snapshots remain",
                report.removed.len(),
                report.survivors
            );
            for failure in &report.unreadable {
                println!("  unreadable {}: {}", failure.snapshot, failure.error);
            }
            for failure in &report.removal_failures {
                println!("  not removed {}: {}", failure.snapshot, failure.error);
            }
        }
        Command::History { repository } => {
            let lookup = &config.lookup;
            let procedures = Retrying::new(
                DipClient::connect(&lookup.dip_landing_url, &lookup.dip_search_url, lookup.timeout()).await?,
                lookup.retry,
            );
            let dates = Retrying::new(
                OffeneGesetzeClient::new(&lookup.date_api_url, lookup.timeout())?,
                lookup.retry,
            );
            let builder = HistoryBuilder::new(
                &procedures,
                &dates,
                &MarkdownRenderer,
                CabinetTimeline::current(),
                config.history.options(lookup.parallelism),
            )
            .with_cancellation(cancel);
            let path = repository.unwrap_or_else(|| config.history.repository.clone());
            let mut store = GitHistoryStore::open_or_init(&path)
                .with_context(|| format!("opening repository {}", path.display()))?;

            let report = lawgit::replay_history(&cache, &Deduplicator::default(), &builder, &mut store).await?;
            println!(
                "{} commits, {} already recorded, {} duplicates left out, {} unreadable",
                report.build.commits.len(),
                report.build.already_recorded,
                report.duplicates,
                report.unreadable
            );
            if report.build.interrupted {
                println!("  interrupted; rerun to append the remaining snapshots");
            }
            for (kind, count) in report.build.counts() {
                println!("  skipped ({kind}): {count}");
            }
            for failure in &report.build.procedure_failures {
                println!("  no procedure for {}: {}", failure.snapshot, failure.error);
            }
        }
    }
    Ok(())
}

fn print_fetch_report(report: &FetchReport) {
    println!(
        "{} stored, {} unchanged, {} failed",
        report.stored.len(),
        report.not_modified.len(),
        report.failures.len()
    );
    for failure in &report.failures {
        println!("  {}: {}", failure.document_id, failure.error);
    }
}
