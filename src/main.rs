// src/main.rs

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::Parser;
use clipvault::catalog::{DATE_FORMAT, TIME_FORMAT};
use clipvault::prelude::*;
use reqwest::Client;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Bulk-export time-filtered video clips from a remote device as one ZIP.
#[derive(Parser)]
#[command(name = "clipvault")]
#[command(version)]
#[command(about = "Query a clip catalog and bulk-download a time window into a single archive")]
struct Cli {
    /// Catalog server base URL.
    #[arg(long, env = "CLIPVAULT_BASE_URL")]
    base_url: String,

    /// Device to query clips from.
    #[arg(long, default_value = "Device-1")]
    device: String,

    /// Start date, DD-MM-YYYY.
    #[arg(long)]
    from_date: String,

    /// End date, DD-MM-YYYY.
    #[arg(long)]
    to_date: String,

    /// Start time, HH:MM:SS.
    #[arg(long, default_value = "01:00:00")]
    from_time: String,

    /// End time, HH:MM:SS.
    #[arg(long, default_value = "23:00:00")]
    to_time: String,

    /// Clips transferred concurrently per batch.
    #[arg(long, default_value_t = 5)]
    batch_size: usize,

    /// User tag stamped into the archive filename.
    #[arg(long, default_value = "operator")]
    user: String,

    /// Directory the finished archive is written to.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose || std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive(
                if cli.verbose {
                    "clipvault=debug".parse()?
                } else {
                    "clipvault=info".parse()?
                },
            ))
            .init();
    }

    let filter = ClipFilter {
        device: cli.device.clone(),
        from_date: parse_date(&cli.from_date).context("invalid --from-date")?,
        to_date: parse_date(&cli.to_date).context("invalid --to-date")?,
        from_time: parse_time(&cli.from_time).context("invalid --from-time")?,
        to_time: parse_time(&cli.to_time).context("invalid --to-time")?,
    };

    let client = Client::new();
    let catalog = CatalogClient::new(client.clone(), &cli.base_url);
    let clips = catalog.query(&filter).await?;
    if clips.is_empty() {
        println!("No videos found for the selected criteria.");
        return Ok(());
    }
    println!("Found {} videos.", clips.len());

    let mut selection = Selection::new();
    selection.select_all(&clips);

    let mut orchestrator = ExportOrchestrator::new(client, cli.user.clone(), cli.batch_size);
    let mut progress = orchestrator.subscribe();
    // Progress goes to stdout unconditionally; tracing is for diagnostics.
    let reporter = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let state = progress.borrow_and_update().clone();
            match state.stage {
                Stage::Transferring => println!(
                    "[PROGRESS] {} (batch {} of {}): {}/{} files, {}%, {:.1} KB/s, ETA {}",
                    state.stage.label(),
                    state.batch_index,
                    state.total_batches,
                    state.processed,
                    state.total,
                    state.transfer_percent,
                    state.rate_kbs,
                    format_eta(state.eta_seconds),
                ),
                Stage::Archiving => {
                    println!("[PROGRESS] {}: {}%", state.stage.label(), state.archive_percent)
                }
                _ => println!("[PROGRESS] {}", state.stage.label()),
            }
        }
    });

    let result = orchestrator.run(&clips, &selection).await;
    drop(orchestrator);
    let _ = reporter.await;

    match result {
        Ok(report) => {
            let out_path = cli.output_dir.join(&report.archive.suggested_filename);
            tokio::fs::write(&out_path, &report.archive.payload)
                .await
                .with_context(|| format!("writing archive to {}", out_path.display()))?;

            println!("{}", report.summary());
            println!("Archive written to {}", out_path.display());

            if !report.failures.is_empty() {
                println!("\nThe following clips could not be downloaded:");
                for failure in &report.failures {
                    let fallback = clips
                        .iter()
                        .find(|c| c.filename == failure.filename)
                        .map(|c| c.direct_url())
                        .unwrap_or("<no direct url>");
                    println!("  {} - {} (open directly: {})", failure.filename, failure.reason, fallback);
                }
            }
            Ok(())
        }
        Err(ExportError::EmptySelection) => {
            warn!("nothing selected, nothing exported");
            println!("Please select at least one video to download.");
            Ok(())
        }
        Err(ExportError::Archive { source, fetched }) => {
            println!("Archive creation failed: {source}");
            if !fetched.is_empty() {
                println!("These clips were downloaded before the failure and can be fetched individually:");
                for filename in &fetched {
                    let fallback = clips
                        .iter()
                        .find(|c| clipvault::transfer::normalized_filename(&c.filename) == *filename)
                        .map(|c| c.direct_url())
                        .unwrap_or("<no direct url>");
                    println!("  {filename} (open directly: {fallback})");
                }
            }
            Err(source.into())
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .with_context(|| format!("expected DD-MM-YYYY, got {raw:?}"))
}

fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .with_context(|| format!("expected HH:MM:SS, got {raw:?}"))
}
