mod checkpoint;
mod coordinator;
mod driver;
mod enrich;
mod extract;
mod partition;
mod record;
mod sink;
mod worker;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Datelike;
use clap::{Parser, Subcommand};

use crate::coordinator::RunConfig;
use crate::driver::chromium::ChromiumDriver;
use crate::extract::Pacing;

const DEFAULT_URL: &str = "https://baseballsavant.mlb.com/leaderboard/basestealing-run-value";

#[derive(Parser)]
#[command(name = "sb_scraper", about = "Baseball Savant basestealing leaderboard scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the leaderboard: expand rows, extract attempts, enrich each
    /// from its video page, append to per-worker CSV files
    Run {
        /// Leaderboard URL
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,
        /// First season of the range
        #[arg(long, default_value_t = 2016)]
        season_start: u16,
        /// Last season of the range (default: current year)
        #[arg(long)]
        season_end: Option<u16>,
        /// Number of parallel workers (one partition each)
        #[arg(short, long, default_value_t = 2)]
        workers: usize,
        /// Directory for checkpoint and output files
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
        /// Resume from existing checkpoint files, one worker per file;
        /// skips the expansion/extraction pass entirely
        #[arg(long = "checkpoint")]
        checkpoints: Vec<PathBuf>,
        /// Show the browser window instead of running headless
        #[arg(long)]
        headful: bool,
    },
    /// Inspect run health: rows persisted per worker sink, records still
    /// pending per checkpoint
    Stats {
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            url,
            season_start,
            season_end,
            workers,
            data_dir,
            checkpoints,
            headful,
        } => {
            let season_end = season_end.unwrap_or_else(|| chrono::Utc::now().year() as u16);
            let cfg = RunConfig {
                url,
                season_start,
                season_end,
                workers,
                data_dir,
                checkpoints: (!checkpoints.is_empty()).then_some(checkpoints),
                pacing: Pacing::default(),
                wait: Duration::from_secs(60),
                stagger: Duration::from_secs(1),
            };
            let report = coordinator::run(cfg, move || ChromiumDriver::launch(headful)).await?;
            println!(
                "Done: {} records persisted, {} abandoned, {} worker(s) failed.",
                report.persisted(),
                report.abandoned(),
                report.failed_workers
            );
            if report.failed_workers > 0 {
                println!(
                    "Failed workers left their checkpoints in place; resume with --checkpoint."
                );
            }
            Ok(())
        }
        Commands::Stats { data_dir } => stats(&data_dir),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// A run's success is only observable from its files: sink completeness
/// and remaining checkpoint sizes.
fn stats(data_dir: &Path) -> anyhow::Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(data_dir)
        .map(|rd| rd.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default();
    entries.sort();

    let mut persisted = 0usize;
    let mut pending = 0usize;
    let mut seen_any = false;

    for path in &entries {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with("sb_data_worker_") && name.ends_with(".csv") {
            let rows = sink::count_rows(path)?;
            println!("{:<28} {:>7} rows", name, rows);
            persisted += rows;
            seen_any = true;
        } else if name.starts_with("checkpoint_") && name.ends_with(".json") {
            let remaining = checkpoint::load(path)?.map(|r| r.len()).unwrap_or(0);
            println!("{:<28} {:>7} pending", name, remaining);
            pending += remaining;
            seen_any = true;
        }
    }

    if !seen_any {
        println!("No worker files in {}. Run 'run' first.", data_dir.display());
        return Ok(());
    }

    println!();
    println!("Persisted: {}", persisted);
    println!("Pending:   {}", pending);
    Ok(())
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
