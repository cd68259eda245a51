use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::driver::{DriverResult, PageDriver};
use crate::extract::{self, Pacing};
use crate::partition::{self, Partition};
use crate::worker::{self, WorkerConfig, WorkerSummary};

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub url: String,
    pub season_start: u16,
    pub season_end: u16,
    pub workers: usize,
    pub data_dir: PathBuf,
    /// Resume mode: one worker per existing checkpoint file, no
    /// re-partitioning, no extraction pass.
    pub checkpoints: Option<Vec<PathBuf>>,
    pub pacing: Pacing,
    pub wait: Duration,
    pub stagger: Duration,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub summaries: Vec<WorkerSummary>,
    pub failed_workers: usize,
}

impl RunReport {
    pub fn persisted(&self) -> usize {
        self.summaries.iter().map(|s| s.persisted).sum()
    }

    pub fn abandoned(&self) -> usize {
        self.summaries.iter().map(|s| s.abandoned).sum()
    }
}

/// Split the leaderboard into partitions and drive one worker per
/// partition to completion. Workers are fully isolated: each launches its
/// own driver session and owns its own checkpoint and sink files, so one
/// fatal worker never disturbs its siblings — their checkpoints stay on
/// disk for a later resume.
pub async fn run<D, F, Fut>(cfg: RunConfig, launch: F) -> Result<RunReport>
where
    D: PageDriver + 'static,
    F: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = DriverResult<D>> + Send,
{
    std::fs::create_dir_all(&cfg.data_dir)
        .with_context(|| format!("create data dir {}", cfg.data_dir.display()))?;
    let url = leaderboard_url(&cfg.url, cfg.season_start, cfg.season_end);

    let configs = match &cfg.checkpoints {
        Some(paths) => paths
            .iter()
            .enumerate()
            .map(|(id, path)| worker_config(&cfg, id, Partition { start: 0, end: 0 }, &url, Some(path.clone())))
            .collect::<Vec<_>>(),
        None => {
            let total = discover_total(launch().await?, &url, cfg.wait).await?;
            info!(total, workers = cfg.workers, "leaderboard discovered");
            partition::split(total, cfg.workers)
                .into_iter()
                .enumerate()
                .map(|(id, p)| worker_config(&cfg, id, p, &url, None))
                .collect()
        }
    };

    let progress = MultiProgress::new();
    let style = ProgressStyle::default_bar()
        .template("{prefix:>9} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
        .expect("progress template")
        .progress_chars("=> ");

    let mut handles = Vec::with_capacity(configs.len());
    for worker_cfg in configs {
        let pb = progress.add(ProgressBar::new(0));
        pb.set_style(style.clone());
        pb.set_prefix(format!("worker {}", worker_cfg.id));

        let launch = launch.clone();
        handles.push(tokio::spawn(async move {
            let mut driver = launch().await?;
            let result = worker::run(&mut driver, &worker_cfg, &pb).await;
            // Teardown on every exit path, success or not.
            driver.shutdown().await;
            pb.finish_and_clear();
            result
        }));
        tokio::time::sleep(cfg.stagger).await;
    }

    let mut report = RunReport::default();
    for handle in handles {
        match handle.await {
            Ok(Ok(summary)) => {
                info!(
                    worker = summary.id,
                    persisted = summary.persisted,
                    abandoned = summary.abandoned,
                    resumed = summary.resumed,
                    "worker finished"
                );
                report.summaries.push(summary);
            }
            Ok(Err(e)) => {
                error!("worker failed: {:#}", e);
                report.failed_workers += 1;
            }
            Err(e) => {
                error!("worker task panicked: {}", e);
                report.failed_workers += 1;
            }
        }
    }

    info!(
        persisted = report.persisted(),
        abandoned = report.abandoned(),
        failed_workers = report.failed_workers,
        "run complete"
    );
    Ok(report)
}

fn worker_config(
    cfg: &RunConfig,
    id: usize,
    partition: Partition,
    url: &str,
    checkpoint: Option<PathBuf>,
) -> WorkerConfig {
    WorkerConfig {
        id,
        url: url.to_string(),
        partition,
        checkpoint_path: checkpoint
            .unwrap_or_else(|| cfg.data_dir.join(format!("checkpoint_{}.json", id))),
        sink_path: cfg.data_dir.join(format!("sb_data_worker_{}.csv", id)),
        pacing: cfg.pacing,
        wait: cfg.wait,
    }
}

/// Count the leaderboard's top-level rows with a short-lived session of
/// its own, torn down before any worker starts.
async fn discover_total<D: PageDriver>(mut driver: D, url: &str, wait: Duration) -> Result<usize> {
    let result = async {
        driver.navigate(url).await?;
        driver.wait_for(extract::TABLE, wait).await?;
        Ok::<_, crate::driver::DriverError>(driver.find_all(extract::TOP_ROWS).await?.len())
    }
    .await;
    driver.shutdown().await;
    result.context("row-count discovery")
}

/// The year range goes into the URL query string; the capability contract
/// has no dropdown operations.
fn leaderboard_url(base: &str, season_start: u16, season_end: u16) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!(
        "{}{}season_start={}&season_end={}",
        base, sep, season_start, season_end
    )
}

// ── Tests ──
