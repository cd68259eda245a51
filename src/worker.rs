use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use tracing::{info, warn};

use crate::checkpoint;
use crate::driver::PageDriver;
use crate::enrich::{self, EnrichOutcome};
use crate::extract::{self, Pacing};
use crate::partition::Partition;
use crate::record::SbRecord;
use crate::sink::CsvSink;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub id: usize,
    /// Leaderboard URL with the season range already applied.
    pub url: String,
    pub partition: Partition,
    pub checkpoint_path: PathBuf,
    pub sink_path: PathBuf,
    pub pacing: Pacing,
    /// Budget for each bounded element wait.
    pub wait: Duration,
}

#[derive(Debug, Default)]
pub struct WorkerSummary {
    pub id: usize,
    pub resumed: bool,
    /// Records that entered the enrichment stage this run.
    pub extracted: usize,
    pub persisted: usize,
    pub abandoned: usize,
}

/// Drive one partition to completion: expand its rows, extract sub-row
/// records, checkpoint them, then enrich and persist strictly in order,
/// shrinking the checkpoint after every record.
///
/// When a non-empty checkpoint already exists the expansion/extraction
/// pass is skipped entirely and the worker resumes at enrichment. Only a
/// fatal driver error aborts the run; the checkpoint then stays on disk
/// for a later resume. The caller owns driver teardown.
pub async fn run<D: PageDriver>(
    driver: &mut D,
    cfg: &WorkerConfig,
    pb: &ProgressBar,
) -> Result<WorkerSummary> {
    let mut summary = WorkerSummary {
        id: cfg.id,
        ..WorkerSummary::default()
    };

    let records = match checkpoint::load(&cfg.checkpoint_path)? {
        Some(records) if !records.is_empty() => {
            info!(
                worker = cfg.id,
                remaining = records.len(),
                "resuming from checkpoint"
            );
            summary.resumed = true;
            records
        }
        _ => {
            if cfg.partition.is_empty() {
                info!(worker = cfg.id, "empty partition, nothing to do");
                return Ok(summary);
            }
            extract_partition(driver, cfg).await?
        }
    };

    summary.extracted = records.len();
    pb.set_length(records.len() as u64);

    let sink = CsvSink::new(cfg.sink_path.clone());
    for i in 0..records.len() {
        let record = records[i].clone();
        if record.needs_enrichment() {
            match enrich::enrich(driver, record, cfg.wait, &cfg.pacing).await? {
                EnrichOutcome::Enriched(enriched) => {
                    sink.append(&[enriched]).context("persist record")?;
                    summary.persisted += 1;
                }
                EnrichOutcome::Failed { record, reason } => {
                    warn!(
                        worker = cfg.id,
                        date = %record.date,
                        detail = %record.video_link,
                        %reason,
                        "abandoning record"
                    );
                    summary.abandoned += 1;
                }
            }
        } else {
            sink.append(&[record]).context("persist record")?;
            summary.persisted += 1;
        }
        // Crash-safety anchor: the checkpoint is always the untouched tail.
        checkpoint::save(&cfg.checkpoint_path, &records[i + 1..])?;
        pb.inc(1);
    }

    info!(
        worker = cfg.id,
        persisted = summary.persisted,
        abandoned = summary.abandoned,
        "partition done"
    );
    Ok(summary)
}

/// Fresh pass: open the leaderboard, expand the partition's rows, collect
/// sub-row records, and write the initial checkpoint (the resume anchor)
/// before any enrichment starts.
async fn extract_partition<D: PageDriver>(
    driver: &mut D,
    cfg: &WorkerConfig,
) -> Result<Vec<SbRecord>> {
    driver.navigate(&cfg.url).await?;
    driver.wait_for(extract::TABLE, cfg.wait).await?;

    let report = extract::expand_rows(driver, cfg.partition, &cfg.pacing).await?;
    info!(
        worker = cfg.id,
        expanded = report.expanded,
        skipped = report.skipped,
        "expansion pass done"
    );

    cfg.pacing.settle().await;
    let records = extract::collect_records(driver).await?;
    info!(worker = cfg.id, records = records.len(), "extraction pass done");

    checkpoint::save(&cfg.checkpoint_path, &records)?;
    Ok(records)
}

// ── Tests ──
