use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::driver::{DriverResult, PageDriver};
use crate::partition::Partition;
use crate::record::SbRecord;

// Selectors for the leaderboard page.
pub const TABLE: &str = "#basestealing_running_game_table";
pub const TOP_ROWS: &str = ".default-table-row";
pub const OPEN_SUB_ROWS: &str = "tr.tr-sub-data[data-open='true']";
pub const PANE_ROWS: &str = ".all-tab-pane .default-table-row";
pub const VIDEO_ANCHOR: &str = ".video-col a";

/// Deliberate delays between driver interactions, to avoid hammering the
/// source. `none()` disables them for tests.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    /// Uniform jitter window after each expansion click, in ms.
    pub expand_min_ms: u64,
    pub expand_max_ms: u64,
    /// Settle time after the last expansion, before sub-rows are read.
    pub settle_ms: u64,
    /// Settle time after opening a detail context.
    pub detail_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing {
            expand_min_ms: 2000,
            expand_max_ms: 4000,
            settle_ms: 3000,
            detail_ms: 1000,
        }
    }
}

impl Pacing {
    pub fn none() -> Self {
        Pacing {
            expand_min_ms: 0,
            expand_max_ms: 0,
            settle_ms: 0,
            detail_ms: 0,
        }
    }

    pub async fn expand_pause(&self) {
        if self.expand_max_ms == 0 {
            return;
        }
        let ms = rand::thread_rng().gen_range(self.expand_min_ms..=self.expand_max_ms);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    pub async fn settle(&self) {
        if self.settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.settle_ms)).await;
        }
    }

    pub async fn detail_settle(&self) {
        if self.detail_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.detail_ms)).await;
        }
    }
}

#[derive(Debug, Default)]
pub struct ExpandReport {
    pub attempted: usize,
    pub expanded: usize,
    pub skipped: usize,
}

/// Expand every top-level row in the partition so its sub-rows become
/// visible. A row that fails to expand is logged and skipped; it simply
/// contributes no records. Only a fatal driver error aborts the pass.
pub async fn expand_rows<D: PageDriver>(
    driver: &mut D,
    partition: Partition,
    pacing: &Pacing,
) -> DriverResult<ExpandReport> {
    let rows = driver.find_all(TOP_ROWS).await?;
    let end = partition.end.min(rows.len());
    let slice = rows.get(partition.start..end).unwrap_or(&[]);

    let mut report = ExpandReport {
        attempted: slice.len(),
        ..ExpandReport::default()
    };
    for (i, row) in slice.iter().enumerate() {
        match driver.click(row).await {
            Ok(()) => report.expanded += 1,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(row = partition.start + i, error = %e, "row expansion failed, skipping");
                report.skipped += 1;
            }
        }
        pacing.expand_pause().await;
    }
    Ok(report)
}

/// Read every open sub-row in the partition's table and turn it into a
/// record. Sub-rows that cannot be read are logged and skipped.
pub async fn collect_records<D: PageDriver>(driver: &mut D) -> DriverResult<Vec<SbRecord>> {
    let mut records = Vec::new();
    let sub_rows = driver.find_all(OPEN_SUB_ROWS).await?;

    for sub in &sub_rows {
        let pane_rows = match driver.find_all_within(sub, PANE_ROWS).await {
            Ok(rows) => rows,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "sub-row pane unreadable, skipping");
                continue;
            }
        };
        for row in &pane_rows {
            match read_sub_row(driver, row).await {
                Ok(record) => records.push(record),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(error = %e, "sub-row parse failed, skipping"),
            }
        }
    }
    Ok(records)
}

/// Read one sub-row into a record. Span cells holding a player link
/// contribute the id at the end of the href; plain cells contribute their
/// text. The video column's href, when present, becomes the detail
/// reference.
async fn read_sub_row<D: PageDriver>(driver: &mut D, row: &D::Elem) -> DriverResult<SbRecord> {
    let spans = driver.find_all_within(row, "span").await?;
    let mut values = Vec::with_capacity(spans.len());
    for span in &spans {
        let anchors = driver.find_all_within(span, "a").await?;
        if let Some(anchor) = anchors.first() {
            let href = driver.read_attribute(anchor, "href").await?.unwrap_or_default();
            values.push(href.rsplit('/').next().unwrap_or_default().to_string());
        } else {
            values.push(driver.read_text(span).await?);
        }
    }

    let mut record = SbRecord::from_table_fields(&values);
    let video = driver.find_all_within(row, VIDEO_ANCHOR).await?;
    if let Some(anchor) = video.first() {
        record.video_link = driver.read_attribute(anchor, "href").await?.unwrap_or_default();
    }
    Ok(record)
}

// ── Tests ──
