use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

use crate::driver::{ContextHandle, DriverError, PageDriver};
use crate::extract::Pacing;
use crate::record::SbRecord;

// Selectors for the video detail page.
pub const DETAIL_MARKER: &str = "#sporty_video";
pub const NARRATIVE: &str = "h3";
pub const ZONE_CHART: &str = "#zone_chart-zone";
pub const BULLET_GROUPS: &str = ".mod";

static TRANSIENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)temporarily\s+unavailable").unwrap());

/// Result of one enrichment attempt. A failed attempt keeps whatever
/// fields were written before the failure; the worker abandons it.
#[derive(Debug)]
pub enum EnrichOutcome {
    Enriched(SbRecord),
    Failed { record: SbRecord, reason: String },
}

#[derive(Debug, Error)]
enum DetailError {
    #[error("marker element never appeared")]
    Timeout,
    #[error("{0}")]
    Parse(String),
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Fetch the record's detail page and fill its enrichment fields.
///
/// The detail page is opened in a fresh context which is closed — and
/// focus returned to the base context — on every exit path, so a failed
/// enrichment can never leak a context into the next record's navigation.
/// Returns `Err` only when the driver session itself is lost.
pub async fn enrich<D: PageDriver>(
    driver: &mut D,
    record: SbRecord,
    wait: Duration,
    pacing: &Pacing,
) -> Result<EnrichOutcome, DriverError> {
    let mut record = record;
    let url = record.video_link.clone();

    if let Err(e) = driver.open_in_new_context(&url).await {
        if e.is_fatal() {
            return Err(e);
        }
        // Nothing was opened; nothing to clean up.
        return Ok(EnrichOutcome::Failed {
            record,
            reason: format!("could not open detail page: {}", e),
        });
    }
    pacing.detail_settle().await;

    let result = read_detail(driver, &mut record, &url, wait).await;

    // Cleanup runs on every path, including after a fatal read error.
    if let Err(e) = driver.close_current_context().await {
        if e.is_fatal() {
            return Err(e);
        }
        warn!(error = %e, "detail context close failed");
    }
    if let Err(e) = driver.switch_to_context(ContextHandle::BASE).await {
        if e.is_fatal() {
            return Err(e);
        }
        warn!(error = %e, "could not refocus base context");
    }

    match result {
        Ok(()) => Ok(EnrichOutcome::Enriched(record)),
        Err(DetailError::Driver(e)) if e.is_fatal() => Err(e),
        Err(e) => Ok(EnrichOutcome::Failed {
            record,
            reason: e.to_string(),
        }),
    }
}

/// Read the detail fields in page order. Partial writes before a failure
/// stay on the record.
async fn read_detail<D: PageDriver>(
    driver: &mut D,
    record: &mut SbRecord,
    url: &str,
    wait: Duration,
) -> Result<(), DetailError> {
    match driver.wait_for(DETAIL_MARKER, wait).await {
        Ok(_) => {}
        Err(DriverError::WaitTimeout { .. }) => {
            // A known transient-error page gets exactly one reload.
            if !transient_page(driver).await? {
                return Err(DetailError::Timeout);
            }
            info!("transient error page, reloading once");
            driver.navigate(url).await?;
            match driver.wait_for(DETAIL_MARKER, wait).await {
                Ok(_) => {}
                Err(DriverError::WaitTimeout { .. }) => return Err(DetailError::Timeout),
                Err(e) => return Err(e.into()),
            }
        }
        Err(e) => return Err(e.into()),
    }

    let narrative = driver
        .find_all(NARRATIVE)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| DetailError::Parse("no narrative header".into()))?;
    record.description = driver.read_text(&narrative).await?;

    let zone = driver
        .find_all(ZONE_CHART)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| DetailError::Parse("no zone chart".into()))?;
    record.strike_zone = driver
        .read_attribute(&zone, "innerHTML")
        .await?
        .unwrap_or_default();

    // The last .mod group on the page holds the label:value bullet list.
    let groups = driver.find_all(BULLET_GROUPS).await?;
    let last = groups
        .last()
        .ok_or_else(|| DetailError::Parse("no bullet list".into()))?;
    let bullets = driver.find_all_within(last, "li").await?;
    let mut values = Vec::with_capacity(bullets.len());
    for bullet in &bullets {
        let text = driver.read_text(bullet).await?;
        values.push(text.rsplit(':').next().unwrap_or_default().trim().to_string());
    }
    record.apply_detail_fields(&values);
    Ok(())
}

/// True when the focused page is the known "temporarily unavailable"
/// placeholder.
async fn transient_page<D: PageDriver>(driver: &mut D) -> Result<bool, DetailError> {
    let bodies = match driver.find_all("body").await {
        Ok(els) => els,
        Err(e) if e.is_fatal() => return Err(e.into()),
        Err(_) => return Ok(false),
    };
    let Some(body) = bodies.first() else {
        return Ok(false);
    };
    match driver.read_text(body).await {
        Ok(text) => Ok(TRANSIENT_RE.is_match(&text)),
        Err(e) if e.is_fatal() => Err(e.into()),
        Err(_) => Ok(false),
    }
}

// ── Tests ──
