//! Scripted in-memory driver for tests: a tiny world model of the
//! leaderboard (rows → sub-rows → cells) and its detail pages, plus the
//! counters the pipeline tests assert against (re-extraction, context
//! leaks, reload counts, session teardown).

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{ContextHandle, DriverError, DriverResult, PageDriver};
use crate::enrich::{BULLET_GROUPS, DETAIL_MARKER, NARRATIVE, ZONE_CHART};
use crate::extract::{OPEN_SUB_ROWS, PANE_ROWS, TABLE, TOP_ROWS, VIDEO_ANCHOR};

#[derive(Default, Clone)]
pub struct World {
    pub rows: Vec<FakeRow>,
    pub details: HashMap<String, Detail>,
}

#[derive(Default, Clone)]
pub struct FakeRow {
    pub expand_fails: bool,
    pub sub_rows: Vec<FakeSubRow>,
}

impl FakeRow {
    pub fn with_subs(sub_rows: Vec<FakeSubRow>) -> Self {
        FakeRow {
            expand_fails: false,
            sub_rows,
        }
    }

    pub fn failing() -> Self {
        FakeRow {
            expand_fails: true,
            sub_rows: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct FakeSubRow {
    pub cells: Vec<Cell>,
    pub video: Option<String>,
    /// Reading this sub-row's spans fails with a page error.
    pub broken: bool,
}

#[derive(Clone)]
pub enum Cell {
    Text(String),
    Player(String),
}

#[derive(Clone)]
pub struct Detail {
    pub behavior: DetailBehavior,
    pub description: String,
    pub zone: String,
    pub bullets: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum DetailBehavior {
    Ok,
    /// The marker element never appears and the page is not transient.
    MarkerTimeout,
    /// Transient-error page on first load; fine after one reload.
    TransientOnce,
    /// Transient-error page no matter how often it is reloaded.
    TransientAlways,
    /// Marker and narrative present, but no bullet list (parse failure
    /// after partial writes).
    NoBullets,
}

impl Detail {
    pub fn ok_with_description(description: &str) -> Self {
        Detail {
            behavior: DetailBehavior::Ok,
            description: description.to_string(),
            zone: "<svg/>".to_string(),
            bullets: vec![
                "Batter: Doe, Jon".into(),
                "Pitcher: Roe, Rich".into(),
                "Count: 0-1".into(),
                "Pitch Type: SL".into(),
                "Velocity: 88.2".into(),
                "Spin: 2500".into(),
                "Zone: 4".into(),
                "Matchup: L vs R".into(),
            ],
        }
    }

    pub fn timing_out() -> Self {
        Detail {
            behavior: DetailBehavior::MarkerTimeout,
            description: String::new(),
            zone: String::new(),
            bullets: Vec::new(),
        }
    }
}

/// Shared counters, so coordinator tests can observe drivers that were
/// moved into worker tasks.
#[derive(Default)]
pub struct FakeStats {
    pub top_row_queries: AtomicUsize,
    pub expand_clicks: AtomicUsize,
    pub details_opened: AtomicUsize,
    pub shutdowns: AtomicUsize,
}

#[derive(Clone, Debug)]
pub enum FakeElem {
    Table,
    TopRow(usize),
    SubRow(usize, usize),
    PaneRow(usize, usize),
    Span(usize, usize, usize),
    CellAnchor(usize, usize, usize),
    VideoAnchor(usize, usize),
    Marker,
    H3,
    Zone,
    Mod(usize),
    Li(usize),
    Body,
}

pub struct FakeDriver {
    world: Arc<World>,
    stats: Arc<FakeStats>,
    expanded: Vec<bool>,
    focus: usize,
    detail_url: Option<String>,
    reloaded: bool,
    reload_count: usize,
    open_contexts: usize,
    opens: usize,
    /// The n-th `open_in_new_context` call fails fatally (session lost).
    pub fatal_on_open: Option<usize>,
}

impl FakeDriver {
    pub fn new(world: World) -> Self {
        Self::with_stats(Arc::new(world), Arc::new(FakeStats::default()))
    }

    pub fn with_stats(world: Arc<World>, stats: Arc<FakeStats>) -> Self {
        let expanded = vec![false; world.rows.len()];
        FakeDriver {
            world,
            stats,
            expanded,
            focus: 0,
            detail_url: None,
            reloaded: false,
            reload_count: 0,
            open_contexts: 0,
            opens: 0,
            fatal_on_open: None,
        }
    }

    pub fn open_contexts(&self) -> usize {
        self.open_contexts
    }

    pub fn focused_on_base(&self) -> bool {
        self.focus == 0
    }

    pub fn detail_reloads(&self) -> usize {
        self.reload_count
    }

    pub fn stats(&self) -> Arc<FakeStats> {
        Arc::clone(&self.stats)
    }

    fn detail(&self) -> Option<&Detail> {
        self.world.details.get(self.detail_url.as_deref()?)
    }

    /// Whether the detail content (marker onward) is visible right now.
    fn detail_visible(&self) -> bool {
        match self.detail().map(|d| d.behavior) {
            Some(DetailBehavior::Ok) | Some(DetailBehavior::NoBullets) => true,
            Some(DetailBehavior::TransientOnce) => self.reloaded,
            _ => false,
        }
    }

    fn transient_active(&self) -> bool {
        match self.detail().map(|d| d.behavior) {
            Some(DetailBehavior::TransientOnce) => !self.reloaded,
            Some(DetailBehavior::TransientAlways) => true,
            _ => false,
        }
    }

    fn sub_row(&self, row: usize, sub: usize) -> &FakeSubRow {
        &self.world.rows[row].sub_rows[sub]
    }
}

impl PageDriver for FakeDriver {
    type Elem = FakeElem;

    fn navigate(&mut self, _url: &str) -> impl Future<Output = DriverResult<()>> + Send {
        async move {
            if self.focus != 0 {
                self.reloaded = true;
                self.reload_count += 1;
            }
            Ok(())
        }
    }

    fn wait_for(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> impl Future<Output = DriverResult<Self::Elem>> + Send {
        async move {
            let timed_out = || {
                Err(DriverError::WaitTimeout {
                    selector: selector.to_string(),
                    timeout,
                })
            };
            if self.focus == 0 {
                return match selector {
                    TABLE => Ok(FakeElem::Table),
                    _ => timed_out(),
                };
            }
            match selector {
                DETAIL_MARKER if self.detail_visible() => Ok(FakeElem::Marker),
                _ => timed_out(),
            }
        }
    }

    fn find_all(
        &mut self,
        selector: &str,
    ) -> impl Future<Output = DriverResult<Vec<Self::Elem>>> + Send {
        async move {
            if self.focus == 0 {
                return Ok(match selector {
                    TOP_ROWS => {
                        self.stats.top_row_queries.fetch_add(1, Ordering::SeqCst);
                        (0..self.world.rows.len()).map(FakeElem::TopRow).collect()
                    }
                    OPEN_SUB_ROWS => {
                        let mut subs = Vec::new();
                        for (r, row) in self.world.rows.iter().enumerate() {
                            if self.expanded[r] {
                                subs.extend((0..row.sub_rows.len()).map(|s| FakeElem::SubRow(r, s)));
                            }
                        }
                        subs
                    }
                    _ => Vec::new(),
                });
            }
            Ok(match selector {
                "body" => vec![FakeElem::Body],
                NARRATIVE if self.detail_visible() => vec![FakeElem::H3],
                ZONE_CHART if self.detail_visible() => vec![FakeElem::Zone],
                BULLET_GROUPS if self.detail_visible() => {
                    if self.detail().map(|d| d.behavior) == Some(DetailBehavior::NoBullets) {
                        Vec::new()
                    } else {
                        vec![FakeElem::Mod(0), FakeElem::Mod(1)]
                    }
                }
                _ => Vec::new(),
            })
        }
    }

    fn find_all_within(
        &mut self,
        root: &Self::Elem,
        selector: &str,
    ) -> impl Future<Output = DriverResult<Vec<Self::Elem>>> + Send {
        let root = root.clone();
        async move {
            match (root, selector) {
                (FakeElem::SubRow(r, s), PANE_ROWS) => Ok(vec![FakeElem::PaneRow(r, s)]),
                (FakeElem::PaneRow(r, s), "span") => {
                    let sub = self.sub_row(r, s);
                    if sub.broken {
                        return Err(DriverError::Page("stale sub-row".into()));
                    }
                    Ok((0..sub.cells.len()).map(|c| FakeElem::Span(r, s, c)).collect())
                }
                (FakeElem::Span(r, s, c), "a") => Ok(match self.sub_row(r, s).cells[c] {
                    Cell::Player(_) => vec![FakeElem::CellAnchor(r, s, c)],
                    Cell::Text(_) => Vec::new(),
                }),
                (FakeElem::PaneRow(r, s), VIDEO_ANCHOR) => Ok(match self.sub_row(r, s).video {
                    Some(_) => vec![FakeElem::VideoAnchor(r, s)],
                    None => Vec::new(),
                }),
                (FakeElem::Mod(1), "li") => Ok(self
                    .detail()
                    .map(|d| (0..d.bullets.len()).map(FakeElem::Li).collect())
                    .unwrap_or_default()),
                _ => Ok(Vec::new()),
            }
        }
    }

    fn read_text(&mut self, el: &Self::Elem) -> impl Future<Output = DriverResult<String>> + Send {
        let el = el.clone();
        async move {
            Ok(match el {
                FakeElem::Span(r, s, c) => match &self.sub_row(r, s).cells[c] {
                    Cell::Text(t) => t.clone(),
                    Cell::Player(href) => href.clone(),
                },
                FakeElem::H3 => self.detail().map(|d| d.description.clone()).unwrap_or_default(),
                FakeElem::Li(i) => self
                    .detail()
                    .and_then(|d| d.bullets.get(i).cloned())
                    .unwrap_or_default(),
                FakeElem::Body => {
                    if self.transient_active() {
                        "This video is temporarily unavailable.".to_string()
                    } else {
                        String::new()
                    }
                }
                _ => String::new(),
            })
        }
    }

    fn read_attribute(
        &mut self,
        el: &Self::Elem,
        name: &str,
    ) -> impl Future<Output = DriverResult<Option<String>>> + Send {
        let el = el.clone();
        async move {
            Ok(match (el, name) {
                (FakeElem::CellAnchor(r, s, c), "href") => match &self.sub_row(r, s).cells[c] {
                    Cell::Player(href) => Some(href.clone()),
                    Cell::Text(_) => None,
                },
                (FakeElem::VideoAnchor(r, s), "href") => self.sub_row(r, s).video.clone(),
                (FakeElem::Zone, "innerHTML") => self.detail().map(|d| d.zone.clone()),
                _ => None,
            })
        }
    }

    fn click(&mut self, el: &Self::Elem) -> impl Future<Output = DriverResult<()>> + Send {
        let el = el.clone();
        async move {
            match el {
                FakeElem::TopRow(i) => {
                    self.stats.expand_clicks.fetch_add(1, Ordering::SeqCst);
                    if self.world.rows[i].expand_fails {
                        Err(DriverError::Page("click intercepted".into()))
                    } else {
                        self.expanded[i] = true;
                        Ok(())
                    }
                }
                _ => Ok(()),
            }
        }
    }

    fn open_in_new_context(
        &mut self,
        url: &str,
    ) -> impl Future<Output = DriverResult<ContextHandle>> + Send {
        let url = url.to_string();
        async move {
            if self.fatal_on_open == Some(self.opens) {
                return Err(DriverError::Fatal("session lost".into()));
            }
            self.opens += 1;
            self.stats.details_opened.fetch_add(1, Ordering::SeqCst);
            self.open_contexts += 1;
            self.focus = 1;
            self.detail_url = Some(url);
            self.reloaded = false;
            Ok(ContextHandle(1))
        }
    }

    fn close_current_context(&mut self) -> impl Future<Output = DriverResult<()>> + Send {
        async move {
            if self.focus == 0 {
                return Err(DriverError::Page("cannot close the base context".into()));
            }
            self.open_contexts -= 1;
            self.focus = 0;
            self.detail_url = None;
            Ok(())
        }
    }

    fn switch_to_context(
        &mut self,
        handle: ContextHandle,
    ) -> impl Future<Output = DriverResult<()>> + Send {
        async move {
            self.focus = handle.0.min(1);
            Ok(())
        }
    }

    fn shutdown(&mut self) -> impl Future<Output = ()> + Send {
        async move {
            self.stats.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }
}
