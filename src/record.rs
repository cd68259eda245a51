use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)\s*-\s*(\d+)").unwrap());

/// One stolen-base attempt. Every field is a plain string and an empty
/// string means "not captured" — downstream consumers tolerate gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SbRecord {
    pub date: String,
    pub catcher_name: String,
    pub pitcher_name: String,
    pub runner_name: String,
    pub batter_name: String,
    pub fielder_name: String,
    pub target_base: String,
    pub result: String,
    pub runner_stealing_runs: String,
    pub lead_distance_gained: String,
    pub at_pitchers_first_move: String,
    pub at_pitch_release: String,
    pub ball_count: String,
    pub strike_count: String,
    pub pitch_type: String,
    pub velo: String,
    pub description: String,
    pub match_up: String,
    pub strike_zone: String,
    /// Detail reference: href of the sub-row's video anchor. Empty means
    /// the record has no detail page and is persisted as-is.
    pub video_link: String,
}

/// Column order of the sink file. Must match `csv_fields`.
pub const HEADER: [&str; 20] = [
    "date",
    "catcher_name",
    "pitcher_name",
    "runner_name",
    "batter_name",
    "fielder_name",
    "target_base",
    "result",
    "runner_stealing_runs",
    "lead_distance_gained",
    "at_pitchers_first_move",
    "at_pitch_release",
    "ball_count",
    "strike_count",
    "pitch_type",
    "velo",
    "description",
    "match_up",
    "strike_zone",
    "video_link",
];

impl SbRecord {
    /// Build a record from the span values of one leaderboard sub-row.
    ///
    /// Mapping is by fixed position in the source table's column order.
    /// Position 2 is the row's internal link cell and carries nothing we
    /// keep; the pitcher is only named on the detail page. A short input
    /// leaves the missing positions empty — never an error.
    pub fn from_table_fields(values: &[String]) -> Self {
        SbRecord {
            date: pos(values, 0),
            catcher_name: pos(values, 1),
            runner_name: pos(values, 3),
            fielder_name: pos(values, 4),
            target_base: pos(values, 5),
            result: pos(values, 6),
            runner_stealing_runs: pos(values, 7),
            lead_distance_gained: pos(values, 8),
            at_pitchers_first_move: pos(values, 9),
            at_pitch_release: pos(values, 10),
            ..SbRecord::default()
        }
    }

    /// Fill enrichment fields from the detail page's bullet values, again
    /// by fixed position. Values the page omits stay empty.
    pub fn apply_detail_fields(&mut self, values: &[String]) {
        if let Some(name) = swap_name(&pos(values, 0)) {
            self.batter_name = name;
        }
        if let Some(name) = swap_name(&pos(values, 1)) {
            self.pitcher_name = name;
        }
        if let Some(caps) = COUNT_RE.captures(&pos(values, 2)) {
            self.ball_count = caps[1].to_string();
            self.strike_count = caps[2].to_string();
        }
        self.pitch_type = pos(values, 3);
        self.velo = pos(values, 4);
        self.match_up = pos(values, 7);
    }

    /// Field values in `HEADER` order, for the sink.
    pub fn csv_fields(&self) -> [&str; 20] {
        [
            &self.date,
            &self.catcher_name,
            &self.pitcher_name,
            &self.runner_name,
            &self.batter_name,
            &self.fielder_name,
            &self.target_base,
            &self.result,
            &self.runner_stealing_runs,
            &self.lead_distance_gained,
            &self.at_pitchers_first_move,
            &self.at_pitch_release,
            &self.ball_count,
            &self.strike_count,
            &self.pitch_type,
            &self.velo,
            &self.description,
            &self.match_up,
            &self.strike_zone,
            &self.video_link,
        ]
    }

    /// Records without a detail reference skip enrichment entirely.
    pub fn needs_enrichment(&self) -> bool {
        !self.video_link.is_empty()
    }
}

fn pos(values: &[String], idx: usize) -> String {
    values.get(idx).cloned().unwrap_or_default()
}

/// "Last, First" → "First | Last". Returns None when the value does not
/// look like a comma-separated name.
fn swap_name(raw: &str) -> Option<String> {
    let (last, first) = raw.split_once(',')?;
    Some(format!("{} | {}", first.trim(), last.trim()))
}

// ── Tests ──
