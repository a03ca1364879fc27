//! Latest ranking snapshot per player, derived from the historical match table.
//!
//! Every match row contributes two observations, one per side. After dropping
//! observations whose rank or points do not parse, the most recent one per
//! name wins. Observations are ordered by date descending with a stable sort,
//! so equal dates keep table order (all Player 1 sides before all Player 2
//! sides). Rows with an unparseable date sort after every dated row.
//!
//! The table marks an unranked side with `-1`. That value still parses, so it
//! takes part in picking the latest observation: a player whose latest row is
//! unranked is left out, along with anyone ranked past [`RANK_CUTOFF`].

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Players ranked worse than this are left out of the picker.
pub const RANK_CUTOFF: f64 = 200.0;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Marker shown next to players loaded from the match table.
pub const DEFAULT_COUNTRY: &str = "🎾";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub name: String,
    pub rank: u32,
    pub points: u32,
    pub country: String,
}

/// A single side of a single match.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub name: String,
    pub rank: f64,
    pub points: f64,
    pub date: Option<NaiveDate>,
}

/// Column positions in the match table.
struct Columns {
    date: Option<usize>,
    sides: [(usize, usize, usize); 2],
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .with_context(|| format!("missing column '{}'", name))
        };
        Ok(Columns {
            date: headers.iter().position(|h| h.trim() == "Date"),
            sides: [
                (find("Player_1")?, find("Rank_1")?, find("Pts_1")?),
                (find("Player_2")?, find("Rank_2")?, find("Pts_2")?),
            ],
        })
    }
}

fn default_date() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2024, 1, 1)
}

/// Lenient numeric coercion: anything that is not a finite number is dropped.
fn parse_number(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn observation(record: &StringRecord, side: (usize, usize, usize), date: Option<NaiveDate>) -> Option<Observation> {
    let (name_col, rank_col, pts_col) = side;
    let name = record.get(name_col)?.trim();
    if name.is_empty() {
        return None;
    }
    let rank = parse_number(record.get(rank_col))?;
    let points = parse_number(record.get(pts_col))?;
    Some(Observation {
        name: name.to_string(),
        rank,
        points,
        date,
    })
}

/// Read a match table and return the latest snapshot per player, top
/// [`RANK_CUTOFF`] only, best rank first.
pub fn read_snapshots<R: Read>(reader: R) -> Result<Vec<PlayerSnapshot>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers().context("Failed to read CSV header")?.clone();
    let columns = Columns::locate(&headers)?;

    let mut first_side = Vec::new();
    let mut second_side = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("Malformed CSV row {}", line + 1))?;
        let date = match columns.date {
            Some(col) => record
                .get(col)
                .and_then(|d| NaiveDate::parse_from_str(d.trim(), DATE_FORMAT).ok()),
            None => default_date(),
        };
        first_side.extend(observation(&record, columns.sides[0], date));
        second_side.extend(observation(&record, columns.sides[1], date));
    }

    first_side.extend(second_side);
    Ok(latest_snapshots(first_side))
}

/// Deduplicate observations into one snapshot per name.
pub fn latest_snapshots(mut observations: Vec<Observation>) -> Vec<PlayerSnapshot> {
    // `sort_by_key` is stable; `Reverse(None)` orders after every `Reverse(Some(_))`.
    observations.sort_by_key(|o| Reverse(o.date));

    let mut seen = HashSet::new();
    let mut latest: Vec<Observation> = observations
        .into_iter()
        .filter(|o| seen.insert(o.name.clone()))
        .filter(|o| o.rank >= 1.0 && o.points >= 0.0 && o.rank <= RANK_CUTOFF)
        .collect();
    latest.sort_by(|a, b| a.rank.total_cmp(&b.rank));

    latest
        .into_iter()
        .map(|o| PlayerSnapshot {
            name: o.name,
            rank: o.rank as u32,
            points: o.points as u32,
            country: DEFAULT_COUNTRY.to_string(),
        })
        .collect()
}

/// Load snapshots from `path`. A missing or unreadable table yields an empty
/// list, never an error.
pub fn load_latest_snapshots(path: impl AsRef<Path>) -> Vec<PlayerSnapshot> {
    let path = path.as_ref();
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Player table not found at {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    match read_snapshots(file) {
        Ok(players) => {
            info!("Loaded {} players from {}", players.len(), path.display());
            players
        }
        Err(e) => {
            warn!("Failed to process player table {}: {:#}", path.display(), e);
            Vec::new()
        }
    }
}
