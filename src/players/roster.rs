use serde::Serialize;
use std::path::Path;
use tracing::warn;

use super::snapshot::{load_latest_snapshots, PlayerSnapshot};

/// Players offered by the picker, in display order.
#[derive(Debug, Clone, Serialize)]
pub struct Roster {
    pub players: Vec<PlayerSnapshot>,
    /// True when the match table was unusable and the demo roster is served
    pub fallback: bool,
}

impl Roster {
    /// Build the roster from the match table, falling back to [`demo_roster`]
    /// when the table yields nobody.
    pub fn load(csv_path: impl AsRef<Path>) -> Self {
        Self::from_snapshots(load_latest_snapshots(csv_path))
    }

    pub fn from_snapshots(players: Vec<PlayerSnapshot>) -> Self {
        if players.is_empty() {
            warn!("No players available from the match table, using the demo roster");
            Roster {
                players: demo_roster(),
                fallback: true,
            }
        } else {
            Roster {
                players,
                fallback: false,
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.name == name)
    }
}

/// Hardcoded players so the picker stays usable without data.
pub fn demo_roster() -> Vec<PlayerSnapshot> {
    [
        ("Novak Djokovic (Demo)", 1, 11000, "🇷🇸"),
        ("Carlos Alcaraz (Demo)", 2, 8800, "🇪🇸"),
        ("Jannik Sinner (Demo)", 3, 7000, "🇮🇹"),
    ]
    .into_iter()
    .map(|(name, rank, points, country)| PlayerSnapshot {
        name: name.to_string(),
        rank,
        points,
        country: country.to_string(),
    })
    .collect()
}
