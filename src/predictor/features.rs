//! Match features and their one-hot encoding.
//!
//! The trained model was fit on exactly five columns, in this order:
//!
//! ```text
//! diff_rank, diff_pts, Surface_Clay, Surface_Grass, Surface_Hard
//! ```
//!
//! [`FEATURE_COLUMNS`] is the only place that order is written down. The model
//! artifact carries its own copy of the names and is rejected at load time if
//! the two disagree.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of inputs the classifier consumes.
pub const FEATURE_COUNT: usize = 5;

/// Column names and order the classifier was trained on.
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "diff_rank",
    "diff_pts",
    "Surface_Clay",
    "Surface_Grass",
    "Surface_Hard",
];

/// Court surface recognised by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Surface {
    Hard,
    Clay,
    Grass,
}

impl Surface {
    #[allow(dead_code)]
    pub const ALL: [Surface; 3] = [Surface::Hard, Surface::Clay, Surface::Grass];

    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Hard => "Hard",
            Surface::Clay => "Clay",
            Surface::Grass => "Grass",
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Surface {
    type Err = String;

    /// Exact, case-sensitive match on the training labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Hard" => Ok(Surface::Hard),
            "Clay" => Ok(Surface::Clay),
            "Grass" => Ok(Surface::Grass),
            other => Err(format!("unknown surface '{}'", other)),
        }
    }
}

/// Request body of `POST /predict`.
///
/// `surface` stays a free string: an unrecognised value is accepted and
/// encodes to all-zero surface flags instead of failing validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFeatures {
    /// Player 1 rank minus Player 2 rank (positive = Player 1 ranked worse)
    pub diff_rank: i64,
    /// Player 1 points minus Player 2 points
    pub diff_pts: i64,
    /// "Hard" | "Clay" | "Grass"
    pub surface: String,
}

impl MatchFeatures {
    pub fn new(diff_rank: i64, diff_pts: i64, surface: Surface) -> Self {
        MatchFeatures {
            diff_rank,
            diff_pts,
            surface: surface.as_str().to_string(),
        }
    }

    /// The recognised surface, if any.
    pub fn surface(&self) -> Option<Surface> {
        self.surface.parse().ok()
    }
}

/// Model input after one-hot expansion of the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EncodedFeatureVector {
    pub diff_rank: i64,
    pub diff_pts: i64,
    #[serde(rename = "Surface_Clay")]
    pub surface_clay: u8,
    #[serde(rename = "Surface_Grass")]
    pub surface_grass: u8,
    #[serde(rename = "Surface_Hard")]
    pub surface_hard: u8,
}

impl EncodedFeatureVector {
    /// Values laid out in [`FEATURE_COLUMNS`] order.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.diff_rank as f64,
            self.diff_pts as f64,
            f64::from(self.surface_clay),
            f64::from(self.surface_grass),
            f64::from(self.surface_hard),
        ]
    }

    #[allow(dead_code)]
    pub fn surface_flags(&self) -> [u8; 3] {
        [self.surface_clay, self.surface_grass, self.surface_hard]
    }
}

/// One-hot encode `features`.
///
/// Exactly one surface flag is set for a recognised surface. Anything else
/// leaves all three at zero; this mirrors how the model is served today and
/// is a known gap rather than a validation rule.
pub fn encode(features: &MatchFeatures) -> EncodedFeatureVector {
    let surface = features.surface();
    let flag = |s: Surface| u8::from(surface == Some(s));
    EncodedFeatureVector {
        diff_rank: features.diff_rank,
        diff_pts: features.diff_pts,
        surface_clay: flag(Surface::Clay),
        surface_grass: flag(Surface::Grass),
        surface_hard: flag(Surface::Hard),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_surface_sets_exactly_one_flag() {
        for surface in Surface::ALL {
            let encoded = encode(&MatchFeatures::new(3, -250, surface));
            let flags = encoded.surface_flags();
            assert_eq!(flags.iter().map(|f| u32::from(*f)).sum::<u32>(), 1, "{surface}");
            assert!(flags.iter().all(|f| *f <= 1));
        }
    }

    #[test]
    fn test_flag_positions_follow_column_order() {
        let clay = encode(&MatchFeatures::new(0, 0, Surface::Clay));
        assert_eq!(clay.to_array(), [0.0, 0.0, 1.0, 0.0, 0.0]);
        let grass = encode(&MatchFeatures::new(0, 0, Surface::Grass));
        assert_eq!(grass.to_array(), [0.0, 0.0, 0.0, 1.0, 0.0]);
        let hard = encode(&MatchFeatures::new(0, 0, Surface::Hard));
        assert_eq!(hard.to_array(), [0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_differentials_pass_through() {
        let encoded = encode(&MatchFeatures::new(-12, 4310, Surface::Hard));
        assert_eq!(encoded.diff_rank, -12);
        assert_eq!(encoded.diff_pts, 4310);
        assert_eq!(&encoded.to_array()[..2], &[-12.0, 4310.0]);
    }

    #[test]
    fn test_unknown_surface_encodes_all_zero() {
        for raw in ["Carpet", "hard", "", " Clay"] {
            let features = MatchFeatures {
                diff_rank: 1,
                diff_pts: 1,
                surface: raw.to_string(),
            };
            assert_eq!(encode(&features).surface_flags(), [0, 0, 0], "{raw:?}");
        }
    }

    #[test]
    fn test_serialized_names_match_schema() {
        let encoded = encode(&MatchFeatures::new(1, 2, Surface::Grass));
        let value = serde_json::to_value(encoded).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        for column in FEATURE_COLUMNS {
            assert!(keys.contains(&column), "missing {column}");
        }
        assert_eq!(keys.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_surface_parse_round_trip() {
        for surface in Surface::ALL {
            assert_eq!(surface.to_string().parse::<Surface>(), Ok(surface));
        }
        assert!("Carpet".parse::<Surface>().is_err());
    }
}
