use serde::Serialize;

use crate::api::PredictionResponse;
use crate::players::PlayerSnapshot;
use crate::predictor::{MatchFeatures, Surface, Winner};

/// Build the model request for `p1` vs `p2`.
///
/// Differentials are always Player 1 minus Player 2, so a positive
/// `diff_rank` means Player 1 holds the numerically larger (worse) rank.
pub fn build_features(p1: &PlayerSnapshot, p2: &PlayerSnapshot, surface: Surface) -> MatchFeatures {
    MatchFeatures::new(
        i64::from(p1.rank) - i64::from(p2.rank),
        i64::from(p1.points) - i64::from(p2.points),
        surface,
    )
}

/// What the dashboard renders for one prediction.
#[derive(Debug, Clone, Serialize)]
pub struct MatchupView {
    pub winner_name: String,
    pub loser_name: String,
    /// Probability of the predicted winner
    pub winner_probability: f64,
    pub player_1: SideView,
    pub player_2: SideView,
    pub payload: MatchFeatures,
    pub response: PredictionResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct SideView {
    pub name: String,
    pub probability: f64,
}

impl MatchupView {
    pub fn new(
        p1: &PlayerSnapshot,
        p2: &PlayerSnapshot,
        payload: MatchFeatures,
        response: PredictionResponse,
    ) -> Self {
        let p = response.probability_player_1;
        let (winner, loser, winner_probability) = match response.winner {
            Winner::Player1 => (p1, p2, p),
            Winner::Player2 => (p2, p1, 1.0 - p),
        };
        MatchupView {
            winner_name: winner.name.clone(),
            loser_name: loser.name.clone(),
            winner_probability,
            player_1: SideView {
                name: p1.name.clone(),
                probability: p,
            },
            player_2: SideView {
                name: p2.name.clone(),
                probability: 1.0 - p,
            },
            payload,
            response,
        }
    }
}
