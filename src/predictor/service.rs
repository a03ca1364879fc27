use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use super::classifier::{load_model, Classifier};
use super::features::{encode, MatchFeatures};

/// Which side the classifier picks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    #[serde(rename = "Player 1")]
    Player1,
    #[serde(rename = "Player 2")]
    Player2,
}

impl Winner {
    /// Class 1 is a Player 1 win; every other class is a Player 2 win.
    pub fn from_class(class: u8) -> Self {
        if class == 1 {
            Winner::Player1
        } else {
            Winner::Player2
        }
    }

    #[allow(dead_code)]
    pub fn class(&self) -> u8 {
        match self {
            Winner::Player1 => 1,
            Winner::Player2 => 0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Winner::Player1 => "Player 1",
            Winner::Player2 => "Player 2",
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Winner {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Player 1" => Ok(Winner::Player1),
            "Player 2" => Ok(Winner::Player2),
            other => Err(format!("unknown winner label '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub winner: Winner,
    /// P(Player 1 wins), rounded to two decimals
    pub probability_player_1: f64,
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("model unavailable")]
    ModelUnavailable,

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Presentation rounding applied once, as the last step.
///
/// Rounds the exact binary value of `p` to two decimals, ties to even, so
/// `0.125` gives `0.12` and `0.015` (stored just below) gives `0.01`.
pub fn round_probability(p: f64) -> f64 {
    if !p.is_finite() || p == 0.0 {
        return p;
    }
    let bits = p.abs().to_bits();
    let exp = ((bits >> 52) & 0x7ff) as i32;
    let frac = bits & ((1u64 << 52) - 1);
    // |p| == mantissa * 2^shift exactly
    let (mantissa, shift) = if exp == 0 {
        (frac, -1074)
    } else {
        (frac | (1u64 << 52), exp - 1075)
    };
    if shift >= 0 {
        return p;
    }
    let k = (-shift) as u32;
    if k >= 120 {
        return 0.0_f64.copysign(p);
    }

    let scaled = u128::from(mantissa) * 100;
    let whole = scaled >> k;
    let rem = scaled & ((1u128 << k) - 1);
    let half = 1u128 << (k - 1);
    let hundredths = if rem > half || (rem == half && whole % 2 == 1) {
        whole + 1
    } else {
        whole
    };
    (hundredths as f64 / 100.0).copysign(p)
}

/// Serves predictions from a classifier loaded once at startup.
///
/// When the load fails the predictor stays up in a degraded state and every
/// call returns [`PredictError::ModelUnavailable`].
#[derive(Clone)]
pub struct Predictor {
    classifier: Option<Arc<dyn Classifier>>,
}

impl Predictor {
    /// Load the model artifact at `path`, falling back to the degraded state.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match load_model(path) {
            Ok(model) => {
                info!("Model '{}' loaded from {}", model.name(), path.display());
                Predictor {
                    classifier: Some(Arc::from(model)),
                }
            }
            Err(e) => {
                error!("Failed to load model from {}: {}", path.display(), e);
                Predictor::unavailable()
            }
        }
    }

    pub fn with_classifier(classifier: Arc<dyn Classifier>) -> Self {
        Predictor {
            classifier: Some(classifier),
        }
    }

    pub fn unavailable() -> Self {
        Predictor { classifier: None }
    }

    pub fn is_ready(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn predict(&self, features: &MatchFeatures) -> Result<PredictionResult, PredictError> {
        let classifier = self
            .classifier
            .as_ref()
            .ok_or(PredictError::ModelUnavailable)?;

        if features.surface().is_none() {
            warn!(
                "Unrecognised surface '{}', encoding with all surface flags off",
                features.surface
            );
        }
        let x = encode(features);

        let class = classifier.predict_class(&x);
        let probability = classifier.predict_probability(&x);
        if !probability.is_finite() {
            return Err(PredictError::Inference(format!(
                "classifier '{}' returned a non-finite probability",
                classifier.name()
            )));
        }

        Ok(PredictionResult {
            winner: Winner::from_class(class),
            probability_player_1: round_probability(probability.clamp(0.0, 1.0)),
        })
    }
}
