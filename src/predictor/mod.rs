pub mod classifier;
pub mod features;
pub mod service;

pub use features::{MatchFeatures, Surface};
pub use service::{PredictError, Predictor, Winner};
