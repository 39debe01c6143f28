//! Application layer: The prediction pipeline.
//!
//! Feature derivation, vectorization and explanation are pure; the
//! prediction service composes them with the classifier and history ports.

mod derive;
mod explain;
mod prediction;
mod vectorize;

pub use derive::{bp_ratio, heart_rate_category, FeatureDeriver};
pub use explain::{RiskExplainer, RiskFactor};
pub use prediction::{PredictionService, DEFAULT_LOOKBACK_DAYS};
pub use vectorize::FeatureVectorizer;
