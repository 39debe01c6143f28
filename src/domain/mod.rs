//! Domain layer: Core business types.
//!
//! Readings, historical snapshots, feature maps and prediction results.
//! Nothing here performs I/O.

mod features;
mod model;
mod prediction;
mod reading;
mod request;
mod snapshot;

pub use features::{names, FeatureMap, FeatureVector};
pub use model::{ModelMetadata, StandardScaler};
pub use prediction::{ClassProbabilities, PredictionResult, RiskLevel, ServiceHealth};
pub use reading::{Reading, VitalField};
pub use request::{is_object_id, PredictionRequest};
pub use snapshot::{FieldPath, HistoricalSnapshot};
