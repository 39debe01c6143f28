//! Feature vectorization: named feature map -> scaled, schema-ordered vector.

use crate::adapters::ArtifactError;
use crate::domain::{FeatureMap, FeatureVector, StandardScaler};

/// Lays features out in the trained model's order and applies its scaler.
///
/// Schema and scaler are fixed at construction and never change afterwards.
#[derive(Debug, Clone)]
pub struct FeatureVectorizer {
    feature_names: Vec<String>,
    scaler: StandardScaler,
}

impl FeatureVectorizer {
    /// Bind a feature schema to the scaler fitted on it.
    ///
    /// # Errors
    /// Returns `ArtifactError::Invalid` if the schema is empty or the scaler
    /// width differs from the schema length.
    pub fn new(feature_names: Vec<String>, scaler: StandardScaler) -> Result<Self, ArtifactError> {
        if feature_names.is_empty() {
            return Err(ArtifactError::Invalid("Feature schema is empty".into()));
        }
        scaler
            .validate(feature_names.len())
            .map_err(ArtifactError::Invalid)?;
        Ok(Self {
            feature_names,
            scaler,
        })
    }

    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Schema-ordered, unscaled values. Names missing from the map become 0;
    /// names outside the schema are dropped.
    #[must_use]
    pub fn raw_vector(&self, features: &FeatureMap) -> FeatureVector {
        FeatureVector::new(
            self.feature_names
                .iter()
                .map(|name| features.get(name).unwrap_or(0.0))
                .collect(),
        )
    }

    /// Model-ready vector: [`raw_vector`](Self::raw_vector) then scaling.
    #[must_use]
    pub fn vectorize(&self, features: &FeatureMap) -> FeatureVector {
        let mut values = self.raw_vector(features).into_inner();
        self.scaler.transform_in_place(&mut values);
        FeatureVector::new(values)
    }
}
