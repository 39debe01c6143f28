//! Named feature maps and model-ready feature vectors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::reading::VitalField;

/// Feature names produced by derivation (besides the direct vital fields,
/// which use [`VitalField::name`]).
pub mod names {
    pub const DELTA_SYS_3D: &str = "delta_sys_3d";
    pub const DELTA_DIA_3D: &str = "delta_dia_3d";
    pub const DELTA_SUGAR_3D: &str = "delta_sugar_3d";
    pub const DELTA_HR_3D: &str = "delta_hr_3d";
    pub const STD_SYS_7D: &str = "std_sys_7d";
    pub const BP_RATIO: &str = "bp_ratio";
    pub const HEART_RATE_CATEGORY: &str = "heart_rate_category";
}

/// Unscaled feature values keyed by feature name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureMap(BTreeMap<String, f64>);

impl FeatureMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Value of a direct vital feature, or the field default if absent.
    #[must_use]
    pub fn vital(&self, field: VitalField) -> f64 {
        self.get(field.name())
            .unwrap_or_else(|| field.default_value())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Ordered numeric input for the scaler and classifier.
///
/// Its length always equals the length of the feature schema it was built
/// against.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vital_lookup_falls_back_to_default() {
        let mut map = FeatureMap::new();
        map.insert("heart_rate", 110.0);

        assert_eq!(map.vital(VitalField::HeartRate), 110.0);
        assert_eq!(map.vital(VitalField::Glucose), 100.0);
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let mut map = FeatureMap::new();
        map.insert(names::BP_RATIO, 1.5);
        let json = serde_json::to_value(&map).expect("Should serialize");
        assert_eq!(json["bp_ratio"], 1.5);
    }
}
