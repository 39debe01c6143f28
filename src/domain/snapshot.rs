//! Historical health-record snapshots.
//!
//! Stored records keep the nested vital-group shape of the record store
//! (`{"bloodPressure": {"systolic": 128}}`), unlike the flat live reading.
//! Nested values are reached through explicit [`FieldPath`]s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::reading::coerce_f64;

/// Dotted path into a nested snapshot document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPath(&'static str);

impl FieldPath {
    pub const SYSTOLIC: FieldPath = FieldPath::new("bloodPressure.systolic");
    pub const DIASTOLIC: FieldPath = FieldPath::new("bloodPressure.diastolic");
    pub const GLUCOSE: FieldPath = FieldPath::new("bloodSugar.value");
    pub const HEART_RATE: FieldPath = FieldPath::new("heartRate.value");

    #[must_use]
    pub const fn new(path: &'static str) -> Self {
        Self(path)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Walk the document one key at a time.
    ///
    /// Returns `None` as soon as a key is absent or an intermediate value is
    /// not an object.
    #[must_use]
    pub fn resolve<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.0
            .split('.')
            .try_fold(document, |node, key| node.as_object()?.get(key))
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// One previously stored vitals record for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSnapshot {
    /// Capture time of the record
    pub recorded_at: DateTime<Utc>,

    /// Nested vital groups as stored
    pub vitals: Value,
}

impl HistoricalSnapshot {
    #[must_use]
    pub fn new(recorded_at: DateTime<Utc>, vitals: Value) -> Self {
        Self {
            recorded_at,
            vitals,
        }
    }

    /// Numeric value at `path`; absent or non-numeric values are `None`.
    #[must_use]
    pub fn numeric(&self, path: FieldPath) -> Option<f64> {
        coerce_f64(path.resolve(&self.vitals))
    }
}
