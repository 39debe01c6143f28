//! Feature derivation: reading + optional history -> named feature map.
//!
//! Derivation never fails. Missing or malformed inputs resolve to defaults and
//! sparse history resolves to neutral (zero) rolling features.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{names, FeatureMap, FieldPath, HistoricalSnapshot, Reading, VitalField};

/// Default width of the window the `delta_*_3d` means are taken over.
const DELTA_WINDOW_DAYS: i64 = 3;

/// Rolling deltas: (feature name, current vital, nested history path).
const DELTA_FEATURES: [(&str, VitalField, FieldPath); 4] = [
    (names::DELTA_SYS_3D, VitalField::BpSystolic, FieldPath::SYSTOLIC),
    (names::DELTA_DIA_3D, VitalField::BpDiastolic, FieldPath::DIASTOLIC),
    (names::DELTA_SUGAR_3D, VitalField::Glucose, FieldPath::GLUCOSE),
    (names::DELTA_HR_3D, VitalField::HeartRate, FieldPath::HEART_RATE),
];

/// Turns a live reading and optional history into model features.
#[derive(Debug, Clone)]
pub struct FeatureDeriver {
    delta_window: Duration,
}

impl Default for FeatureDeriver {
    fn default() -> Self {
        Self {
            delta_window: Duration::days(DELTA_WINDOW_DAYS),
        }
    }
}

impl FeatureDeriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive features as of now.
    ///
    /// `history` is `None` for the no-history path (e.g. anonymous requests);
    /// an empty slice runs the history-aware path with no samples.
    #[must_use]
    pub fn derive(
        &self,
        reading: &Reading,
        history: Option<&[HistoricalSnapshot]>,
    ) -> FeatureMap {
        self.derive_at(reading, history, Utc::now())
    }

    /// Derive features with an explicit reference time for the delta window.
    #[must_use]
    pub fn derive_at(
        &self,
        reading: &Reading,
        history: Option<&[HistoricalSnapshot]>,
        now: DateTime<Utc>,
    ) -> FeatureMap {
        let mut features = FeatureMap::new();

        for field in VitalField::DIRECT {
            features.insert(field.name(), reading.value_or_default(field));
        }

        match history {
            Some(snapshots) => self.insert_rolling(&mut features, snapshots, now),
            None => {
                for (name, _, _) in DELTA_FEATURES {
                    features.insert(name, 0.0);
                }
                features.insert(names::STD_SYS_7D, 0.0);
                features.insert(
                    VitalField::BmiEstimate.name(),
                    reading.value_or_default(VitalField::BmiEstimate),
                );
            }
        }

        let systolic = features.vital(VitalField::BpSystolic);
        let diastolic = features.vital(VitalField::BpDiastolic);
        features.insert(names::BP_RATIO, bp_ratio(systolic, diastolic));
        features.insert(
            names::HEART_RATE_CATEGORY,
            heart_rate_category(features.vital(VitalField::HeartRate)),
        );

        features
    }

    fn insert_rolling(
        &self,
        features: &mut FeatureMap,
        snapshots: &[HistoricalSnapshot],
        now: DateTime<Utc>,
    ) {
        let cutoff = now - self.delta_window;
        let recent: Vec<&HistoricalSnapshot> = snapshots
            .iter()
            .filter(|s| s.recorded_at >= cutoff)
            .collect();

        for (name, field, path) in DELTA_FEATURES {
            let delta = mean(recent.iter().filter_map(|s| s.numeric(path)))
                .map_or(0.0, |m| features.vital(field) - m);
            features.insert(name, delta);
        }

        let systolic: Vec<f64> = snapshots
            .iter()
            .filter_map(|s| s.numeric(FieldPath::SYSTOLIC))
            .collect();
        features.insert(names::STD_SYS_7D, sample_std(&systolic).unwrap_or(0.0));

        tracing::debug!(
            total = snapshots.len(),
            in_window = recent.len(),
            "Computed rolling features"
        );
    }
}

/// Systolic over diastolic; 1.0 when diastolic is zero.
#[must_use]
pub fn bp_ratio(systolic: f64, diastolic: f64) -> f64 {
    if diastolic == 0.0 {
        1.0
    } else {
        systolic / diastolic
    }
}

/// 0 = bradycardic (<60), 1 = normal (60..=100), 2 = tachycardic (>100).
#[must_use]
pub fn heart_rate_category(heart_rate: f64) -> f64 {
    if heart_rate < 60.0 {
        0.0
    } else if heart_rate <= 100.0 {
        1.0
    } else {
        2.0
    }
}

/// Arithmetic mean; `None` with no samples.
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Sample standard deviation (n - 1); `None` with fewer than two samples.
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let m = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}
