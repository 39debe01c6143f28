//! Real-time vital-sign readings.
//!
//! A reading is a flat `name -> value` map as it arrives from the device feed.
//! Every field is optional and every value is coerced leniently: anything that
//! is missing or not numeric resolves to the field's clinical default.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Vital-sign fields read directly from a live reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VitalField {
    /// Beats per minute
    HeartRate,
    /// Systolic blood pressure in mmHg
    BpSystolic,
    /// Diastolic blood pressure in mmHg
    BpDiastolic,
    /// Blood glucose in mg/dL
    Glucose,
    /// Hours slept in the last night
    SleepHours,
    /// Body temperature in °F
    Temperature,
    /// Oxygen saturation (SpO2) in %
    OxygenLevel,
    /// Age in years
    Age,
    /// Estimated body-mass index (anonymous path only)
    BmiEstimate,
}

impl VitalField {
    /// The eight fields that always become direct features.
    pub const DIRECT: [VitalField; 8] = [
        Self::HeartRate,
        Self::BpSystolic,
        Self::BpDiastolic,
        Self::Glucose,
        Self::SleepHours,
        Self::Temperature,
        Self::OxygenLevel,
        Self::Age,
    ];

    /// Fields a prediction request must carry.
    pub const REQUIRED: [VitalField; 5] = [
        Self::HeartRate,
        Self::BpSystolic,
        Self::BpDiastolic,
        Self::Glucose,
        Self::SleepHours,
    ];

    /// Wire name of the field (also its feature name).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::HeartRate => "heart_rate",
            Self::BpSystolic => "bp_systolic",
            Self::BpDiastolic => "bp_diastolic",
            Self::Glucose => "glucose",
            Self::SleepHours => "sleep_hours",
            Self::Temperature => "temperature",
            Self::OxygenLevel => "oxygen_level",
            Self::Age => "age",
            Self::BmiEstimate => "bmi_estimate",
        }
    }

    /// Clinically plausible value used when the reading lacks this field.
    #[must_use]
    pub fn default_value(self) -> f64 {
        match self {
            Self::HeartRate => 75.0,
            Self::BpSystolic => 120.0,
            Self::BpDiastolic => 80.0,
            Self::Glucose => 100.0,
            Self::SleepHours => 7.0,
            Self::Temperature => 98.6,
            Self::OxygenLevel => 98.0,
            Self::Age => 65.0,
            Self::BmiEstimate => 25.0,
        }
    }
}

impl std::fmt::Display for VitalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Coerce a JSON value to a finite `f64`.
///
/// Accepts numbers and numeric strings. Booleans, null, containers and
/// non-finite results are rejected.
pub(crate) fn coerce_f64(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// A single real-time vitals snapshot for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reading {
    fields: Map<String, Value>,
}

impl Reading {
    /// Create an empty reading (every field resolves to its default).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already-parsed JSON object.
    #[must_use]
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Builder-style setter.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a raw field value.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.fields.insert(name.to_string(), value.into());
    }

    /// Whether the raw field is present, numeric or not.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Coerced value of `field`, if present and numeric.
    #[must_use]
    pub fn numeric(&self, field: VitalField) -> Option<f64> {
        coerce_f64(self.fields.get(field.name()))
    }

    /// Coerced value of `field`, or its clinical default.
    #[must_use]
    pub fn value_or_default(&self, field: VitalField) -> f64 {
        self.numeric(field).unwrap_or_else(|| field.default_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_values_pass_through() {
        let reading = Reading::new().with("heart_rate", 88).with("glucose", 101.5);
        assert_eq!(reading.value_or_default(VitalField::HeartRate), 88.0);
        assert_eq!(reading.value_or_default(VitalField::Glucose), 101.5);
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let reading = Reading::new().with("bp_systolic", " 132 ");
        assert_eq!(reading.value_or_default(VitalField::BpSystolic), 132.0);
    }

    #[test]
    fn test_missing_and_garbage_fall_back_to_default() {
        let reading = Reading::new()
            .with("temperature", "warm")
            .with("oxygen_level", json!(null))
            .with("age", json!(true))
            .with("sleep_hours", json!([7]));

        for field in [
            VitalField::Temperature,
            VitalField::OxygenLevel,
            VitalField::Age,
            VitalField::SleepHours,
            VitalField::HeartRate,
        ] {
            assert_eq!(reading.value_or_default(field), field.default_value());
        }
    }

    #[test]
    fn test_non_finite_strings_are_rejected() {
        let reading = Reading::new().with("glucose", "NaN").with("age", "inf");
        assert_eq!(reading.numeric(VitalField::Glucose), None);
        assert_eq!(reading.numeric(VitalField::Age), None);
    }

    #[test]
    fn test_deserializes_from_flat_object() {
        let reading: Reading =
            serde_json::from_value(json!({"heart_rate": 61, "bmi_estimate": "27.5"}))
                .expect("Should parse");
        assert!(reading.contains("heart_rate"));
        assert_eq!(reading.value_or_default(VitalField::BmiEstimate), 27.5);
    }
}
