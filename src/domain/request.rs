//! Prediction request envelope and calling-layer validation.

use serde_json::Value;

use super::reading::{Reading, VitalField};

const USER_ID_KEY: &str = "userId";

/// A reading plus the optional identity of the user it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub user_id: Option<String>,
    pub reading: Reading,
}

impl PredictionRequest {
    #[must_use]
    pub fn new(reading: Reading, user_id: Option<String>) -> Self {
        Self { user_id, reading }
    }

    /// Split a flat JSON request into user id and reading fields.
    ///
    /// # Errors
    /// Returns an error if the payload is not a JSON object.
    pub fn from_json(value: Value) -> Result<Self, String> {
        let Value::Object(mut fields) = value else {
            return Err("No JSON data provided".to_string());
        };

        let user_id = match fields.remove(USER_ID_KEY) {
            // Blank ids are anonymous requests.
            None | Some(Value::Null | Value::Bool(false)) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::Number(n)) if n.as_f64() == Some(0.0) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };

        Ok(Self {
            user_id,
            reading: Reading::from_map(fields),
        })
    }

    /// Check required fields and user id format.
    ///
    /// # Errors
    /// Returns every problem found, as human-readable strings.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Some(id) = &self.user_id {
            if !is_object_id(id) {
                errors.push("Invalid userId".to_string());
            }
        }

        let missing: Vec<&str> = VitalField::REQUIRED
            .iter()
            .filter(|f| !self.reading.contains(f.name()))
            .map(|f| f.name())
            .collect();
        if !missing.is_empty() {
            errors.push(format!("Missing required fields: {}", missing.join(", ")));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// 24-character hexadecimal record-store object id.
#[must_use]
pub fn is_object_id(id: &str) -> bool {
    id.len() == 24 && id.bytes().all(|b| b.is_ascii_hexdigit())
}
