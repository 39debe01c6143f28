//! Pre-fit model artifacts that are not the classifier itself.

use serde::{Deserialize, Serialize};

/// Standard scaling fitted at training time: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Number of columns the scaler was fitted on.
    #[must_use]
    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// Check internal consistency against the expected column count.
    ///
    /// # Errors
    /// Returns a description of the first inconsistency found.
    pub fn validate(&self, expected: usize) -> Result<(), String> {
        if self.mean.len() != expected || self.scale.len() != expected {
            return Err(format!(
                "Scaler width mismatch: mean={}, scale={}, expected {expected}",
                self.mean.len(),
                self.scale.len()
            ));
        }
        if let Some(i) = self
            .mean
            .iter()
            .chain(self.scale.iter())
            .position(|v| !v.is_finite())
        {
            return Err(format!("Scaler parameter {i} is not finite"));
        }
        Ok(())
    }

    /// Scale values in place. Callers guarantee `values.len() == self.width()`.
    ///
    /// A zero scale (constant training column) divides by 1.
    pub fn transform_in_place(&self, values: &mut [f64]) {
        for ((x, mean), scale) in values.iter_mut().zip(&self.mean).zip(&self.scale) {
            let divisor = if *scale == 0.0 { 1.0 } else { *scale };
            *x = (*x - mean) / divisor;
        }
    }
}

/// Descriptive metadata shipped alongside the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_version: String,

    /// Name of the model family selected during training
    pub best_model: String,

    #[serde(default)]
    pub trained_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform() {
        let scaler = StandardScaler {
            mean: vec![10.0, 5.0, 3.0],
            scale: vec![2.0, 0.0, 1.0],
        };
        let mut values = vec![14.0, 7.0, 3.0];
        scaler.transform_in_place(&mut values);
        assert_eq!(values, vec![2.0, 2.0, 0.0]);
    }

    #[test]
    fn test_validate_width() {
        let scaler = StandardScaler {
            mean: vec![0.0; 3],
            scale: vec![1.0; 2],
        };
        assert!(scaler.validate(3).is_err());

        let ok = StandardScaler {
            mean: vec![0.0; 2],
            scale: vec![1.0; 2],
        };
        assert!(ok.validate(2).is_ok());
        assert!(ok.validate(3).is_err());
    }

    #[test]
    fn test_validate_rejects_nan() {
        let scaler = StandardScaler {
            mean: vec![f64::NAN],
            scale: vec![1.0],
        };
        assert!(scaler.validate(1).is_err());
    }
}
