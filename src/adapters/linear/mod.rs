//! Linear softmax adapter: Implementation of RiskClassifier.
//!
//! Evaluates a multinomial logistic regression exported as JSON
//! (`model.json`): one coefficient row and intercept per class, softmax over
//! the class scores.

use serde::{Deserialize, Serialize};

use crate::domain::{FeatureVector, RiskLevel};
use crate::ports::{ClassifierError, RiskClassifier};

/// Model parameters exported by the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSoftmaxClassifier {
    /// Family name reported by training (informational)
    pub model_type: String,

    /// Class id per output column
    pub classes: Vec<i64>,

    /// Class name per output column
    pub class_labels: Vec<String>,

    /// `coefficients[class][feature]`
    pub coefficients: Vec<Vec<f64>>,

    pub intercepts: Vec<f64>,
}

impl LinearSoftmaxClassifier {
    /// Number of input features expected.
    #[must_use]
    pub fn input_width(&self) -> usize {
        self.coefficients.first().map_or(0, Vec::len)
    }

    /// Check that every parameter array agrees with `n_features` and the class count.
    ///
    /// # Errors
    /// Returns a description of the first inconsistency.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        let n_classes = self.classes.len();
        if n_classes < 2 {
            return Err(format!("Model needs at least 2 classes, got {n_classes}"));
        }
        if self.class_labels.len() != n_classes
            || self.coefficients.len() != n_classes
            || self.intercepts.len() != n_classes
        {
            return Err(format!(
                "Class count mismatch: classes={}, labels={}, coefficient rows={}, intercepts={}",
                n_classes,
                self.class_labels.len(),
                self.coefficients.len(),
                self.intercepts.len()
            ));
        }
        if let Some((id, label)) = self
            .classes
            .iter()
            .zip(&self.class_labels)
            .find(|(id, label)| RiskLevel::from_class_id(**id).label() != label.as_str())
        {
            return Err(format!(
                "Class id {id} is labelled {label:?} but maps to {}",
                RiskLevel::from_class_id(*id)
            ));
        }
        if let Some(row) = self.coefficients.iter().position(|r| r.len() != n_features) {
            return Err(format!(
                "Coefficient row {row} has {} entries, expected {n_features}",
                self.coefficients[row].len()
            ));
        }
        let all_finite = self
            .coefficients
            .iter()
            .flatten()
            .chain(self.intercepts.iter())
            .all(|v| v.is_finite());
        if !all_finite {
            return Err("Model parameters must be finite".into());
        }
        Ok(())
    }

    fn check_width(&self, features: &FeatureVector) -> Result<(), ClassifierError> {
        let expected = self.input_width();
        if features.len() != expected {
            return Err(ClassifierError::DimensionMismatch {
                got: features.len(),
                expected,
            });
        }
        Ok(())
    }

    fn scores(&self, x: &[f64]) -> Vec<f64> {
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + b)
            .collect()
    }

    /// Numerically stable softmax.
    fn softmax(scores: &[f64]) -> Vec<f64> {
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
        let total: f64 = exps.iter().sum();
        exps.into_iter().map(|e| e / total).collect()
    }
}

impl RiskClassifier for LinearSoftmaxClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<i64, ClassifierError> {
        let proba = self.predict_proba(features)?;
        let best = proba
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(bi, bp), (i, &p)| {
                if p > bp {
                    (i, p)
                } else {
                    (bi, bp)
                }
            })
            .0;
        Ok(self.classes[best])
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, ClassifierError> {
        self.check_width(features)?;
        let proba = Self::softmax(&self.scores(features.as_slice()));
        if proba.iter().any(|p| !p.is_finite()) {
            return Err(ClassifierError::InvalidProbabilities(
                "softmax overflowed".into(),
            ));
        }
        Ok(proba)
    }

    fn class_labels(&self) -> &[String] {
        &self.class_labels
    }

    fn class_ids(&self) -> &[i64] {
        &self.classes
    }
}
