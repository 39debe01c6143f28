//! Risk classifier port: Trait for the opaque trained model.
//!
//! The concrete model (and its serialization format) is injected at startup;
//! the pipeline only sees a fixed-length vector in and a class id plus
//! per-class probabilities out.

use crate::domain::FeatureVector;

/// Errors raised by a classifier implementation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifierError {
    #[error("Feature dimension mismatch: got {got}, expected {expected}")]
    DimensionMismatch { got: usize, expected: usize },

    #[error("Invalid probability output: {0}")]
    InvalidProbabilities(String),

    #[error("Class label order mismatch: expected {expected:?}, model declares {actual:?}")]
    ClassOrder {
        expected: Vec<String>,
        actual: Vec<String>,
    },
}

/// Trait for a trained multi-class risk model.
///
/// Implementations must be immutable after construction; they are shared
/// across concurrent requests.
pub trait RiskClassifier: Send + Sync {
    /// Predict the class id for a scaled feature vector.
    ///
    /// # Errors
    /// Returns `ClassifierError::DimensionMismatch` if the vector length
    /// differs from the model input width.
    fn predict(&self, features: &FeatureVector) -> Result<i64, ClassifierError>;

    /// Per-class probabilities, in the order of [`class_labels`](Self::class_labels).
    ///
    /// # Errors
    /// Returns `ClassifierError::DimensionMismatch` if the vector length
    /// differs from the model input width.
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, ClassifierError>;

    /// Class names the model was trained with, in column order.
    fn class_labels(&self) -> &[String];

    /// Class id `predict` returns for each column, in column order.
    fn class_ids(&self) -> &[i64];
}
