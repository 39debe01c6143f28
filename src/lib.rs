//! # VitalRisk
//!
//! Health-risk scoring from a single vitals reading and the user's recent
//! record history.
//!
//! This crate provides:
//! - Feature derivation (rolling deltas, variability, ratios)
//! - Linear softmax classification over a signed model bundle
//! - Threshold-based risk factors and narrative explanations
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (Reading, HistoricalSnapshot, PredictionResult)
//! - `ports`: Trait definitions for the classifier and record history
//! - `adapters`: Concrete implementations (model bundle, SQLite, log sanitizer)
//! - `application`: The prediction pipeline
//! - `config`: Environment-driven service settings

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::PredictionService;
pub use config::ServiceConfig;
pub use domain::{PredictionRequest, PredictionResult, Reading, RiskLevel};

/// Result type for VitalRisk operations
pub type Result<T> = std::result::Result<T, VitalRiskError>;

/// Main error type for VitalRisk
#[derive(Debug, thiserror::Error)]
pub enum VitalRiskError {
    #[error("Model artifacts unavailable: {0}")]
    Artifact(#[from] adapters::ArtifactError),

    #[error("Classifier failed: {0}")]
    Classifier(#[from] ports::ClassifierError),
}
