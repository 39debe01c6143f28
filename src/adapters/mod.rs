//! Adapters layer: Concrete implementations of ports.
//!
//! - `artifacts`: model bundle loading and integrity checks
//! - `linear`: softmax classifier over exported coefficients
//! - `sqlite`: SQLite health-record history
//! - `sanitize`: identifier filtering for logs

pub mod artifacts;
pub mod linear;
pub mod sanitize;
pub mod sqlite;

pub use artifacts::{ArtifactError, ArtifactLoader, ModelArtifacts};
pub use linear::LinearSoftmaxClassifier;
pub use sqlite::{HistoryError, SqliteHistory};
