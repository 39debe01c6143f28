//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the prediction pipeline and the trained model and record store.

mod classifier;
mod history;

pub use classifier::{ClassifierError, RiskClassifier};
pub use history::HistoryRepository;
