//! History repository port: Trait for reading stored health records.
//!
//! Records are owned and persisted elsewhere; the pipeline only queries them.

use chrono::{DateTime, Utc};

use crate::domain::HistoricalSnapshot;

/// Read access to a user's stored vitals.
pub trait HistoryRepository: Send + Sync {
    /// Error type for repository operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load every snapshot for `user_id` captured at or after `since`,
    /// ordered by capture time.
    ///
    /// No upper bound on the number of records is applied here.
    ///
    /// # Errors
    /// Returns error if the backing store cannot be queried.
    fn fetch_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoricalSnapshot>, Self::Error>;
}
