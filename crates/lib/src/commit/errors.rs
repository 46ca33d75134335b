//! Error types for committing a batch.
//!
//! Individual command failures are not errors: they are recorded per step in
//! the [`CommitReport`](super::CommitReport). A commit only fails as a whole
//! when it must not start.

use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CommitError {
    /// Some rows still carry diagnoses.
    #[error("Batch still has {rows} row(s) with unresolved conflicts")]
    UnresolvedConflicts {
        /// Number of rows in error
        rows: usize,
    },

    /// There is nothing to apply.
    #[error("Batch is empty")]
    EmptyBatch,
}

impl CommitError {
    /// Check if the batch was rejected because of outstanding diagnoses.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, CommitError::UnresolvedConflicts { .. })
    }
}

impl From<CommitError> for crate::Error {
    fn from(err: CommitError) -> Self {
        crate::Error::Commit(err)
    }
}
