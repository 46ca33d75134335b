//!
//! lab-accounts: bulk import and provisioning of local Unix accounts.
//! This library stages a batch of users and groups, diagnoses every conflict
//! with the live system and applies the batch once it is clean.
//!
//! ## Core Concepts
//!
//! * **Account sets (`directory::AccountSet`)**: In-memory users and groups keyed by
//!   stable surrogate ids, with two-way membership kept consistent. The live snapshot
//!   is a strict set, an import batch a staging set.
//! * **Live directory (`system::LiveDirectory`)**: The system's accounts as read by a
//!   `system::DirectoryReader`, passed explicitly to every component and refreshed on demand.
//! * **Batch loading (`import::BatchLoader`)**: CSV streams, passwd/shadow/group files and
//!   classroom templates (`provision::ClassroomTemplate`) become staging sets whose missing
//!   fields are filled by `import::AutoComplete`.
//! * **Conflicts (`conflict`)**: `conflict::detect_conflicts` tags offending fields with
//!   `char`, `dup`, `con`, `mismatch` or `hijack`; `conflict::resolve_conflicts` fixes the
//!   ones with an unambiguous remedy.
//! * **Commit (`commit::Committer`)**: Replays a clean batch through `system::AccountCommands`,
//!   groups first, then users, then memberships.
//! * **Sessions (`session::ImportSession`)**: Tie the above together, re-running detection
//!   after every edit.

pub mod clock;
pub mod commit;
pub mod config;
pub mod conflict;
pub mod constants;
pub mod crypto;
pub mod directory;
pub mod import;
pub mod provision;
pub mod session;
pub mod system;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use directory::{AccountSet, Field, Group, GroupId, User, UserId};
pub use session::ImportSession;

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured errors from the directory model
    #[error(transparent)]
    Directory(directory::DirectoryError),

    /// Structured errors from batch loading
    #[error(transparent)]
    Import(import::ImportError),

    /// Structured errors from the commit module
    #[error(transparent)]
    Commit(commit::CommitError),

    /// Structured errors from password hashing
    #[error(transparent)]
    Crypto(crypto::CryptoError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Directory(_) => "directory",
            Error::Import(_) => "import",
            Error::Commit(_) => "commit",
            Error::Crypto(_) => "crypto",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a user or group was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Directory(dir_err) => dir_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates a name or id is already taken.
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Directory(dir_err) => dir_err.is_duplicate(),
            _ => false,
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Import(import_err) => import_err.is_io_error(),
            _ => false,
        }
    }

    /// Check if a commit was refused because of outstanding diagnoses.
    pub fn is_unresolved_conflicts(&self) -> bool {
        match self {
            Error::Commit(commit_err) => commit_err.is_unresolved(),
            _ => false,
        }
    }

    /// Check if this error is import-related.
    pub fn is_import_error(&self) -> bool {
        matches!(self, Error::Import(_))
    }

    /// Check if this error is crypto-related.
    pub fn is_crypto_error(&self) -> bool {
        matches!(self, Error::Crypto(_))
    }
}
