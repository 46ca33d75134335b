//! Error types for the account directory model.
//!
//! These errors signal misuse of the directory API (adding a name or id that is
//! already taken, referencing a group that does not exist). Callers are expected
//! to check free names and ids before mutating, so during normal flow they are
//! unexpected.

use thiserror::Error;

use super::types::{GroupId, UserId};

/// The kind of entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Group,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::User => f.write_str("user"),
            EntityKind::Group => f.write_str("group"),
        }
    }
}

/// Errors that can occur while mutating an [`AccountSet`](super::AccountSet).
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// An entity with this name is already present.
    #[error("{kind} name already exists: {name}")]
    DuplicateName {
        /// Whether the name belongs to a user or a group
        kind: EntityKind,
        /// The conflicting name
        name: String,
    },

    /// A numeric identifier is already in use.
    #[error("{kind} id already in use: {id}")]
    DuplicateId {
        /// Whether the id is a uid or a gid
        kind: EntityKind,
        /// The conflicting uid or gid
        id: u32,
    },

    /// A user references a group that is not part of the set.
    #[error("Unknown group '{group}' referenced by user '{user}'")]
    UnknownGroup {
        /// The user holding the reference
        user: String,
        /// The missing group name
        group: String,
    },

    /// User not found by surrogate id.
    #[error("User not found: {id}")]
    UserNotFound {
        /// The id that was looked up
        id: UserId,
    },

    /// Group not found by surrogate id.
    #[error("Group not found: {id}")]
    GroupNotFound {
        /// The id that was looked up
        id: GroupId,
    },
}

impl DirectoryError {
    /// Check if this error indicates a name or id collision.
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            DirectoryError::DuplicateName { .. } | DirectoryError::DuplicateId { .. }
        )
    }

    /// Check if this error indicates a lookup failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DirectoryError::UserNotFound { .. }
                | DirectoryError::GroupNotFound { .. }
                | DirectoryError::UnknownGroup { .. }
        )
    }
}

impl From<DirectoryError> for crate::Error {
    fn from(err: DirectoryError) -> Self {
        crate::Error::Directory(err)
    }
}
