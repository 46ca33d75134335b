//! Diagnosis data produced by the conflict detector.
//!
//! Diagnoses are ordinary data: they block commit but are never raised as
//! errors. The UI reads them per row and per field to render icons and
//! tooltips.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::directory::{Field, UserId};
use crate::system::Owner;

/// The value a `mismatch` diagnosis expects instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expected {
    Gid(u32),
    Group(String),
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Gid(gid) => write!(f, "{gid}"),
            Expected::Group(name) => f.write_str(name),
        }
    }
}

/// What is wrong with one field of a staged user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Diagnosis {
    /// The value fails its syntax rule
    Char,
    /// The value collides with an earlier row of the batch
    Dup,
    /// The value collides with the live directory
    Con,
    /// The primary group and gid disagree with the live directory
    Mismatch { expected: Expected },
    /// The home directory exists on disk with a different owner
    Hijack { owner: Owner },
}

impl Diagnosis {
    /// Short code shown to the operator.
    pub fn code(&self) -> &'static str {
        match self {
            Diagnosis::Char => "char",
            Diagnosis::Dup => "dup",
            Diagnosis::Con => "con",
            Diagnosis::Mismatch { .. } => "mismatch",
            Diagnosis::Hijack { .. } => "hijack",
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnosis::Mismatch { expected } => write!(f, "mismatch {expected}"),
            other => f.write_str(other.code()),
        }
    }
}

/// Per-field diagnoses of one row.
///
/// A later diagnosis replaces an earlier one on the same field, except that
/// `char` is never replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<Field, Diagnosis>);

impl Tags {
    pub fn tag(&mut self, field: Field, diagnosis: Diagnosis) {
        if self.0.get(&field) != Some(&Diagnosis::Char) {
            self.0.insert(field, diagnosis);
        }
    }

    pub fn get(&self, field: Field) -> Option<&Diagnosis> {
        self.0.get(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &Diagnosis)> {
        self.0.iter().map(|(f, d)| (*f, d))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Ok,
    Error,
    /// Already present in the live directory with identical attributes
    Identical,
}

/// Diagnoses of one staged user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowReport {
    pub user: UserId,
    pub name: String,
    pub status: RowStatus,
    pub tags: Tags,
}

/// A home directory that could not be examined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeFailure {
    pub user: UserId,
    pub directory: String,
    pub message: String,
}

/// Outcome of one detector pass over a staging set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// One entry per staged user, in insertion order
    pub rows: Vec<RowReport>,
    pub probe_failures: Vec<ProbeFailure>,
}

impl Report {
    /// Whether the batch may be committed: no row carries an error.
    pub fn can_apply(&self) -> bool {
        !self.rows.iter().any(|r| r.status == RowStatus::Error)
    }

    pub fn row(&self, user: UserId) -> Option<&RowReport> {
        self.rows.iter().find(|r| r.user == user)
    }

    pub fn tag(&self, user: UserId, field: Field) -> Option<&Diagnosis> {
        self.row(user).and_then(|r| r.tags.get(field))
    }

    pub fn status(&self, user: UserId) -> Option<RowStatus> {
        self.row(user).map(|r| r.status)
    }

    pub fn error_rows(&self) -> impl Iterator<Item = &RowReport> {
        self.rows.iter().filter(|r| r.status == RowStatus::Error)
    }

    /// Users identical to a live account, offered for removal from the batch.
    pub fn identical_users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.rows
            .iter()
            .filter(|r| r.status == RowStatus::Identical)
            .map(|r| r.user)
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
