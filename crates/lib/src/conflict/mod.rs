//! Conflict detection and resolution for staged import batches.
//!
//! [`detect_conflicts`] tags every offending field of every staged user with a
//! [`Diagnosis`]. Checks run in a fixed priority:
//!
//! 1. `char`: the value fails its syntax rule
//! 2. `dup`: the value repeats an earlier row of the batch
//! 3. `con`: the value collides with the live directory
//! 4. `mismatch`: primary group name and gid disagree with the live directory
//! 5. `hijack`: the home directory exists on disk with a different owner
//!
//! A later check replaces an earlier tag on the same field unless that tag is
//! `char`. Users identical to a live account are reported as
//! [`RowStatus::Identical`] instead of being checked.
//!
//! [`resolve_conflicts`] applies the fixes that need no operator judgement and
//! re-runs the detector.

pub mod detect;
pub mod diagnosis;
pub mod resolve;

pub use detect::{DetectContext, detect_conflicts};
pub use diagnosis::{Diagnosis, Expected, ProbeFailure, Report, RowReport, RowStatus, Tags};
pub use resolve::{Change, Resolution, resolve_conflicts};
