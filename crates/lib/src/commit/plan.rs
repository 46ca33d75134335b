//! Ordering of the account commands that apply a batch.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::conflict::{Report, RowStatus};
use crate::directory::{AccountSet, UserId};
use crate::system::CommandFailure;

/// One account command of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommitStep {
    CreateGroup { group: String, gid: Option<u32> },
    CreateUser { user: UserId, name: String },
    AddMembership { user: String, group: String },
}

impl fmt::Display for CommitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitStep::CreateGroup { group, .. } => write!(f, "create group {group}"),
            CommitStep::CreateUser { name, .. } => write!(f, "create user {name}"),
            CommitStep::AddMembership { user, group } => write!(f, "add {user} to {group}"),
        }
    }
}

/// What happened to one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StepResult {
    Applied,
    Failed { failure: CommandFailure },
    /// Not attempted because a step it depends on did not succeed
    Skipped { reason: String },
}

impl StepResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, StepResult::Applied)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: CommitStep,
    pub result: StepResult,
}

/// List the commands needed to apply `staging` on top of `live`:
/// missing groups first, then users, then supplementary memberships.
///
/// Users that `report` marks as identical to a live account are left out.
pub fn plan(staging: &AccountSet, live: &AccountSet, report: &Report) -> Vec<CommitStep> {
    let mut steps: Vec<CommitStep> = staging
        .groups()
        .filter(|g| live.group_by_name(g.name()).is_none())
        .map(|g| CommitStep::CreateGroup {
            group: g.name().to_string(),
            gid: g.gid,
        })
        .collect();

    let users: Vec<_> = staging
        .users()
        .filter(|u| report.status(u.id()) != Some(RowStatus::Identical))
        .collect();
    steps.extend(users.iter().map(|u| CommitStep::CreateUser {
        user: u.id(),
        name: u.name().to_string(),
    }));
    for user in &users {
        steps.extend(user.groups().iter().map(|g| CommitStep::AddMembership {
            user: user.name().to_string(),
            group: g.clone(),
        }));
    }
    steps
}
