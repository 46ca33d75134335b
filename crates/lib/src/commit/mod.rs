//! Applying a conflict-free batch to the system.
//!
//! Commit is not transactional. Steps run in order through an
//! [`AccountCommands`] implementation; a failed step is recorded and every
//! step depending on it is skipped, but steps already applied stay applied.
//! Each applied step is mirrored into the live snapshot so that it reflects
//! the system even before the next refresh.

pub mod errors;
pub mod plan;

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use errors::CommitError;
pub use plan::{CommitStep, StepOutcome, StepResult, plan};

use crate::clock::Clock;
use crate::conflict::Report;
use crate::directory::{AccountSet, Group, User};
use crate::system::{AccountCommands, HomeProbe, LiveDirectory, NewUser};

/// Progress notification sent after each step.
#[derive(Debug, Clone, Copy)]
pub struct CommitProgress<'a> {
    /// Steps finished so far, including this one
    pub done: usize,
    pub total: usize,
    pub step: &'a CommitStep,
    pub result: &'a StepResult,
}

/// Record of a finished commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReport {
    /// RFC 3339 start time
    pub started_at: String,
    pub outcomes: Vec<StepOutcome>,
}

impl CommitReport {
    /// Whether every step was applied.
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_applied())
    }

    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_applied()).count()
    }

    /// Steps that failed or were skipped.
    pub fn problems(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(|o| !o.result.is_applied())
    }
}

/// Runs a batch through the account commands.
pub struct Committer<'a> {
    live: &'a mut LiveDirectory,
    commands: &'a mut dyn AccountCommands,
    probe: &'a dyn HomeProbe,
    clock: &'a dyn Clock,
    failed_groups: HashSet<String>,
    failed_users: HashSet<String>,
}

impl<'a> Committer<'a> {
    pub fn new(
        live: &'a mut LiveDirectory,
        commands: &'a mut dyn AccountCommands,
        probe: &'a dyn HomeProbe,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            live,
            commands,
            probe,
            clock,
            failed_groups: HashSet::new(),
            failed_users: HashSet::new(),
        }
    }

    /// Apply `staging`, calling `progress` after every step.
    ///
    /// `report` must be a detector report of `staging` against the current
    /// live snapshot.
    ///
    /// # Errors
    ///
    /// `UnresolvedConflicts` when `report` has rows in error, `EmptyBatch`
    /// when `staging` holds nothing. No command has run in either case.
    pub fn commit<F>(
        mut self,
        staging: &AccountSet,
        report: &Report,
        mut progress: F,
    ) -> Result<CommitReport, CommitError>
    where
        F: FnMut(&CommitProgress<'_>),
    {
        if !report.can_apply() {
            return Err(CommitError::UnresolvedConflicts {
                rows: report.error_rows().count(),
            });
        }
        if staging.is_empty() {
            return Err(CommitError::EmptyBatch);
        }

        let started_at = self.clock.now_rfc3339();
        let steps = plan(staging, self.live.accounts(), report);
        let total = steps.len();
        tracing::info!(steps = total, "Committing batch");

        let mut outcomes = Vec::with_capacity(total);
        for (i, step) in steps.into_iter().enumerate() {
            let result = self.run(staging, &step);
            match &result {
                StepResult::Applied => tracing::info!(%step, "Applied"),
                StepResult::Failed { failure } => {
                    tracing::warn!(%step, error = %failure, "Step failed")
                }
                StepResult::Skipped { reason } => tracing::warn!(%step, reason, "Step skipped"),
            }
            if !result.is_applied() {
                match &step {
                    CommitStep::CreateGroup { group, .. } => {
                        self.failed_groups.insert(group.clone());
                    }
                    CommitStep::CreateUser { name, .. } => {
                        self.failed_users.insert(name.clone());
                    }
                    CommitStep::AddMembership { .. } => {}
                }
            }
            progress(&CommitProgress {
                done: i + 1,
                total,
                step: &step,
                result: &result,
            });
            outcomes.push(StepOutcome { step, result });
        }

        let report = CommitReport {
            started_at,
            outcomes,
        };
        tracing::info!(
            applied = report.applied(),
            total,
            "Commit finished"
        );
        Ok(report)
    }

    fn run(&mut self, staging: &AccountSet, step: &CommitStep) -> StepResult {
        match step {
            CommitStep::CreateGroup { group, gid } => {
                match self.commands.create_group(group, *gid) {
                    Ok(()) => {
                        self.mirror_group(group, *gid);
                        StepResult::Applied
                    }
                    Err(failure) => StepResult::Failed { failure },
                }
            }
            CommitStep::CreateUser { user, name } => {
                let Some(user) = staging.user(*user) else {
                    return StepResult::Skipped {
                        reason: format!("{name} is no longer staged"),
                    };
                };
                if let Some(group) = user
                    .primary_group
                    .as_ref()
                    .filter(|g| self.failed_groups.contains(*g))
                {
                    return StepResult::Skipped {
                        reason: format!("primary group {group} was not created"),
                    };
                }
                let request = NewUser {
                    user,
                    create_home: self.needs_home(user),
                };
                match self.commands.create_user(&request) {
                    Ok(()) => {
                        self.mirror_user(user);
                        StepResult::Applied
                    }
                    Err(failure) => StepResult::Failed { failure },
                }
            }
            CommitStep::AddMembership { user, group } => {
                if self.failed_users.contains(user) {
                    return StepResult::Skipped {
                        reason: format!("user {user} was not created"),
                    };
                }
                if self.failed_groups.contains(group) {
                    return StepResult::Skipped {
                        reason: format!("group {group} was not created"),
                    };
                }
                match self.commands.add_membership(user, group) {
                    Ok(()) => {
                        self.mirror_membership(user, group);
                        StepResult::Applied
                    }
                    Err(failure) => StepResult::Failed { failure },
                }
            }
        }
    }

    /// The home directory is created unless it already exists. When it cannot
    /// be examined, creation is requested and left to the command to report.
    fn needs_home(&self, user: &User) -> bool {
        let Some(directory) = user.directory.as_deref() else {
            return false;
        };
        match self.probe.owner(Path::new(directory)) {
            Ok(owner) => owner.is_none(),
            Err(e) => {
                tracing::warn!(user = %user.name(), directory, error = %e, "Cannot examine home directory");
                true
            }
        }
    }

    fn mirror_group(&mut self, name: &str, gid: Option<u32>) {
        if let Err(e) = self
            .live
            .accounts_mut()
            .add_group(Group::new(name, gid), [])
        {
            tracing::warn!(group = %name, error = %e, "Live snapshot out of sync");
        }
    }

    fn mirror_user(&mut self, user: &User) {
        let mut created = user.clone();
        // Memberships follow as separate steps
        created.groups.clear();
        created.plainpw = None;
        if let Err(e) = self.live.accounts_mut().add_user(created) {
            tracing::warn!(user = %user.name(), error = %e, "Live snapshot out of sync");
        }
    }

    fn mirror_membership(&mut self, user: &str, group: &str) {
        let live = self.live.accounts_mut();
        let ids = live
            .user_by_name(user)
            .map(User::id)
            .zip(live.group_by_name(group).map(Group::id));
        let result = match ids {
            Some((user, group)) => live.add_membership(user, group),
            None => Ok(()),
        };
        if let Err(e) = result {
            tracing::warn!(user, group, error = %e, "Live snapshot out of sync");
        }
    }
}
