//! Automatic fixes for the diagnoses that have an unambiguous remedy.
//!
//! Only `uid`, `gid` and `primary_group` are ever changed. Name, directory and
//! syntax problems need an operator decision and are left untouched.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::detect::{DetectContext, detect_conflicts};
use super::diagnosis::{Diagnosis, Expected, Report, RowReport, RowStatus, Tags};
use crate::Result;
use crate::directory::{AccountSet, Field, Group, IdSearch, UserId};

/// One automatic change applied to a staged user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub user: UserId,
    pub name: String,
    pub field: Field,
    pub old: String,
    pub new: String,
}

/// Outcome of [`resolve_conflicts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub changes: Vec<Change>,
    /// Fresh detector report taken after the fixes
    pub report: Report,
}

impl Resolution {
    /// Rows still in error after the fixes; these need the operator.
    pub fn unresolved(&self) -> impl Iterator<Item = &RowReport> {
        self.report.error_rows()
    }
}

fn show(value: Option<impl ToString>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Fix what can be fixed in the rows `report` marks as errors, then run the
/// detector again.
///
/// Running it a second time on its own output changes nothing.
pub fn resolve_conflicts(
    staging: &mut AccountSet,
    report: &Report,
    ctx: &DetectContext<'_>,
) -> Result<Resolution> {
    let mut resolver = Resolver {
        staging,
        ctx,
        reassigned: HashSet::new(),
        changes: Vec::new(),
    };
    for row in report.rows.iter().filter(|r| r.status == RowStatus::Error) {
        resolver.resolve_row(row.user, &row.tags)?;
    }

    let changes = resolver.changes;
    let report = detect_conflicts(staging, ctx);
    tracing::info!(
        changes = changes.len(),
        unresolved = report.error_rows().count(),
        "Resolved conflicts"
    );
    Ok(Resolution { changes, report })
}

struct Resolver<'r, 'a> {
    staging: &'r mut AccountSet,
    ctx: &'r DetectContext<'a>,
    /// Uids handed out during this pass
    reassigned: HashSet<u32>,
    changes: Vec<Change>,
}

impl Resolver<'_, '_> {
    fn resolve_row(&mut self, id: UserId, tags: &Tags) -> Result<()> {
        match tags.get(Field::Uid) {
            Some(Diagnosis::Dup | Diagnosis::Con) => self.reassign_uid(id)?,
            Some(Diagnosis::Hijack { owner }) => self.set_uid(id, owner.uid)?,
            _ => {}
        }

        let gid_mismatch = match tags.get(Field::Gid) {
            Some(Diagnosis::Mismatch {
                expected: Expected::Gid(gid),
            }) => {
                self.set_gid(id, *gid)?;
                true
            }
            Some(Diagnosis::Hijack { owner }) => {
                self.set_gid(id, owner.gid)?;
                false
            }
            _ => false,
        };

        // With both tagged, the gid fix already settles the pair
        if !gid_mismatch
            && let Some(Diagnosis::Mismatch {
                expected: Expected::Group(name),
            }) = tags.get(Field::PrimaryGroup)
        {
            self.relink_primary(id, name)?;
        }
        Ok(())
    }

    fn reassign_uid(&mut self, id: UserId) -> Result<()> {
        let mut taken: HashSet<u32> = self
            .staging
            .users()
            .filter(|u| u.id() != id)
            .filter_map(|u| u.uid)
            .collect();
        taken.extend(&self.reassigned);
        let search = IdSearch::new(self.ctx.config.regular_ids).excluding(&taken);
        let Some(uid) = self.ctx.live.accounts().get_free_uid(&search) else {
            tracing::warn!(user = %id, "No free uid left to reassign");
            return Ok(());
        };
        self.reassigned.insert(uid);
        self.set_uid(id, uid)
    }

    fn set_uid(&mut self, id: UserId, uid: u32) -> Result<()> {
        let old = self.staging.user(id).and_then(|u| u.uid);
        if old == Some(uid) {
            return Ok(());
        }
        self.staging.set_uid(id, Some(uid))?;
        self.record(id, Field::Uid, show(old), uid.to_string());
        Ok(())
    }

    /// Adopt `gid`. A staged primary group moves along with it, and so does
    /// every other user sharing that group.
    fn set_gid(&mut self, id: UserId, gid: u32) -> Result<()> {
        let Some(user) = self.staging.user(id) else {
            return Ok(());
        };
        let old = user.gid;
        let primary = user.primary_group.clone();
        if old == Some(gid) {
            return Ok(());
        }
        self.assign_gid(id, old, gid);

        let Some((group, name)) = primary
            .as_deref()
            .and_then(|name| self.staging.group_by_name(name))
            .filter(|g| g.gid != Some(gid))
            .map(|g| (g.id(), g.name().to_string()))
        else {
            return Ok(());
        };
        let sharing: Vec<(UserId, Option<u32>)> = self
            .staging
            .primary_members(group)
            .into_iter()
            .filter(|u| u.id() != id && u.gid != Some(gid))
            .map(|u| (u.id(), u.gid))
            .collect();
        self.staging.set_gid(group, Some(gid))?;
        tracing::info!(group = %name, gid, members = sharing.len() + 1, "Moved staged primary group");
        for (member, old) in sharing {
            self.assign_gid(member, old, gid);
        }
        Ok(())
    }

    fn assign_gid(&mut self, id: UserId, old: Option<u32>, gid: u32) {
        if let Some(user) = self.staging.user_mut(id) {
            user.gid = Some(gid);
        }
        self.record(id, Field::Gid, show(old), gid.to_string());
    }

    fn relink_primary(&mut self, id: UserId, name: &str) -> Result<()> {
        let Some(user) = self.staging.user(id) else {
            return Ok(());
        };
        let old = user.primary_group.clone();
        let gid = user.gid;
        if old.as_deref() == Some(name) {
            return Ok(());
        }
        self.staging.set_primary_group(id, name, gid)?;

        if let Some(stub) = old
            .as_deref()
            .and_then(|old| self.staging.group_by_name(old))
            .map(Group::id)
            && self.staging.supplementary_members(stub).is_empty()
            && self.staging.primary_members(stub).is_empty()
        {
            let removed = self.staging.remove_group(stub)?;
            tracing::debug!(group = %removed.group.name(), "Dropped unused primary group stub");
        }
        if self.ctx.live.accounts().group_by_name(name).is_none()
            && self.staging.group_by_name(name).is_none()
        {
            self.staging.add_group(Group::new(name, gid), [])?;
        }

        self.record(id, Field::PrimaryGroup, show(old), name.to_string());
        Ok(())
    }

    fn record(&mut self, id: UserId, field: Field, old: String, new: String) {
        let name = self
            .staging
            .user(id)
            .map(|u| u.name().to_string())
            .unwrap_or_default();
        tracing::info!(user = %name, %field, %old, %new, "Applied automatic fix");
        self.changes.push(Change {
            user: id,
            name,
            field,
            old,
            new,
        });
    }
}
