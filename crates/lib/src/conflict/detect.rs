//! Conflict detection over a staging set.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::diagnosis::{Diagnosis, Expected, ProbeFailure, Report, RowReport, RowStatus, Tags};
use crate::config::Config;
use crate::directory::validate::{is_valid_aging, is_valid_gecos, is_valid_name};
use crate::directory::{AccountSet, Field, User};
use crate::system::{HomeProbe, LiveDirectory};

/// Everything the detector and resolver consult besides the batch itself.
#[derive(Debug, Clone, Copy)]
pub struct DetectContext<'a> {
    pub live: &'a LiveDirectory,
    pub probe: &'a dyn HomeProbe,
    pub config: &'a Config,
}

impl<'a> DetectContext<'a> {
    pub fn new(live: &'a LiveDirectory, probe: &'a dyn HomeProbe, config: &'a Config) -> Self {
        Self {
            live,
            probe,
            config,
        }
    }
}

/// Values already claimed by earlier rows of the batch.
#[derive(Default)]
struct Seen<'s> {
    names: HashSet<&'s str>,
    uids: HashSet<u32>,
    directories: HashSet<&'s str>,
    gids: HashSet<u32>,
}

/// Diagnose every staged user, in insertion order.
///
/// The result depends only on the staging set, the live snapshot and what the
/// probe reports; running it twice on unchanged inputs yields the same report.
pub fn detect_conflicts(staging: &AccountSet, ctx: &DetectContext<'_>) -> Report {
    let live = ctx.live.accounts();
    let clashes = group_clashes(staging, live);
    let mut report = Report::default();
    let mut seen = Seen::default();

    for user in staging.users() {
        let identical = live
            .user_by_name(user.name())
            .is_some_and(|existing| existing.same_account(user));
        if identical {
            report.rows.push(RowReport {
                user: user.id(),
                name: user.name().to_string(),
                status: RowStatus::Identical,
                tags: Tags::default(),
            });
            continue;
        }

        let mut tags = Tags::default();
        check_syntax(user, ctx.live, &mut tags);
        check_batch(user, ctx.config, &mut seen, &mut tags);
        check_staged_groups(user, staging, live, &clashes, &mut tags);
        check_live(user, live, &mut tags);
        check_primary_group(user, live, &mut tags);
        if let Err(failure) = check_home(user, ctx, &mut tags) {
            report.probe_failures.push(failure);
        }

        let status = if tags.is_empty() {
            RowStatus::Ok
        } else {
            RowStatus::Error
        };
        report.rows.push(RowReport {
            user: user.id(),
            name: user.name().to_string(),
            status,
            tags,
        });
    }

    tracing::debug!(
        rows = report.rows.len(),
        errors = report.error_rows().count(),
        "Detected conflicts"
    );
    report
}

fn check_syntax(user: &User, live: &LiveDirectory, tags: &mut Tags) {
    if !is_valid_name(user.name()) {
        tags.tag(Field::Name, Diagnosis::Char);
    }
    if user
        .primary_group
        .as_deref()
        .is_some_and(|g| !is_valid_name(g))
    {
        tags.tag(Field::PrimaryGroup, Diagnosis::Char);
    }
    for field in Field::GECOS {
        if user.gecos.get(field).is_some_and(|v| !is_valid_gecos(v)) {
            tags.tag(field, Diagnosis::Char);
        }
    }
    if !user.shell.as_deref().is_some_and(|s| live.is_valid_shell(s)) {
        tags.tag(Field::Shell, Diagnosis::Char);
    }
    if user.groups().iter().any(|g| !is_valid_name(g)) {
        tags.tag(Field::Groups, Diagnosis::Char);
    }
    for field in Field::AGING {
        if user.aging(field).is_some_and(|v| !is_valid_aging(v)) {
            tags.tag(field, Diagnosis::Char);
        }
    }
    // Autocompletion fills these; a gap means the range ran out
    if user.uid.is_none() {
        tags.tag(Field::Uid, Diagnosis::Char);
    }
    if user.gid.is_none() {
        tags.tag(Field::Gid, Diagnosis::Char);
    }
    if user.directory.as_deref().is_none_or(str::is_empty) {
        tags.tag(Field::Directory, Diagnosis::Char);
    }
}

fn check_batch<'s>(user: &'s User, config: &Config, seen: &mut Seen<'s>, tags: &mut Tags) {
    if !seen.names.insert(user.name()) {
        tags.tag(Field::Name, Diagnosis::Dup);
    }
    if let Some(uid) = user.uid
        && !seen.uids.insert(uid)
    {
        tags.tag(Field::Uid, Diagnosis::Dup);
    }
    if let Some(directory) = user.directory.as_deref().filter(|d| !d.is_empty())
        && !seen.directories.insert(directory)
    {
        tags.tag(Field::Directory, Diagnosis::Dup);
    }
    if config.flag_shared_gid
        && let Some(gid) = user.gid
        && !seen.gids.insert(gid)
    {
        tags.tag(Field::Gid, Diagnosis::Dup);
    }
}

/// Staged groups the batch would create whose gid is already taken: `dup`
/// when an earlier staged group holds it, `con` when a live group does.
fn group_clashes<'s>(staging: &'s AccountSet, live: &AccountSet) -> HashMap<&'s str, Diagnosis> {
    let mut clashes = HashMap::new();
    let mut taken = HashSet::new();
    for group in staging.groups() {
        let Some(gid) = group.gid else {
            continue;
        };
        if live.group_by_name(group.name()).is_some() {
            continue;
        }
        if live.group_by_gid(gid).is_some() {
            clashes.insert(group.name(), Diagnosis::Con);
        } else if !taken.insert(gid) {
            clashes.insert(group.name(), Diagnosis::Dup);
        }
    }
    if !clashes.is_empty() {
        tracing::debug!(groups = clashes.len(), "Staged groups with a taken gid");
    }
    clashes
}

fn check_staged_groups(
    user: &User,
    staging: &AccountSet,
    live: &AccountSet,
    clashes: &HashMap<&str, Diagnosis>,
    tags: &mut Tags,
) {
    if let Some(name) = user.primary_group.as_deref()
        && live.group_by_name(name).is_none()
    {
        if let Some(expected) = staging
            .group_by_name(name)
            .and_then(|g| g.gid)
            .filter(|expected| user.gid.is_some_and(|gid| gid != *expected))
        {
            tags.tag(
                Field::Gid,
                Diagnosis::Mismatch {
                    expected: Expected::Gid(expected),
                },
            );
        }
        if let Some(clash) = clashes.get(name) {
            tags.tag(Field::Gid, clash.clone());
        }
    }
    if let Some(clash) = user.groups().iter().find_map(|g| clashes.get(g.as_str())) {
        tags.tag(Field::Groups, clash.clone());
    }
}

fn check_live(user: &User, live: &AccountSet, tags: &mut Tags) {
    if live.user_by_name(user.name()).is_some() {
        tags.tag(Field::Name, Diagnosis::Con);
    }
    if user.uid.is_some_and(|uid| !live.uid_is_free(uid)) {
        tags.tag(Field::Uid, Diagnosis::Con);
    }
    if user
        .directory
        .as_deref()
        .is_some_and(|d| live.user_by_directory(d).is_some())
    {
        tags.tag(Field::Directory, Diagnosis::Con);
    }
}

fn check_primary_group(user: &User, live: &AccountSet, tags: &mut Tags) {
    let (Some(name), Some(gid)) = (user.primary_group.as_deref(), user.gid) else {
        return;
    };
    if let Some(expected) = live
        .group_by_name(name)
        .and_then(|g| g.gid)
        .filter(|expected| *expected != gid)
    {
        tags.tag(
            Field::Gid,
            Diagnosis::Mismatch {
                expected: Expected::Gid(expected),
            },
        );
    }
    if let Some(group) = live.group_by_gid(gid).filter(|g| g.name() != name) {
        tags.tag(
            Field::PrimaryGroup,
            Diagnosis::Mismatch {
                expected: Expected::Group(group.name().to_string()),
            },
        );
    }
}

/// Compare the on-disk owner of the home directory with the staged ids.
/// Directories already assigned to a live user are left to the `con` check.
fn check_home(user: &User, ctx: &DetectContext<'_>, tags: &mut Tags) -> Result<(), ProbeFailure> {
    let Some(directory) = user.directory.as_deref().filter(|d| !d.is_empty()) else {
        return Ok(());
    };
    if ctx.live.accounts().user_by_directory(directory).is_some() {
        return Ok(());
    }
    let owner = match ctx.probe.owner(Path::new(directory)) {
        Ok(Some(owner)) => owner,
        Ok(None) => return Ok(()),
        Err(e) => {
            tracing::warn!(user = %user.name(), directory, error = %e, "Cannot examine home directory");
            return Err(ProbeFailure {
                user: user.id(),
                directory: directory.to_string(),
                message: e.to_string(),
            });
        }
    };

    let mut hijacked = false;
    if user.uid.is_some_and(|uid| uid != owner.uid) {
        tags.tag(Field::Uid, Diagnosis::Hijack { owner });
        hijacked = true;
    }
    if user.gid.is_some_and(|gid| gid != owner.gid) {
        tags.tag(Field::Gid, Diagnosis::Hijack { owner });
        hijacked = true;
    }
    if hijacked {
        tags.tag(Field::Directory, Diagnosis::Hijack { owner });
    }
    Ok(())
}
