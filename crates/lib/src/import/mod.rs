//! Batch loading of external account sources into a staging set.
//!
//! A [`BatchLoader`] parses a CSV stream, a set of passwd/shadow/group files
//! or a classroom template into a fresh staging [`AccountSet`], then runs
//! [`AutoComplete`] over it. The live directory is consulted for free ids and
//! group names but never modified.

pub mod autocomplete;
pub mod csv;
pub mod errors;
pub mod unix;

use std::collections::HashSet;
use std::io::{self, Read};
use std::path::Path;

pub use autocomplete::AutoComplete;
pub use errors::ImportError;

use self::csv::{GroupSpec, read_rows};
use crate::Result;
use crate::clock::Clock;
use crate::config::Config;
use crate::crypto::PasswordEncryptor;
use crate::directory::{AccountSet, Group, User};
use crate::provision::{ClassroomTemplate, Credential};
use unix::{parse_group, parse_passwd, parse_shadow};

/// Contents of the three optional account database files.
#[derive(Debug, Clone, Default)]
pub struct UnixSources {
    pub passwd: Option<String>,
    pub shadow: Option<String>,
    pub group: Option<String>,
}

impl UnixSources {
    /// Read `passwd`, `shadow` and `group` from `dir`, skipping absent files.
    pub fn from_dir(dir: impl AsRef<Path>) -> std::result::Result<Self, ImportError> {
        let dir = dir.as_ref();
        let read = |name: &str| {
            let path = dir.join(name);
            match std::fs::read_to_string(&path) {
                Ok(text) => Ok(Some(text)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(source) => Err(ImportError::SourceUnreadable { path, source }),
            }
        };
        Ok(Self {
            passwd: read("passwd")?,
            shadow: read("shadow")?,
            group: read("group")?,
        })
    }
}

/// Builds staging sets from external sources.
pub struct BatchLoader<'a> {
    live: &'a AccountSet,
    config: &'a Config,
    clock: &'a dyn Clock,
    encryptor: &'a dyn PasswordEncryptor,
}

impl<'a> BatchLoader<'a> {
    pub fn new(
        live: &'a AccountSet,
        config: &'a Config,
        clock: &'a dyn Clock,
        encryptor: &'a dyn PasswordEncryptor,
    ) -> Self {
        Self {
            live,
            config,
            clock,
            encryptor,
        }
    }

    /// Load a CSV stream.
    pub fn load_csv<R: Read>(&self, reader: R) -> Result<AccountSet> {
        let rows = read_rows(reader)?;
        let mut users = Vec::with_capacity(rows.len());
        let mut specs = Vec::new();
        for row in rows {
            specs.extend(row.groups);
            users.push(row.user);
        }
        self.stage(users, specs)
    }

    /// Load passwd/shadow/group contents.
    ///
    /// Users outside [`Config::import_uid_range`] are skipped. When a passwd
    /// source is present only the groups its users reference are staged,
    /// otherwise every group is.
    pub fn load_unix(&self, sources: &UnixSources) -> Result<AccountSet> {
        let passwd = sources.passwd.as_deref().map(parse_passwd).unwrap_or_default();
        let shadow = sources.shadow.as_deref().map(parse_shadow).unwrap_or_default();
        let groups = sources.group.as_deref().map(parse_group).unwrap_or_default();

        let mut users = Vec::new();
        for entry in &passwd {
            if let Some(uid) = entry.uid
                && !self.config.import_uid_range.contains(uid)
            {
                tracing::debug!(user = %entry.name, uid, "Skipping account outside import range");
                continue;
            }
            let primary = entry
                .gid
                .and_then(|gid| groups.iter().find(|g| g.gid == Some(gid)))
                .map(|g| g.name.clone());
            let supplementary = groups
                .iter()
                .filter(|g| g.members.contains(&entry.name))
                .filter(|g| primary.as_deref() != Some(g.name.as_str()))
                .map(|g| g.name.clone());

            let mut user = User::new(&entry.name).with_groups(supplementary);
            user.uid = entry.uid;
            user.gid = entry.gid;
            user.primary_group = primary;
            user.gecos = entry.gecos.clone();
            user.directory = Some(entry.home.clone()).filter(|h| !h.is_empty());
            user.shell = Some(entry.shell.clone()).filter(|s| !s.is_empty());
            // "x" only points at the shadow file
            user.password = Some(entry.password.clone()).filter(|p| !p.is_empty() && p != "x");
            if let Some(sh) = shadow.iter().find(|s| s.name == entry.name) {
                user.password = Some(sh.password.clone()).filter(|p| !p.is_empty());
                user.lstchg = sh.lstchg;
                user.min = sh.min;
                user.max = sh.max;
                user.warn = sh.warn;
                user.inact = sh.inact;
                user.expire = sh.expire;
            }
            users.push(user);
        }

        let referenced: HashSet<&str> = users
            .iter()
            .flat_map(|u| u.groups().iter().chain(u.primary_group.as_ref()))
            .map(String::as_str)
            .collect();
        let specs = groups
            .iter()
            .filter(|g| sources.passwd.is_none() || referenced.contains(g.name.as_str()))
            .map(|g| GroupSpec {
                name: g.name.clone(),
                gid: g.gid,
            })
            .collect();
        self.stage(users, specs)
    }

    /// Generate a classroom batch. Returns the staging set together with the
    /// initial credentials to hand out.
    pub fn load_classroom(
        &self,
        template: &ClassroomTemplate,
    ) -> Result<(AccountSet, Vec<Credential>)> {
        let (users, credentials) = template.build(&mut rand::thread_rng());
        let specs = template
            .groups
            .iter()
            .map(|name| GroupSpec {
                name: name.clone(),
                gid: None,
            })
            .collect();
        Ok((self.stage(users, specs)?, credentials))
    }

    /// Assemble a staging set: merge group references by name, add the users
    /// in order, then autocomplete.
    fn stage(&self, users: Vec<User>, specs: Vec<GroupSpec>) -> Result<AccountSet> {
        let mut staging = AccountSet::staging().with_group_removal(self.config.group_removal);
        for spec in specs {
            match staging.group_by_name(&spec.name).map(|g| (g.id(), g.gid)) {
                None => {
                    staging.add_group(Group::new(&spec.name, spec.gid), [])?;
                }
                Some((id, None)) => {
                    if let Some(group) = staging.group_mut(id) {
                        group.gid = spec.gid;
                    }
                }
                Some((_, Some(existing))) => {
                    if spec.gid.is_some_and(|gid| gid != existing) {
                        tracing::warn!(
                            group = %spec.name,
                            kept = existing,
                            ignored = ?spec.gid,
                            "Conflicting gids for staged group"
                        );
                    }
                }
            }
        }
        for user in users {
            // Every supplementary group must be staged before its user
            let missing: Vec<String> = user
                .groups()
                .iter()
                .filter(|g| staging.group_by_name(g).is_none())
                .cloned()
                .collect();
            for name in missing {
                staging.add_group(Group::new(name, None), [])?;
            }
            staging.add_user(user)?;
        }

        AutoComplete::new(self.live, self.config, self.clock, self.encryptor)
            .complete(&mut staging)?;
        tracing::info!(
            users = staging.user_count(),
            groups = staging.group_count(),
            "Staged import batch"
        );
        Ok(staging)
    }
}
