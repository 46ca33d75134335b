//! Live directory reader backed by the `/etc` account databases.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use super::DirectoryReader;
use crate::Result;
use crate::directory::{AccountSet, Group, User};
use crate::import::unix::{
    GroupEntry, PasswdEntry, ShadowEntry, parse_group, parse_passwd, parse_shadow, parse_shells,
};

/// Reads `passwd`, `shadow`, `group` and `shells` from a directory.
///
/// A missing or unreadable shadow file is tolerated (aging and hashes are
/// then unknown), since only root can read it.
#[derive(Debug, Clone)]
pub struct EtcFiles {
    passwd: PathBuf,
    shadow: PathBuf,
    group: PathBuf,
    shells: PathBuf,
}

impl Default for EtcFiles {
    fn default() -> Self {
        Self::in_dir("/etc")
    }
}

impl EtcFiles {
    /// Use the standard file names under `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            passwd: dir.join("passwd"),
            shadow: dir.join("shadow"),
            group: dir.join("group"),
            shells: dir.join("shells"),
        }
    }
}

fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied) => {
            tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable account file");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

impl DirectoryReader for EtcFiles {
    fn read_accounts(&self) -> Result<AccountSet> {
        let passwd = std::fs::read_to_string(&self.passwd)?;
        let group = std::fs::read_to_string(&self.group)?;
        let shadow = read_optional(&self.shadow)?.unwrap_or_default();
        Ok(build_directory(
            &parse_passwd(&passwd),
            &parse_shadow(&shadow),
            &parse_group(&group),
        ))
    }

    fn read_shells(&self) -> Result<Vec<String>> {
        Ok(read_optional(&self.shells)?
            .map(|text| parse_shells(&text))
            .unwrap_or_default())
    }
}

/// Assemble a strict set from parsed account databases.
///
/// Entries that would violate uniqueness (a second account with the same
/// name or id) are skipped with a warning, mirroring how the C library only
/// ever resolves the first match.
pub fn build_directory(
    passwd: &[PasswdEntry],
    shadow: &[ShadowEntry],
    groups: &[GroupEntry],
) -> AccountSet {
    let mut set = AccountSet::new();
    for entry in groups {
        let mut group = Group::new(&entry.name, entry.gid);
        group.password = Some(entry.password.clone());
        if let Err(e) = set.add_group(group, []) {
            tracing::warn!(group = %entry.name, error = %e, "Skipping group entry");
        }
    }

    let shadow: HashMap<&str, &ShadowEntry> =
        shadow.iter().map(|s| (s.name.as_str(), s)).collect();
    for entry in passwd {
        let mut user = User::new(&entry.name);
        user.uid = entry.uid;
        user.gid = entry.gid;
        user.primary_group = entry
            .gid
            .and_then(|gid| set.group_by_gid(gid))
            .map(|g| g.name().to_string());
        user.gecos = entry.gecos.clone();
        user.directory = Some(entry.home.clone());
        user.shell = Some(entry.shell.clone());
        user.password = Some(entry.password.clone());
        if let Some(sh) = shadow.get(entry.name.as_str()) {
            user.password = Some(sh.password.clone());
            user.lstchg = sh.lstchg;
            user.min = sh.min;
            user.max = sh.max;
            user.warn = sh.warn;
            user.inact = sh.inact;
            user.expire = sh.expire;
        }
        if let Err(e) = set.add_user(user) {
            tracing::warn!(user = %entry.name, error = %e, "Skipping passwd entry");
        }
    }

    for entry in groups {
        let Some(group) = set.group_by_name(&entry.name).map(Group::id) else {
            continue;
        };
        for member in &entry.members {
            match set.user_by_name(member).map(User::id) {
                Some(user) => {
                    if let Err(e) = set.add_membership(user, group) {
                        tracing::warn!(group = %entry.name, member = %member, error = %e, "Skipping group member");
                    }
                }
                None => {
                    tracing::debug!(group = %entry.name, member = %member, "Ignoring unknown group member");
                }
            }
        }
    }
    set
}
