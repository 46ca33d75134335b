//! Deterministic defaults for staged users.
//!
//! Only missing fields are filled; anything the source supplied is kept, even
//! if invalid, so the conflict detector can report it.

use std::collections::HashSet;

use crate::Result;
use crate::clock::Clock;
use crate::config::Config;
use crate::constants::LOCKED_PASSWORD;
use crate::crypto::PasswordEncryptor;
use crate::directory::{AccountSet, Group, IdSearch, User, UserId};

pub struct AutoComplete<'a> {
    live: &'a AccountSet,
    config: &'a Config,
    clock: &'a dyn Clock,
    encryptor: &'a dyn PasswordEncryptor,
}

/// Values computed for one user before the staging set is touched.
struct Fill {
    directory: Option<String>,
    uid: Option<u32>,
    primary_group: String,
    gid: Option<u32>,
    password: Option<String>,
}

impl<'a> AutoComplete<'a> {
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

    /// Fill every staged user, in insertion order.
    pub fn complete(&self, staging: &mut AccountSet) -> Result<()> {
        self.fill_group_gids(staging);
        let mut staged_uids: HashSet<u32> = staging.users().filter_map(|u| u.uid).collect();
        for id in staging.user_ids() {
            self.complete_user(staging, id, &mut staged_uids)?;
        }
        Ok(())
    }

    /// Staged groups without a gid take the gid of the live group of the same name.
    fn fill_group_gids(&self, staging: &mut AccountSet) {
        for id in staging.group_ids() {
            let live_gid = staging
                .group(id)
                .filter(|g| g.gid.is_none())
                .and_then(|g| self.live.group_by_name(g.name()))
                .and_then(|g| g.gid);
            if let (Some(gid), Some(group)) = (live_gid, staging.group_mut(id)) {
                group.gid = Some(gid);
            }
        }
    }

    fn complete_user(
        &self,
        staging: &mut AccountSet,
        id: UserId,
        staged_uids: &mut HashSet<u32>,
    ) -> Result<()> {
        let Some(fill) = self.compute(staging, id, staged_uids)? else {
            return Ok(());
        };
        if let Some(uid) = fill.uid {
            staged_uids.insert(uid);
        }

        self.ensure_primary_stub(staging, &fill.primary_group, fill.gid)?;
        if let Some(group) = staging.group_by_name(&fill.primary_group).map(Group::id)
            && staging
                .user(id)
                .is_some_and(|u| u.is_member_of(&fill.primary_group))
        {
            staging.remove_membership(id, group)?;
        }

        let config = self.config;
        let today = self.clock.now_days();
        let Some(user) = staging.user_mut(id) else {
            return Ok(());
        };
        user.directory = fill.directory;
        user.uid = fill.uid;
        user.primary_group = Some(fill.primary_group);
        user.gid = fill.gid;
        user.password = fill.password;
        if user.shell.is_none() {
            user.shell = Some(config.default_shell.clone());
        }
        user.min.get_or_insert(config.default_min);
        user.max.get_or_insert(config.default_max);
        user.warn.get_or_insert(config.default_warn);
        user.inact.get_or_insert(config.default_inact);
        user.expire.get_or_insert(config.default_expire);
        user.lstchg.get_or_insert(today);
        Ok(())
    }

    fn compute(
        &self,
        staging: &AccountSet,
        id: UserId,
        staged_uids: &HashSet<u32>,
    ) -> Result<Option<Fill>> {
        let Some(user) = staging.user(id) else {
            return Ok(None);
        };

        let directory = user
            .directory
            .clone()
            .or_else(|| Some(self.config.home_for(user.name())));

        let uid = user.uid.or_else(|| {
            let search = IdSearch::new(self.config.regular_ids).excluding(staged_uids);
            let uid = self.live.get_free_uid(&search);
            if uid.is_none() {
                tracing::warn!(user = %user.name(), "No free uid left for staged user");
            }
            uid
        });

        let primary_group = self.primary_group_name(staging, user);
        let gid = match user.gid {
            Some(gid) => Some(gid),
            None => self
                .live
                .group_by_name(&primary_group)
                .or_else(|| staging.group_by_name(&primary_group))
                .and_then(|g| g.gid)
                .or_else(|| self.allocate_gid(staging, uid)),
        };

        let password = match user.plainpw.as_deref().filter(|p| !p.is_empty()) {
            Some(plain) => Some(self.encryptor.encrypt(plain)?),
            None => user
                .password
                .clone()
                .filter(|p| !p.is_empty())
                .or_else(|| Some(LOCKED_PASSWORD.to_string())),
        };

        Ok(Some(Fill {
            directory,
            uid,
            primary_group,
            gid,
            password,
        }))
    }

    /// The declared primary group, else the group owning the declared gid,
    /// else a private group named after the user.
    fn primary_group_name(&self, staging: &AccountSet, user: &User) -> String {
        if let Some(name) = &user.primary_group {
            return name.clone();
        }
        user.gid
            .and_then(|gid| {
                self.live
                    .group_by_gid(gid)
                    .or_else(|| staging.group_by_gid(gid))
            })
            .map(|g| g.name().to_string())
            .unwrap_or_else(|| user.name().to_string())
    }

    /// A gid for a new primary group: the user's uid when that gid is free,
    /// otherwise the first free gid in the regular range.
    fn allocate_gid(&self, staging: &AccountSet, uid: Option<u32>) -> Option<u32> {
        let staged: HashSet<u32> = staging
            .groups()
            .filter_map(|g| g.gid)
            .chain(staging.users().filter_map(|u| u.gid))
            .collect();
        if let Some(uid) = uid
            && self.live.gid_is_free(uid)
            && !staged.contains(&uid)
        {
            return Some(uid);
        }
        let search = IdSearch::new(self.config.regular_ids).excluding(&staged);
        self.live.get_free_gid(&search)
    }

    /// Stage the primary group unless it already exists live or staged.
    fn ensure_primary_stub(
        &self,
        staging: &mut AccountSet,
        name: &str,
        gid: Option<u32>,
    ) -> Result<()> {
        if self.live.group_by_name(name).is_some() {
            return Ok(());
        }
        match staging.group_by_name(name).map(|g| (g.id(), g.gid)) {
            Some((id, None)) => {
                if let Some(group) = staging.group_mut(id) {
                    group.gid = gid;
                }
            }
            Some(_) => {}
            None => {
                staging.add_group(Group::new(name, gid), [])?;
            }
        }
        Ok(())
    }
}
