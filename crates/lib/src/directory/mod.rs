//! In-memory account directory model.
//!
//! An [`AccountSet`] holds [`User`]s and [`Group`]s keyed by stable surrogate
//! ids, with names kept as indexed, mutable fields. Every mutator keeps the
//! two-way membership references consistent:
//!
//! - every name in a user's supplementary `groups` is a group of the set, and
//!   that group lists the user among its `members`
//! - removing a user drops it from every group, and drops its private group
//!   once nothing else refers to it
//! - removing a group drops it from every member's `groups`; users left with
//!   no group at all are removed too unless the set is configured with
//!   [`GroupRemovalPolicy::KeepOrphanedUsers`]
//!
//! A set is either [`Uniqueness::Strict`] (the live snapshot: user names,
//! uids and gids are unique) or [`Uniqueness::Staging`] (an import batch:
//! duplicate user names and uids are tolerated so the conflict detector can
//! report them). Group names are unique in both modes.
//!
//! The model has no internal locking; a set is owned by exactly one writer.

pub mod alloc;
pub mod errors;
pub mod field;
pub mod types;
pub mod validate;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

pub use alloc::{IdRange, IdSearch};
pub use errors::{DirectoryError, EntityKind};
pub use field::Field;
pub use types::{Gecos, Group, GroupId, User, UserId};

/// Uniqueness guarantees enforced by an [`AccountSet`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Uniqueness {
    /// User names, uids and gids are unique.
    #[default]
    Strict,
    /// Duplicate user names and uids are allowed.
    Staging,
}

/// What happens to users left without any group when a group is removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupRemovalPolicy {
    /// Remove users whose only group was the removed one.
    #[default]
    RemoveOrphanedUsers,
    /// Keep them, with a dangling primary group reference.
    KeepOrphanedUsers,
}

/// Result of [`AccountSet::remove_group`].
#[derive(Debug, Clone)]
pub struct GroupRemoval {
    /// The removed group
    pub group: Group,
    /// Users removed because the group was their only one
    pub removed_users: Vec<User>,
}

/// A collection of users and groups with enforced referential integrity.
#[derive(Debug, Clone, Default)]
pub struct AccountSet {
    uniqueness: Uniqueness,
    group_removal: GroupRemovalPolicy,
    users: HashMap<UserId, User>,
    user_order: Vec<UserId>,
    user_names: HashMap<String, Vec<UserId>>,
    groups: HashMap<GroupId, Group>,
    group_order: Vec<GroupId>,
    group_names: HashMap<String, GroupId>,
}

impl AccountSet {
    /// Create an empty strict set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty staging set for an import batch.
    pub fn staging() -> Self {
        Self {
            uniqueness: Uniqueness::Staging,
            ..Self::default()
        }
    }

    pub fn with_group_removal(mut self, policy: GroupRemovalPolicy) -> Self {
        self.group_removal = policy;
        self
    }

    pub fn uniqueness(&self) -> Uniqueness {
        self.uniqueness
    }

    pub fn group_removal(&self) -> GroupRemovalPolicy {
        self.group_removal
    }

    fn is_strict(&self) -> bool {
        self.uniqueness == Uniqueness::Strict
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.groups.is_empty()
    }

    /// Users in insertion order.
    pub fn users(&self) -> impl Iterator<Item = &User> + '_ {
        self.user_order.iter().filter_map(|id| self.users.get(id))
    }

    /// Snapshot of user ids in insertion order, for iterating while mutating.
    pub fn user_ids(&self) -> Vec<UserId> {
        self.user_order.clone()
    }

    /// Groups in insertion order.
    pub fn groups(&self) -> impl Iterator<Item = &Group> + '_ {
        self.group_order.iter().filter_map(|id| self.groups.get(id))
    }

    pub fn group_ids(&self) -> Vec<GroupId> {
        self.group_order.clone()
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    /// Mutable access to a user's attributes.
    ///
    /// Name and group memberships cannot be changed through the returned
    /// reference; uid changes on a strict set should go through
    /// [`set_uid`](Self::set_uid) so uniqueness is checked.
    pub fn user_mut(&mut self, id: UserId) -> Option<&mut User> {
        self.users.get_mut(&id)
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut Group> {
        self.groups.get_mut(&id)
    }

    /// The first user with this name.
    pub fn user_by_name(&self, name: &str) -> Option<&User> {
        self.user_names
            .get(name)
            .and_then(|ids| ids.first())
            .and_then(|id| self.users.get(id))
    }

    /// Every user with this name. Only staging sets can hold more than one.
    pub fn users_named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a User> + 'a {
        self.user_names
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|id| self.users.get(id))
    }

    pub fn user_by_uid(&self, uid: u32) -> Option<&User> {
        self.users().find(|u| u.uid == Some(uid))
    }

    /// The user whose home directory is `directory`.
    pub fn user_by_directory(&self, directory: &str) -> Option<&User> {
        self.users()
            .find(|u| u.directory.as_deref() == Some(directory))
    }

    pub fn group_by_name(&self, name: &str) -> Option<&Group> {
        self.group_names.get(name).and_then(|id| self.groups.get(id))
    }

    pub fn group_by_gid(&self, gid: u32) -> Option<&Group> {
        self.groups().find(|g| g.gid == Some(gid))
    }

    pub fn uid_is_free(&self, uid: u32) -> bool {
        self.user_by_uid(uid).is_none()
    }

    pub fn gid_is_free(&self, gid: u32) -> bool {
        self.group_by_gid(gid).is_none()
    }

    /// Supplementary members of a group.
    pub fn supplementary_members(&self, id: GroupId) -> Vec<&User> {
        self.groups
            .get(&id)
            .map(|g| g.members.iter().filter_map(|m| self.users.get(m)).collect())
            .unwrap_or_default()
    }

    /// Users whose primary group is this group.
    pub fn primary_members(&self, id: GroupId) -> Vec<&User> {
        match self.groups.get(&id) {
            Some(group) => self.users().filter(|u| u.has_primary(group)).collect(),
            None => Vec::new(),
        }
    }

    /// Whether the group with this gid exists only to be one user's primary
    /// group: it carries that user's name, that user is its only primary
    /// member, and it has no supplementary member other than that user.
    pub fn is_private_group(&self, gid: u32) -> bool {
        let Some(group) = self.group_by_gid(gid) else {
            return false;
        };
        let mut owners = self.users_named(&group.name);
        let (Some(owner), None) = (owners.next(), owners.next()) else {
            return false;
        };
        owner.has_primary(group)
            && group.members.iter().all(|m| *m == owner.id)
            && self
                .users()
                .all(|u| u.id == owner.id || !u.has_primary(group))
    }

    /// Add a user.
    ///
    /// Every name in the user's supplementary groups must already be a group
    /// of the set; the user is added to each of those groups' members.
    ///
    /// # Errors
    ///
    /// `DuplicateName`/`DuplicateId` on a strict set when the name or uid is
    /// taken, `UnknownGroup` when a supplementary group is missing.
    pub fn add_user(&mut self, mut user: User) -> Result<UserId, DirectoryError> {
        if self.is_strict() {
            if self.user_names.contains_key(&user.name) {
                return Err(DirectoryError::DuplicateName {
                    kind: EntityKind::User,
                    name: user.name,
                });
            }
            if let Some(uid) = user.uid.filter(|uid| !self.uid_is_free(*uid)) {
                return Err(DirectoryError::DuplicateId {
                    kind: EntityKind::User,
                    id: uid,
                });
            }
        }
        if let Some(missing) = user
            .groups
            .iter()
            .find(|g| !self.group_names.contains_key(*g))
        {
            return Err(DirectoryError::UnknownGroup {
                user: user.name.clone(),
                group: missing.clone(),
            });
        }

        if self.users.contains_key(&user.id) {
            user.id = UserId::generate();
        }
        let id = user.id;
        let group_ids: Vec<GroupId> = user
            .groups
            .iter()
            .filter_map(|g| self.group_names.get(g).copied())
            .collect();
        for gid in group_ids {
            if let Some(group) = self.groups.get_mut(&gid)
                && !group.members.contains(&id)
            {
                group.members.push(id);
            }
        }

        tracing::debug!(user = %user.name, uid = ?user.uid, "Added user");
        self.user_names.entry(user.name.clone()).or_default().push(id);
        self.user_order.push(id);
        self.users.insert(id, user);
        Ok(id)
    }

    /// Add a group together with its supplementary members.
    ///
    /// Members that are already part of the set (matched by name) are linked;
    /// the others are added first. Each member gets the group appended to its
    /// supplementary groups if absent.
    pub fn add_group(
        &mut self,
        mut group: Group,
        members: impl IntoIterator<Item = User>,
    ) -> Result<GroupId, DirectoryError> {
        if self.group_names.contains_key(&group.name) {
            return Err(DirectoryError::DuplicateName {
                kind: EntityKind::Group,
                name: group.name,
            });
        }
        if self.is_strict()
            && let Some(gid) = group.gid.filter(|gid| !self.gid_is_free(*gid))
        {
            return Err(DirectoryError::DuplicateId {
                kind: EntityKind::Group,
                id: gid,
            });
        }

        let members: Vec<User> = members.into_iter().collect();
        self.check_new_members(&group.name, &members)?;

        group.members.clear();
        if self.groups.contains_key(&group.id) {
            group.id = GroupId::generate();
        }
        let id = group.id;
        tracing::debug!(group = %group.name, gid = ?group.gid, "Added group");
        self.group_names.insert(group.name.clone(), id);
        self.group_order.push(id);
        self.groups.insert(id, group);

        for member in members {
            let existing = self.user_by_name(&member.name).map(User::id);
            let user_id = match existing {
                Some(user_id) => user_id,
                None => self.add_user(member)?,
            };
            self.link(user_id, id);
        }
        Ok(id)
    }

    /// Validate the members of a group about to be added, so that adding the
    /// group cannot fail halfway.
    fn check_new_members(&self, group: &str, members: &[User]) -> Result<(), DirectoryError> {
        let mut names = HashSet::new();
        let mut uids = HashSet::new();
        for member in members {
            if self.user_names.contains_key(&member.name) {
                continue;
            }
            if let Some(missing) = member
                .groups
                .iter()
                .find(|g| *g != group && !self.group_names.contains_key(*g))
            {
                return Err(DirectoryError::UnknownGroup {
                    user: member.name.clone(),
                    group: missing.clone(),
                });
            }
            if self.is_strict() {
                if !names.insert(member.name.as_str()) {
                    return Err(DirectoryError::DuplicateName {
                        kind: EntityKind::User,
                        name: member.name.clone(),
                    });
                }
                if let Some(uid) = member.uid
                    && (!self.uid_is_free(uid) || !uids.insert(uid))
                {
                    return Err(DirectoryError::DuplicateId {
                        kind: EntityKind::User,
                        id: uid,
                    });
                }
            }
        }
        Ok(())
    }

    /// Remove a user, dropping it from every group. A private group left
    /// without any member is removed as well.
    pub fn remove_user(&mut self, id: UserId) -> Result<User, DirectoryError> {
        let user = self
            .users
            .remove(&id)
            .ok_or(DirectoryError::UserNotFound { id })?;
        self.user_order.retain(|u| *u != id);
        self.unindex_user_name(&user.name, id);

        for name in &user.groups {
            if let Some(group) = self
                .group_names
                .get(name)
                .and_then(|gid| self.groups.get_mut(gid))
            {
                group.members.retain(|m| *m != id);
            }
        }

        if let Some(&private) = self.group_names.get(&user.name) {
            let orphaned = self.groups.get(&private).is_some_and(|group| {
                user.has_primary(group)
                    && group.members.is_empty()
                    && !self.users().any(|u| u.has_primary(group))
            });
            if orphaned {
                tracing::debug!(group = %user.name, "Removed private group with its user");
                self.drop_group_entry(private);
            }
        }

        tracing::debug!(user = %user.name, "Removed user");
        Ok(user)
    }

    /// Remove a group, dropping it from every member's supplementary groups.
    ///
    /// With [`GroupRemovalPolicy::RemoveOrphanedUsers`], users whose primary
    /// group was this group and who are left without supplementary groups are
    /// removed too and returned in [`GroupRemoval::removed_users`].
    pub fn remove_group(&mut self, id: GroupId) -> Result<GroupRemoval, DirectoryError> {
        let group = self
            .drop_group_entry(id)
            .ok_or(DirectoryError::GroupNotFound { id })?;

        for member in &group.members {
            if let Some(user) = self.users.get_mut(member) {
                user.groups.retain(|g| *g != group.name);
            }
        }

        let mut removed_users = Vec::new();
        if self.group_removal == GroupRemovalPolicy::RemoveOrphanedUsers {
            let orphans: Vec<UserId> = self
                .users()
                .filter(|u| u.groups.is_empty() && u.has_primary(&group))
                .map(|u| u.id)
                .collect();
            for orphan in orphans {
                removed_users.push(self.remove_user(orphan)?);
            }
        }

        tracing::debug!(
            group = %group.name,
            removed_users = removed_users.len(),
            "Removed group"
        );
        Ok(GroupRemoval {
            group,
            removed_users,
        })
    }

    /// Rename a user. Group memberships follow automatically.
    pub fn rename_user(
        &mut self,
        id: UserId,
        name: impl Into<String>,
    ) -> Result<(), DirectoryError> {
        let name = name.into();
        if !self.users.contains_key(&id) {
            return Err(DirectoryError::UserNotFound { id });
        }
        if self.is_strict()
            && self
                .user_names
                .get(&name)
                .is_some_and(|ids| ids.iter().any(|u| *u != id))
        {
            return Err(DirectoryError::DuplicateName {
                kind: EntityKind::User,
                name,
            });
        }
        let Some(user) = self.users.get_mut(&id) else {
            return Err(DirectoryError::UserNotFound { id });
        };
        let old = std::mem::replace(&mut user.name, name.clone());
        self.unindex_user_name(&old, id);
        self.user_names.entry(name).or_default().push(id);
        Ok(())
    }

    /// Rename a group, updating every member's supplementary groups and every
    /// cached primary group name.
    pub fn rename_group(
        &mut self,
        id: GroupId,
        name: impl Into<String>,
    ) -> Result<(), DirectoryError> {
        let name = name.into();
        if self.group_names.get(&name).is_some_and(|g| *g != id) {
            return Err(DirectoryError::DuplicateName {
                kind: EntityKind::Group,
                name,
            });
        }
        let group = self
            .groups
            .get_mut(&id)
            .ok_or(DirectoryError::GroupNotFound { id })?;
        let old = std::mem::replace(&mut group.name, name.clone());
        let members = group.members.clone();
        self.group_names.remove(&old);
        self.group_names.insert(name.clone(), id);

        for member in members {
            if let Some(user) = self.users.get_mut(&member) {
                for g in user.groups.iter_mut().filter(|g| **g == old) {
                    *g = name.clone();
                }
            }
        }
        for user in self.users.values_mut() {
            if user.primary_group.as_deref() == Some(old.as_str()) {
                user.primary_group = Some(name.clone());
            }
        }
        Ok(())
    }

    /// Make a user a supplementary member of a group. Idempotent.
    pub fn add_membership(&mut self, user: UserId, group: GroupId) -> Result<(), DirectoryError> {
        self.check_pair(user, group)?;
        self.link(user, group);
        Ok(())
    }

    /// Drop a supplementary membership. Idempotent.
    pub fn remove_membership(
        &mut self,
        user: UserId,
        group: GroupId,
    ) -> Result<(), DirectoryError> {
        self.check_pair(user, group)?;
        let name = match self.groups.get_mut(&group) {
            Some(g) => {
                g.members.retain(|m| *m != user);
                g.name.clone()
            }
            None => return Err(DirectoryError::GroupNotFound { id: group }),
        };
        if let Some(u) = self.users.get_mut(&user) {
            u.groups.retain(|g| *g != name);
        }
        Ok(())
    }

    /// Point a user at a different primary group.
    pub fn set_primary_group(
        &mut self,
        user: UserId,
        name: impl Into<String>,
        gid: Option<u32>,
    ) -> Result<(), DirectoryError> {
        let u = self
            .users
            .get_mut(&user)
            .ok_or(DirectoryError::UserNotFound { id: user })?;
        u.primary_group = Some(name.into());
        u.gid = gid;
        Ok(())
    }

    /// Change a user's uid, checking uniqueness on strict sets.
    pub fn set_uid(&mut self, user: UserId, uid: Option<u32>) -> Result<(), DirectoryError> {
        if self.is_strict()
            && let Some(taken) = uid.filter(|uid| {
                self.user_by_uid(*uid)
                    .is_some_and(|other| other.id != user)
            })
        {
            return Err(DirectoryError::DuplicateId {
                kind: EntityKind::User,
                id: taken,
            });
        }
        let u = self
            .users
            .get_mut(&user)
            .ok_or(DirectoryError::UserNotFound { id: user })?;
        u.uid = uid;
        Ok(())
    }

    /// Change a group's gid, checking uniqueness on strict sets.
    pub fn set_gid(&mut self, group: GroupId, gid: Option<u32>) -> Result<(), DirectoryError> {
        if self.is_strict()
            && let Some(taken) = gid.filter(|gid| {
                self.group_by_gid(*gid)
                    .is_some_and(|other| other.id != group)
            })
        {
            return Err(DirectoryError::DuplicateId {
                kind: EntityKind::Group,
                id: taken,
            });
        }
        let g = self
            .groups
            .get_mut(&group)
            .ok_or(DirectoryError::GroupNotFound { id: group })?;
        g.gid = gid;
        Ok(())
    }

    fn check_pair(&self, user: UserId, group: GroupId) -> Result<(), DirectoryError> {
        if !self.users.contains_key(&user) {
            return Err(DirectoryError::UserNotFound { id: user });
        }
        if !self.groups.contains_key(&group) {
            return Err(DirectoryError::GroupNotFound { id: group });
        }
        Ok(())
    }

    fn link(&mut self, user: UserId, group: GroupId) {
        let Some(g) = self.groups.get_mut(&group) else {
            return;
        };
        if !g.members.contains(&user) {
            g.members.push(user);
        }
        let name = g.name.clone();
        if let Some(u) = self.users.get_mut(&user)
            && !u.groups.contains(&name)
        {
            u.groups.push(name);
        }
    }

    fn drop_group_entry(&mut self, id: GroupId) -> Option<Group> {
        let group = self.groups.remove(&id)?;
        self.group_order.retain(|g| *g != id);
        self.group_names.remove(&group.name);
        Some(group)
    }

    fn unindex_user_name(&mut self, name: &str, id: UserId) {
        if let Some(ids) = self.user_names.get_mut(name) {
            ids.retain(|u| *u != id);
            if ids.is_empty() {
                self.user_names.remove(name);
            }
        }
    }
}
