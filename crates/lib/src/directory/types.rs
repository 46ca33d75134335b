//! Core data types for the account directory

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::field::Field;

/// Stable surrogate key of a [`User`] inside an [`AccountSet`](super::AccountSet).
///
/// Allocated when the user is created and never reused, so renaming a user
/// does not move it within the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(Uuid);

/// Stable surrogate key of a [`Group`] inside an [`AccountSet`](super::AccountSet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(Uuid);

impl UserId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl GroupId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group:{}", self.0)
    }
}

/// The free-text account information stored in the passwd GECOS field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gecos {
    /// Full name
    pub rname: String,
    pub office: String,
    /// Office phone
    pub wphone: String,
    /// Home phone
    pub hphone: String,
    pub other: String,
}

impl Gecos {
    /// Split a raw passwd GECOS field on `,` into the five sub-fields.
    ///
    /// Missing sub-fields are left empty; anything past the fourth comma
    /// lands in `other` unchanged.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.splitn(5, ',');
        let mut next = || parts.next().unwrap_or_default().to_string();
        Self {
            rname: next(),
            office: next(),
            wphone: next(),
            hphone: next(),
            other: next(),
        }
    }

    /// Join the sub-fields back into a passwd GECOS field, dropping trailing empty ones.
    pub fn to_field(&self) -> String {
        let parts = [
            self.rname.as_str(),
            self.office.as_str(),
            self.wphone.as_str(),
            self.hphone.as_str(),
            self.other.as_str(),
        ];
        let used = parts
            .iter()
            .rposition(|p| !p.is_empty())
            .map_or(0, |i| i + 1);
        parts[..used].join(",")
    }

    /// Access a sub-field by its [`Field`] tag.
    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::RealName => Some(&self.rname),
            Field::Office => Some(&self.office),
            Field::WorkPhone => Some(&self.wphone),
            Field::HomePhone => Some(&self.hphone),
            Field::Other => Some(&self.other),
            _ => None,
        }
    }

    /// Mutable access to a sub-field by its [`Field`] tag.
    pub fn get_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::RealName => Some(&mut self.rname),
            Field::Office => Some(&mut self.office),
            Field::WorkPhone => Some(&mut self.wphone),
            Field::HomePhone => Some(&mut self.hphone),
            Field::Other => Some(&mut self.other),
            _ => None,
        }
    }
}

/// A local Unix account.
///
/// Numeric and path attributes are optional because staged users may arrive
/// with missing or malformed values; autocompletion fills the gaps and the
/// conflict detector flags whatever remains invalid.
///
/// `name` and `groups` are owned by the containing set and can only be
/// changed through [`AccountSet`](super::AccountSet) methods once the user
/// has been added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub(crate) id: UserId,
    pub(crate) name: String,
    pub uid: Option<u32>,
    /// Primary group id
    pub gid: Option<u32>,
    /// Cached name of the primary group
    pub primary_group: Option<String>,
    pub gecos: Gecos,
    /// Home directory
    pub directory: Option<String>,
    pub shell: Option<String>,
    /// Supplementary group names, in insertion order, primary group excluded
    pub(crate) groups: Vec<String>,
    /// Days since epoch of the last password change
    pub lstchg: Option<i64>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub warn: Option<i64>,
    pub inact: Option<i64>,
    pub expire: Option<i64>,
    /// Password hash, or a `!`/`*` sentinel for locked and disabled accounts
    pub password: Option<String>,
    /// Plaintext password supplied at import time; never persisted
    #[serde(skip)]
    pub plainpw: Option<String>,
}

impl User {
    /// Create a user with only a name set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: UserId::generate(),
            name: name.into(),
            uid: None,
            gid: None,
            primary_group: None,
            gecos: Gecos::default(),
            directory: None,
            shell: None,
            groups: Vec::new(),
            lstchg: None,
            min: None,
            max: None,
            warn: None,
            inact: None,
            expire: None,
            password: None,
            plainpw: None,
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Supplementary group names.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn is_member_of(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }

    pub fn with_gid(mut self, gid: u32) -> Self {
        self.gid = Some(gid);
        self
    }

    pub fn with_primary_group(mut self, name: impl Into<String>) -> Self {
        self.primary_group = Some(name.into());
        self
    }

    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = Some(shell.into());
        self
    }

    /// Set the supplementary groups of a user that is not yet part of a set.
    ///
    /// Duplicate names are collapsed, keeping the first occurrence.
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.clear();
        for group in groups {
            let group = group.into();
            if !self.groups.contains(&group) {
                self.groups.push(group);
            }
        }
        self
    }

    /// Read one of the password-aging integers.
    pub fn aging(&self, field: Field) -> Option<i64> {
        match field {
            Field::LastChange => self.lstchg,
            Field::MinAge => self.min,
            Field::MaxAge => self.max,
            Field::WarnPeriod => self.warn,
            Field::InactivePeriod => self.inact,
            Field::Expire => self.expire,
            _ => None,
        }
    }

    /// Mutable access to one of the password-aging integers.
    pub fn aging_mut(&mut self, field: Field) -> Option<&mut Option<i64>> {
        match field {
            Field::LastChange => Some(&mut self.lstchg),
            Field::MinAge => Some(&mut self.min),
            Field::MaxAge => Some(&mut self.max),
            Field::WarnPeriod => Some(&mut self.warn),
            Field::InactivePeriod => Some(&mut self.inact),
            Field::Expire => Some(&mut self.expire),
            _ => None,
        }
    }

    /// Whether the user's primary group is `group`.
    ///
    /// The cached primary group name wins when present; the gid is only
    /// consulted for users whose primary group name is unknown.
    pub fn has_primary(&self, group: &Group) -> bool {
        match &self.primary_group {
            Some(name) => *name == group.name,
            None => self.gid.is_some() && self.gid == group.gid,
        }
    }

    /// Compare every stored attribute, ignoring the surrogate id and the
    /// transient plaintext password. Group order is not significant.
    pub fn same_account(&self, other: &User) -> bool {
        let mut mine: Vec<&String> = self.groups.iter().collect();
        let mut theirs: Vec<&String> = other.groups.iter().collect();
        mine.sort();
        theirs.sort();
        self.name == other.name
            && self.uid == other.uid
            && self.gid == other.gid
            && self.primary_group == other.primary_group
            && self.gecos == other.gecos
            && self.directory == other.directory
            && self.shell == other.shell
            && Field::AGING.iter().all(|f| self.aging(*f) == other.aging(*f))
            && self.password == other.password
            && mine == theirs
    }
}

/// A local Unix group.
///
/// `members` lists supplementary members only. Users whose primary group is
/// this group are not members unless explicitly added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub(crate) id: GroupId,
    pub(crate) name: String,
    pub gid: Option<u32>,
    pub password: Option<String>,
    pub(crate) members: Vec<UserId>,
}

impl Group {
    pub fn new(name: impl Into<String>, gid: Option<u32>) -> Self {
        Self {
            id: GroupId::generate(),
            name: name.into(),
            gid,
            password: None,
            members: Vec::new(),
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Supplementary members, in the order they joined.
    pub fn members(&self) -> &[UserId] {
        &self.members
    }

    pub fn has_member(&self, user: UserId) -> bool {
        self.members.contains(&user)
    }
}
