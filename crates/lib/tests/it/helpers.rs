use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use lab_accounts::{
    AccountSet, Config, FixedClock, Group, User,
    conflict::{DetectContext, Report, detect_conflicts},
    crypto::{CryptoError, PasswordEncryptor},
    import::BatchLoader,
    system::{AccountCommands, CommandFailure, HomeProbe, LiveDirectory, NewUser, Owner},
};

// ===== COLLABORATOR FAKES =====

/// Probe answering from a fixed table of owners.
#[derive(Debug, Default)]
pub struct FakeProbe {
    owners: HashMap<PathBuf, Owner>,
    failing: HashSet<PathBuf>,
}

impl FakeProbe {
    pub fn with_owner(mut self, path: &str, uid: u32, gid: u32) -> Self {
        self.owners.insert(PathBuf::from(path), Owner { uid, gid });
        self
    }

    pub fn failing(mut self, path: &str) -> Self {
        self.failing.insert(PathBuf::from(path));
        self
    }
}

impl HomeProbe for FakeProbe {
    fn owner(&self, path: &Path) -> io::Result<Option<Owner>> {
        if self.failing.contains(path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "stat denied"));
        }
        Ok(self.owners.get(path).copied())
    }
}

/// Deterministic stand-in for a real hash.
#[derive(Debug, Default)]
pub struct PlainEncryptor;

impl PasswordEncryptor for PlainEncryptor {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        Ok(format!("$plain${plaintext}"))
    }
}

/// Account commands that only record what they were asked to do.
#[derive(Debug, Default)]
pub struct RecordingCommands {
    pub calls: Vec<String>,
    pub fail_groups: HashSet<String>,
    pub fail_users: HashSet<String>,
}

impl RecordingCommands {
    fn failure(command: String) -> CommandFailure {
        CommandFailure {
            command,
            status: Some(9),
            stdout: String::new(),
            stderr: "already exists".to_string(),
        }
    }
}

impl AccountCommands for RecordingCommands {
    fn create_group(&mut self, name: &str, gid: Option<u32>) -> Result<(), CommandFailure> {
        let call = match gid {
            Some(gid) => format!("groupadd -g {gid} {name}"),
            None => format!("groupadd {name}"),
        };
        self.calls.push(call.clone());
        if self.fail_groups.contains(name) {
            return Err(Self::failure(call));
        }
        Ok(())
    }

    fn create_user(&mut self, request: &NewUser<'_>) -> Result<(), CommandFailure> {
        let user = request.user;
        let call = format!(
            "useradd -u {} -g {} {}{}",
            user.uid.unwrap_or_default(),
            user.primary_group.as_deref().unwrap_or_default(),
            if request.create_home { "-m " } else { "-M " },
            user.name()
        );
        self.calls.push(call.clone());
        if self.fail_users.contains(user.name()) {
            return Err(Self::failure(call));
        }
        Ok(())
    }

    fn add_membership(&mut self, user: &str, group: &str) -> Result<(), CommandFailure> {
        self.calls.push(format!("usermod -a -G {group} {user}"));
        Ok(())
    }
}

// ===== LIVE DIRECTORY BUILDERS =====

/// Day used by the test clock (2024-01-01).
pub const TODAY: i64 = 19723;

pub fn shells() -> Vec<String> {
    ["/bin/bash", "/bin/sh", "/usr/sbin/nologin"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// A fully populated account as autocompletion would produce it, with a
/// private primary group of the same id.
pub fn complete_user(name: &str, uid: u32) -> User {
    let mut user = User::new(name)
        .with_uid(uid)
        .with_gid(uid)
        .with_primary_group(name)
        .with_directory(format!("/home/{name}"))
        .with_shell("/bin/bash");
    user.lstchg = Some(TODAY);
    user.min = Some(0);
    user.max = Some(99999);
    user.warn = Some(7);
    user.inact = Some(-1);
    user.expire = Some(-1);
    user.password = Some("!".to_string());
    user
}

pub fn live_directory(groups: Vec<Group>, users: Vec<User>) -> LiveDirectory {
    let mut set = AccountSet::new();
    for group in groups {
        set.add_group(group, []).expect("Failed to add live group");
    }
    for user in users {
        set.add_user(user).expect("Failed to add live user");
    }
    LiveDirectory::from_parts(set, shells())
}

/// Live system with user `bob` (uid/gid 1000) and group `teachers` (gid 2001).
pub fn bob_live() -> LiveDirectory {
    live_directory(
        vec![Group::new("bob", Some(1000)), Group::new("teachers", Some(2001))],
        vec![complete_user("bob", 1000)],
    )
}

pub fn empty_live() -> LiveDirectory {
    LiveDirectory::from_parts(AccountSet::new(), shells())
}

// ===== PIPELINE SHORTCUTS =====

/// Load a CSV document into a staging set with the test clock and encryptor.
pub fn stage_csv(live: &LiveDirectory, config: &Config, csv: &str) -> AccountSet {
    let clock = FixedClock::default();
    BatchLoader::new(live.accounts(), config, &clock, &PlainEncryptor)
        .load_csv(csv.as_bytes())
        .expect("Failed to load CSV")
}

pub fn detect(staging: &AccountSet, live: &LiveDirectory, probe: &FakeProbe) -> Report {
    let config = Config::default();
    detect_conflicts(staging, &DetectContext::new(live, probe, &config))
}

/// The first staged user with this name.
pub fn staged<'a>(set: &'a AccountSet, name: &str) -> &'a User {
    set.user_by_name(name)
        .unwrap_or_else(|| panic!("no staged user {name}"))
}
