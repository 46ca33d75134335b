//! Account-management commands.
//!
//! Commit replays a batch through an [`AccountCommands`] implementation. The
//! production one, [`ShellCommands`], shells out to the shadow-utils tools
//! and captures their output so failures can be shown to the operator.

use std::fmt;
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::constants::NEVER;
use crate::directory::User;

/// A failed account command with its captured output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandFailure {
    /// The command line that was run
    pub command: String,
    /// Exit status, `None` if the process could not be started or was killed
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(f, "`{}` exited with status {code}", self.command)?,
            None => write!(f, "`{}` did not run to completion", self.command)?,
        }
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            write!(f, ": {stderr}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CommandFailure {}

/// A user creation request.
#[derive(Debug, Clone, Copy)]
pub struct NewUser<'a> {
    pub user: &'a User,
    /// Whether the home directory must be created (it does not exist yet)
    pub create_home: bool,
}

/// Executes account changes against the operating system.
///
/// Calls are synchronous; a host that needs timeouts or cancellation must
/// wrap the implementation.
pub trait AccountCommands {
    /// Create a group. `gid` of `None` lets the system choose.
    fn create_group(&mut self, name: &str, gid: Option<u32>) -> Result<(), CommandFailure>;

    /// Create a user with its primary group, attributes and password aging.
    /// Supplementary memberships are added separately.
    fn create_user(&mut self, request: &NewUser<'_>) -> Result<(), CommandFailure>;

    /// Add an existing user to an existing group.
    fn add_membership(&mut self, user: &str, group: &str) -> Result<(), CommandFailure>;
}

/// Runs `groupadd`, `useradd`, `chage` and `usermod`.
#[derive(Debug, Clone, Default)]
pub struct ShellCommands;

impl ShellCommands {
    fn run(program: &str, args: &[String]) -> Result<(), CommandFailure> {
        let command = std::iter::once(program)
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::debug!(command = %command, "Running account command");
        match Command::new(program).args(args).output() {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(CommandFailure {
                command,
                status: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
            Err(e) => Err(CommandFailure {
                command,
                status: None,
                stdout: String::new(),
                stderr: e.to_string(),
            }),
        }
    }
}

/// `useradd` arguments for a user.
pub fn useradd_args(request: &NewUser<'_>) -> Vec<String> {
    let user = request.user;
    let mut args = Vec::new();
    if let Some(uid) = user.uid {
        args.extend(["-u".to_string(), uid.to_string()]);
    }
    match (&user.primary_group, user.gid) {
        (Some(group), _) => args.extend(["-g".to_string(), group.clone()]),
        (None, Some(gid)) => args.extend(["-g".to_string(), gid.to_string()]),
        (None, None) => {}
    }
    if let Some(dir) = &user.directory {
        args.extend(["-d".to_string(), dir.clone()]);
    }
    args.push(if request.create_home { "-m" } else { "-M" }.to_string());
    if let Some(shell) = &user.shell {
        args.extend(["-s".to_string(), shell.clone()]);
    }
    let gecos = user.gecos.to_field();
    if !gecos.is_empty() {
        args.extend(["-c".to_string(), gecos]);
    }
    if let Some(password) = &user.password {
        args.extend(["-p".to_string(), password.clone()]);
    }
    args.push(user.name().to_string());
    args
}

/// `chage` arguments applying a user's password aging, or `None` when there
/// is nothing to set.
pub fn chage_args(user: &User) -> Option<Vec<String>> {
    let flags = [
        ("-d", user.lstchg),
        ("-m", user.min),
        ("-M", user.max),
        ("-W", user.warn),
        ("-I", user.inact),
        ("-E", user.expire),
    ];
    let mut args = Vec::new();
    for (flag, value) in flags {
        if let Some(value) = value {
            args.extend([flag.to_string(), value.max(NEVER).to_string()]);
        }
    }
    if args.is_empty() {
        return None;
    }
    args.push(user.name().to_string());
    Some(args)
}

impl AccountCommands for ShellCommands {
    fn create_group(&mut self, name: &str, gid: Option<u32>) -> Result<(), CommandFailure> {
        let mut args = Vec::new();
        if let Some(gid) = gid {
            args.extend(["-g".to_string(), gid.to_string()]);
        }
        args.push(name.to_string());
        Self::run("groupadd", &args)
    }

    fn create_user(&mut self, request: &NewUser<'_>) -> Result<(), CommandFailure> {
        Self::run("useradd", &useradd_args(request))?;
        match chage_args(request.user) {
            Some(args) => Self::run("chage", &args),
            None => Ok(()),
        }
    }

    fn add_membership(&mut self, user: &str, group: &str) -> Result<(), CommandFailure> {
        Self::run(
            "usermod",
            &["-a".to_string(), "-G".to_string(), group.to_string(), user.to_string()],
        )
    }
}
