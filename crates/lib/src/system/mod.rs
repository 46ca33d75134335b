//! Collaborators on the operating-system side.
//!
//! * [`DirectoryReader`] reads the live account databases ([`EtcFiles`]).
//! * [`LiveDirectory`] owns the resulting snapshot and refreshes it on demand.
//! * [`AccountCommands`] applies changes ([`ShellCommands`]).
//! * [`HomeProbe`] inspects home directory ownership ([`FsProbe`]).

pub mod commands;
pub mod etc;
pub mod probe;

pub use commands::{AccountCommands, CommandFailure, NewUser, ShellCommands};
pub use etc::EtcFiles;
pub use probe::{FsProbe, HomeProbe, Owner};

use crate::Result;
use crate::directory::AccountSet;

/// Source of the live account directory.
pub trait DirectoryReader: std::fmt::Debug {
    /// Read every user and group into a strict set.
    fn read_accounts(&self) -> Result<AccountSet>;

    /// Valid login shells.
    fn read_shells(&self) -> Result<Vec<String>>;
}

/// Snapshot of the system's accounts.
///
/// The snapshot is only changed by commit, which mirrors each applied step,
/// and by [`refresh`](Self::refresh), which re-reads it from its reader.
#[derive(Debug)]
pub struct LiveDirectory {
    accounts: AccountSet,
    shells: Vec<String>,
    reader: Option<Box<dyn DirectoryReader>>,
}

impl LiveDirectory {
    /// Read a snapshot from `reader`, keeping the reader for later refreshes.
    pub fn load(reader: Box<dyn DirectoryReader>) -> Result<Self> {
        let mut live = Self {
            accounts: AccountSet::new(),
            shells: Vec::new(),
            reader: Some(reader),
        };
        live.refresh()?;
        Ok(live)
    }

    /// A fixed snapshot with no reader behind it.
    pub fn from_parts(accounts: AccountSet, shells: Vec<String>) -> Self {
        Self {
            accounts,
            shells,
            reader: None,
        }
    }

    /// Re-read the snapshot. A snapshot without a reader is left unchanged.
    pub fn refresh(&mut self) -> Result<()> {
        let Some(reader) = &self.reader else {
            tracing::debug!("Live directory has no reader, keeping snapshot");
            return Ok(());
        };
        self.accounts = reader.read_accounts()?;
        self.shells = reader.read_shells()?;
        tracing::info!(
            users = self.accounts.user_count(),
            groups = self.accounts.group_count(),
            "Refreshed live directory"
        );
        Ok(())
    }

    pub fn accounts(&self) -> &AccountSet {
        &self.accounts
    }

    pub(crate) fn accounts_mut(&mut self) -> &mut AccountSet {
        &mut self.accounts
    }

    pub fn shells(&self) -> &[String] {
        &self.shells
    }

    pub fn is_valid_shell(&self, shell: &str) -> bool {
        self.shells.iter().any(|s| s == shell)
    }
}
