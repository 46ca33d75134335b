//! Import session driving a batch from load to commit.
//!
//! An [`ImportSession`] owns one staging set and the latest detector report
//! for it. Every mutation goes through the session and is followed by a new
//! detector pass, so the report always describes the current batch. The live
//! directory is passed in explicitly on each call.

use std::io::{Read, Write};
use std::sync::Arc;

use crate::Result;
use crate::clock::{Clock, SystemClock};
use crate::commit::{CommitProgress, CommitReport, Committer};
use crate::config::Config;
use crate::conflict::{DetectContext, Report, Resolution, detect_conflicts, resolve_conflicts};
use crate::crypto::{PasswordEncryptor, ShaCryptEncryptor};
use crate::directory::{AccountSet, Group, User, UserId};
use crate::import::csv::write_csv;
use crate::import::{BatchLoader, UnixSources};
use crate::provision::{ClassroomTemplate, Credential};
use crate::system::{AccountCommands, FsProbe, HomeProbe, LiveDirectory};

#[derive(Debug)]
pub struct ImportSession {
    config: Config,
    clock: Arc<dyn Clock>,
    encryptor: Arc<dyn PasswordEncryptor>,
    probe: Arc<dyn HomeProbe>,
    staging: AccountSet,
    report: Report,
}

impl ImportSession {
    /// A session using the system clock, SHA-512 crypt hashing and the local
    /// filesystem.
    pub fn new(config: Config) -> Self {
        let staging = AccountSet::staging().with_group_removal(config.group_removal);
        Self {
            config,
            clock: Arc::new(SystemClock),
            encryptor: Arc::new(ShaCryptEncryptor),
            probe: Arc::new(FsProbe),
            staging,
            report: Report::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_encryptor(mut self, encryptor: Arc<dyn PasswordEncryptor>) -> Self {
        self.encryptor = encryptor;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn HomeProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn staging(&self) -> &AccountSet {
        &self.staging
    }

    /// The report of the latest detector pass.
    pub fn report(&self) -> &Report {
        &self.report
    }

    fn loader<'s>(&'s self, live: &'s LiveDirectory) -> BatchLoader<'s> {
        BatchLoader::new(
            live.accounts(),
            &self.config,
            self.clock.as_ref(),
            self.encryptor.as_ref(),
        )
    }

    /// Replace the batch with the users of a CSV stream.
    pub fn load_csv<R: Read>(&mut self, live: &LiveDirectory, reader: R) -> Result<&Report> {
        let staging = self.loader(live).load_csv(reader)?;
        self.staging = staging;
        Ok(self.detect(live))
    }

    /// Replace the batch with the contents of passwd/shadow/group files.
    pub fn load_unix(&mut self, live: &LiveDirectory, sources: &UnixSources) -> Result<&Report> {
        let staging = self.loader(live).load_unix(sources)?;
        self.staging = staging;
        Ok(self.detect(live))
    }

    /// Replace the batch with generated classroom accounts. Returns the
    /// initial credentials.
    pub fn provision(
        &mut self,
        live: &LiveDirectory,
        template: &ClassroomTemplate,
    ) -> Result<Vec<Credential>> {
        let (staging, credentials) = self.loader(live).load_classroom(template)?;
        self.staging = staging;
        self.detect(live);
        Ok(credentials)
    }

    /// Run the detector on the current batch.
    pub fn detect(&mut self, live: &LiveDirectory) -> &Report {
        let ctx = DetectContext::new(live, self.probe.as_ref(), &self.config);
        self.report = detect_conflicts(&self.staging, &ctx);
        &self.report
    }

    /// Edit the attributes of a staged user.
    ///
    /// A plaintext password set by `edit` is hashed again. Name and group
    /// changes go through [`rename_user`](Self::rename_user) and the
    /// membership methods.
    pub fn edit_user<F>(&mut self, live: &LiveDirectory, id: UserId, edit: F) -> Result<&Report>
    where
        F: FnOnce(&mut User),
    {
        let Some(user) = self.staging.user_mut(id) else {
            return Err(crate::directory::DirectoryError::UserNotFound { id }.into());
        };
        let previous = user.plainpw.clone();
        edit(user);
        if user.plainpw != previous
            && let Some(plain) = user.plainpw.as_deref().filter(|p| !p.is_empty())
        {
            user.password = Some(self.encryptor.encrypt(plain)?);
        }
        Ok(self.detect(live))
    }

    pub fn rename_user(
        &mut self,
        live: &LiveDirectory,
        id: UserId,
        name: impl Into<String>,
    ) -> Result<&Report> {
        self.staging.rename_user(id, name)?;
        Ok(self.detect(live))
    }

    /// Add a staged user to a supplementary group, staging the group if needed.
    pub fn add_membership(
        &mut self,
        live: &LiveDirectory,
        id: UserId,
        group: &str,
    ) -> Result<&Report> {
        let group = match self.staging.group_by_name(group).map(Group::id) {
            Some(id) => id,
            None => {
                let gid = live.accounts().group_by_name(group).and_then(|g| g.gid);
                self.staging.add_group(Group::new(group, gid), [])?
            }
        };
        self.staging.add_membership(id, group)?;
        Ok(self.detect(live))
    }

    pub fn remove_membership(
        &mut self,
        live: &LiveDirectory,
        id: UserId,
        group: &str,
    ) -> Result<&Report> {
        if let Some(group) = self.staging.group_by_name(group).map(Group::id) {
            self.staging.remove_membership(id, group)?;
        }
        Ok(self.detect(live))
    }

    /// Drop a user from the batch.
    pub fn remove_user(&mut self, live: &LiveDirectory, id: UserId) -> Result<&Report> {
        self.staging.remove_user(id)?;
        Ok(self.detect(live))
    }

    /// Apply the automatic fixes to the rows currently in error.
    pub fn resolve(&mut self, live: &LiveDirectory) -> Result<Resolution> {
        self.detect(live);
        let ctx = DetectContext::new(live, self.probe.as_ref(), &self.config);
        let resolution = resolve_conflicts(&mut self.staging, &self.report, &ctx)?;
        self.report = resolution.report.clone();
        Ok(resolution)
    }

    /// Remove every user identical to a live account. Returns how many were
    /// removed.
    pub fn drop_identical_users(&mut self, live: &LiveDirectory) -> Result<usize> {
        self.detect(live);
        let identical: Vec<UserId> = self.report.identical_users().collect();
        for id in &identical {
            self.staging.remove_user(*id)?;
        }
        if !identical.is_empty() {
            tracing::info!(removed = identical.len(), "Dropped users identical to live accounts");
        }
        self.detect(live);
        Ok(identical.len())
    }

    /// Apply the batch, then refresh `live`.
    ///
    /// The batch is re-checked first and rejected if any row is in error. After
    /// a commit in which every step succeeded the session starts over with an
    /// empty batch; otherwise the batch is kept for inspection.
    pub fn commit<F>(
        &mut self,
        live: &mut LiveDirectory,
        commands: &mut dyn AccountCommands,
        progress: F,
    ) -> Result<CommitReport>
    where
        F: FnMut(&CommitProgress<'_>),
    {
        self.detect(live);
        let report = Committer::new(live, commands, self.probe.as_ref(), self.clock.as_ref())
            .commit(&self.staging, &self.report, progress)?;
        live.refresh()?;
        if report.is_complete() {
            self.staging = AccountSet::staging().with_group_removal(self.config.group_removal);
            self.report = Report::default();
        } else {
            self.detect(live);
        }
        Ok(report)
    }

    /// Write the batch as CSV.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<()> {
        write_csv(&self.staging, writer)?;
        Ok(())
    }
}
