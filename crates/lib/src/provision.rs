//! Classroom account generation.
//!
//! A [`ClassroomTemplate`] describes a numbered series of accounts
//! (`student01`, `student02`, ...) sharing supplementary groups. The generated
//! users carry only what the template specifies; ids, homes and the rest are
//! filled by autocompletion like any other batch.

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};

use crate::directory::User;

/// How initial passwords are chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordMode {
    /// Accounts start locked
    Locked,
    /// Password equals the user name
    SameAsName,
    /// One password for every account
    Fixed(String),
    /// Independent random alphanumeric passwords
    Random { length: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassroomTemplate {
    pub prefix: String,
    pub count: u32,
    /// Number appended to the first account
    pub first_index: u32,
    /// Zero-padded width of the appended number
    pub digits: usize,
    /// Supplementary groups of every account
    pub groups: Vec<String>,
    /// Real name prefix; the account number is appended
    pub real_name: Option<String>,
    /// An empty password leaves the account locked
    pub passwords: PasswordMode,
}

/// Initial login handed to the operator after provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub name: String,
    /// `None` for locked accounts
    pub password: Option<String>,
}

impl ClassroomTemplate {
    pub fn new(prefix: impl Into<String>, count: u32) -> Self {
        Self {
            prefix: prefix.into(),
            count,
            first_index: 1,
            digits: 2,
            groups: Vec::new(),
            real_name: None,
            passwords: PasswordMode::Locked,
        }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_passwords(mut self, mode: PasswordMode) -> Self {
        self.passwords = mode;
        self
    }

    pub fn with_real_name(mut self, prefix: impl Into<String>) -> Self {
        self.real_name = Some(prefix.into());
        self
    }

    fn number(&self, offset: u32) -> String {
        format!(
            "{:0width$}",
            self.first_index.saturating_add(offset),
            width = self.digits
        )
    }

    /// Account names, in generation order.
    pub fn names(&self) -> Vec<String> {
        (0..self.count)
            .map(|i| format!("{}{}", self.prefix, self.number(i)))
            .collect()
    }

    /// Generate the users and their initial credentials.
    pub fn build<R: Rng>(&self, rng: &mut R) -> (Vec<User>, Vec<Credential>) {
        let mut users = Vec::with_capacity(self.count as usize);
        let mut credentials = Vec::with_capacity(self.count as usize);
        for (i, name) in (0..self.count).zip(self.names()) {
            let password = match &self.passwords {
                PasswordMode::Locked => None,
                PasswordMode::SameAsName => Some(name.clone()),
                PasswordMode::Fixed(password) => Some(password.clone()),
                PasswordMode::Random { length } => Some(
                    (&mut *rng)
                        .sample_iter(&Alphanumeric)
                        .take(*length)
                        .map(char::from)
                        .collect(),
                ),
            }
            .filter(|p| !p.is_empty());
            let mut user = User::new(&name).with_groups(self.groups.iter().cloned());
            if let Some(prefix) = &self.real_name {
                user.gecos.rname = format!("{prefix} {}", self.number(i));
            }
            user.plainpw = password.clone();
            credentials.push(Credential { name, password });
            users.push(user);
        }
        (users, credentials)
    }
}
