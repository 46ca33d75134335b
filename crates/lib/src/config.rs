//! Import configuration.
//!
//! [`Config`] gathers the defaults applied by autocompletion and the policy
//! switches of the directory model and conflict detector. It deserializes
//! from any serde format with every field optional; locating and reading the
//! configuration file is left to the host application.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_HOME_BASE, DEFAULT_MAX_AGE, DEFAULT_MIN_AGE, DEFAULT_SHELL, DEFAULT_WARN_PERIOD,
    NEVER, REGULAR_IDS,
};
use crate::directory::{GroupRemovalPolicy, IdRange};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Range searched for new regular uids and gids
    pub regular_ids: IdRange,
    /// Only passwd entries whose uid lies in this range are imported
    pub import_uid_range: IdRange,
    /// Parent of generated home directories
    pub home_base: PathBuf,
    pub default_shell: String,
    pub default_min: i64,
    pub default_max: i64,
    pub default_warn: i64,
    pub default_inact: i64,
    pub default_expire: i64,
    /// Cascade applied when a staged group is removed
    pub group_removal: GroupRemovalPolicy,
    /// Report staged users sharing a gid as duplicates
    pub flag_shared_gid: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            regular_ids: REGULAR_IDS,
            import_uid_range: REGULAR_IDS,
            home_base: PathBuf::from(DEFAULT_HOME_BASE),
            default_shell: DEFAULT_SHELL.to_string(),
            default_min: DEFAULT_MIN_AGE,
            default_max: DEFAULT_MAX_AGE,
            default_warn: DEFAULT_WARN_PERIOD,
            default_inact: NEVER,
            default_expire: NEVER,
            group_removal: GroupRemovalPolicy::default(),
            flag_shared_gid: false,
        }
    }
}

impl Config {
    /// Home directory generated for `name`.
    pub fn home_for(&self, name: &str) -> String {
        self.home_base.join(name).to_string_lossy().into_owned()
    }
}
