//! Constants used throughout the library.
//!
//! Defaults applied by autocompletion and the identifier ranges used by the
//! allocator live here.

use crate::directory::IdRange;

/// Identifiers handed out to regular (human) accounts.
pub const REGULAR_IDS: IdRange = IdRange::new(1000, 29999);

/// Identifiers reserved for system accounts.
pub const SYSTEM_IDS: IdRange = IdRange::new(0, 999);

/// Parent directory of generated home directories.
pub const DEFAULT_HOME_BASE: &str = "/home";

/// Login shell given to users that do not specify one.
pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Password hash placeholder for locked accounts.
pub const LOCKED_PASSWORD: &str = "!";

/// Rounds used for SHA-512 crypt hashes, the glibc default.
pub const SHA_CRYPT_ROUNDS: usize = 5000;

/// Default minimum password age in days.
pub const DEFAULT_MIN_AGE: i64 = 0;

/// Default maximum password age in days.
pub const DEFAULT_MAX_AGE: i64 = 99999;

/// Default password warning period in days.
pub const DEFAULT_WARN_PERIOD: i64 = 7;

/// Value of `inact` and `expire` meaning "never".
pub const NEVER: i64 = -1;

/// Smallest valid password-aging value.
pub const AGING_MIN: i64 = -1;

/// Largest valid password-aging value.
pub const AGING_MAX: i64 = i32::MAX as i64;
