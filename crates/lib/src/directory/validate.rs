//! Syntax rules for account fields.

use std::sync::LazyLock;

use regex::Regex;

use crate::constants::{AGING_MAX, AGING_MIN};

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][-a-z0-9_]*$").expect("NAME_RE is a valid regex pattern"));

/// User and group names: a lowercase letter followed by lowercase letters,
/// digits, `-` or `_`.
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// GECOS sub-fields may not contain the passwd (`:`) or GECOS (`,`) separators.
pub fn is_valid_gecos(value: &str) -> bool {
    !value.contains([':', ','])
}

/// Password-aging integers must lie in `[-1, 2147483647]`.
pub fn is_valid_aging(value: i64) -> bool {
    (AGING_MIN..=AGING_MAX).contains(&value)
}
