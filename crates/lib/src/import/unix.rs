//! Parsers for the colon-delimited Unix account databases.
//!
//! Parsing never fails: short lines are padded with empty fields and
//! non-numeric ids become `None`, leaving the conflict detector to flag the
//! result. Blank lines, comments and NIS compat entries (`+`/`-`) are skipped.

use crate::directory::Gecos;

/// One line of a passwd file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswdEntry {
    pub name: String,
    pub password: String,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub gecos: Gecos,
    pub home: String,
    pub shell: String,
}

/// One line of a shadow file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowEntry {
    pub name: String,
    pub password: String,
    pub lstchg: Option<i64>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub warn: Option<i64>,
    pub inact: Option<i64>,
    pub expire: Option<i64>,
}

/// One line of a group file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub name: String,
    pub password: String,
    pub gid: Option<u32>,
    pub members: Vec<String>,
}

fn records(text: &str, width: usize) -> impl Iterator<Item = Vec<&str>> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| {
            !line.is_empty() && !line.starts_with('#') && !line.starts_with(['+', '-'])
        })
        .map(move |line| {
            let mut fields: Vec<&str> = line.splitn(width, ':').collect();
            fields.resize(width, "");
            fields
        })
}

fn number<T: std::str::FromStr>(field: &str) -> Option<T> {
    field.trim().parse().ok()
}

pub fn parse_passwd(text: &str) -> Vec<PasswdEntry> {
    records(text, 7)
        .map(|f| PasswdEntry {
            name: f[0].to_string(),
            password: f[1].to_string(),
            uid: number(f[2]),
            gid: number(f[3]),
            gecos: Gecos::parse(f[4]),
            home: f[5].to_string(),
            shell: f[6].to_string(),
        })
        .collect()
}

pub fn parse_shadow(text: &str) -> Vec<ShadowEntry> {
    records(text, 9)
        .map(|f| ShadowEntry {
            name: f[0].to_string(),
            password: f[1].to_string(),
            lstchg: number(f[2]),
            min: number(f[3]),
            max: number(f[4]),
            warn: number(f[5]),
            inact: number(f[6]),
            expire: number(f[7]),
        })
        .collect()
}

pub fn parse_group(text: &str) -> Vec<GroupEntry> {
    records(text, 4)
        .map(|f| GroupEntry {
            name: f[0].to_string(),
            password: f[1].to_string(),
            gid: number(f[2]),
            members: f[3]
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect(),
        })
        .collect()
}

/// Lines of `/etc/shells`, without comments.
pub fn parse_shells(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
