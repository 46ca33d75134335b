//! CSV import and export of user accounts.
//!
//! The header row uses the fixed names from [`Field::header`]. Columns may
//! appear in any order; unknown columns are ignored and missing ones leave the
//! field unset. The `Groups` cell holds comma-separated `name[:gid]` pairs
//! with the primary group left out. The `Password` column carries an optional
//! plaintext password on import and is always written empty.

use std::io::{Read, Write};

use super::errors::ImportError;
use crate::directory::{AccountSet, Field, User};

/// A group reference from a `Groups` cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    pub name: String,
    pub gid: Option<u32>,
}

/// A user parsed from one CSV row, with the groups named on that row.
#[derive(Debug, Clone)]
pub struct CsvRow {
    pub user: User,
    pub groups: Vec<GroupSpec>,
}

/// Parse a `Groups` cell. Malformed gids are dropped, keeping the name.
pub fn parse_group_specs(cell: &str) -> Vec<GroupSpec> {
    cell.split(',')
        .map(str::trim)
        .filter(|spec| !spec.is_empty())
        .map(|spec| match spec.split_once(':') {
            Some((name, gid)) => GroupSpec {
                name: name.trim().to_string(),
                gid: gid.trim().parse().ok(),
            },
            None => GroupSpec {
                name: spec.to_string(),
                gid: None,
            },
        })
        .collect()
}

fn optional(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn apply(user: &mut User, groups: &mut Vec<GroupSpec>, field: Field, value: &str) {
    match field {
        // Set when the user is created
        Field::Name => {}
        Field::Uid => user.uid = value.trim().parse().ok(),
        Field::Gid => user.gid = value.trim().parse().ok(),
        Field::PrimaryGroup => user.primary_group = optional(value.trim()),
        Field::RealName
        | Field::Office
        | Field::WorkPhone
        | Field::HomePhone
        | Field::Other => {
            if let Some(slot) = user.gecos.get_mut(field) {
                *slot = value.to_string();
            }
        }
        Field::Directory => user.directory = optional(value.trim()),
        Field::Shell => user.shell = optional(value.trim()),
        Field::Groups => *groups = parse_group_specs(value),
        Field::LastChange
        | Field::MinAge
        | Field::MaxAge
        | Field::WarnPeriod
        | Field::InactivePeriod
        | Field::Expire => {
            if let Some(slot) = user.aging_mut(field) {
                *slot = value.trim().parse().ok();
            }
        }
        Field::EncryptedPassword => user.password = optional(value),
        Field::Password => user.plainpw = optional(value),
    }
}

/// Read every data row of a CSV stream.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<CsvRow>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);
    let columns: Vec<Option<Field>> = reader.headers()?.iter().map(Field::from_header).collect();
    let name_column = columns.iter().position(|c| *c == Some(Field::Name));

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let name = name_column
            .and_then(|i| record.get(i))
            .map(str::trim)
            .unwrap_or_default();
        let mut user = User::new(name);
        let mut groups = Vec::new();
        for (value, field) in record.iter().zip(&columns) {
            if let Some(field) = field {
                apply(&mut user, &mut groups, *field, value);
            }
        }
        user = user.with_groups(groups.iter().map(|g| g.name.clone()));
        rows.push(CsvRow { user, groups });
    }
    tracing::debug!(rows = rows.len(), "Read CSV rows");
    Ok(rows)
}

fn number<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn cell(set: &AccountSet, user: &User, field: Field) -> String {
    match field {
        Field::Name => user.name().to_string(),
        Field::Uid => number(user.uid),
        Field::Gid => number(user.gid),
        Field::PrimaryGroup => user.primary_group.clone().unwrap_or_default(),
        Field::RealName
        | Field::Office
        | Field::WorkPhone
        | Field::HomePhone
        | Field::Other => user.gecos.get(field).unwrap_or_default().to_string(),
        Field::Directory => user.directory.clone().unwrap_or_default(),
        Field::Shell => user.shell.clone().unwrap_or_default(),
        Field::Groups => user
            .groups()
            .iter()
            .filter(|g| user.primary_group.as_deref() != Some(g.as_str()))
            .map(|g| match set.group_by_name(g).and_then(|group| group.gid) {
                Some(gid) => format!("{g}:{gid}"),
                None => g.clone(),
            })
            .collect::<Vec<_>>()
            .join(","),
        Field::LastChange
        | Field::MinAge
        | Field::MaxAge
        | Field::WarnPeriod
        | Field::InactivePeriod
        | Field::Expire => number(user.aging(field)),
        Field::EncryptedPassword => user.password.clone().unwrap_or_default(),
        Field::Password => String::new(),
    }
}

/// Write every user of `set` as CSV, header row first.
pub fn write_csv<W: Write>(set: &AccountSet, writer: W) -> Result<(), ImportError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(Field::ALL.iter().map(|f| f.header()))?;
    for user in set.users() {
        writer.write_record(Field::ALL.iter().map(|f| cell(set, user, *f)))?;
    }
    writer.flush().map_err(|e| ImportError::Csv { source: e.into() })?;
    Ok(())
}
