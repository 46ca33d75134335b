//! Enumeration of the editable account fields.
//!
//! [`Field`] is shared by the CSV codec (one column per variant, in header
//! order) and by the conflict detector (diagnoses are tagged per field).

use std::fmt;

use serde::{Deserialize, Serialize};

/// One attribute of a [`User`](super::User).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Uid,
    Gid,
    PrimaryGroup,
    RealName,
    Office,
    WorkPhone,
    HomePhone,
    Other,
    Directory,
    Shell,
    Groups,
    LastChange,
    MinAge,
    MaxAge,
    WarnPeriod,
    InactivePeriod,
    Expire,
    EncryptedPassword,
    Password,
}

impl Field {
    /// Every field, in CSV column order.
    pub const ALL: [Field; 20] = [
        Field::Name,
        Field::Uid,
        Field::Gid,
        Field::PrimaryGroup,
        Field::RealName,
        Field::Office,
        Field::WorkPhone,
        Field::HomePhone,
        Field::Other,
        Field::Directory,
        Field::Shell,
        Field::Groups,
        Field::LastChange,
        Field::MinAge,
        Field::MaxAge,
        Field::WarnPeriod,
        Field::InactivePeriod,
        Field::Expire,
        Field::EncryptedPassword,
        Field::Password,
    ];

    /// The GECOS sub-fields.
    pub const GECOS: [Field; 5] = [
        Field::RealName,
        Field::Office,
        Field::WorkPhone,
        Field::HomePhone,
        Field::Other,
    ];

    /// The password-aging fields.
    pub const AGING: [Field; 6] = [
        Field::LastChange,
        Field::MinAge,
        Field::MaxAge,
        Field::WarnPeriod,
        Field::InactivePeriod,
        Field::Expire,
    ];

    /// The CSV header for this field. Header names are fixed and locale independent.
    pub const fn header(self) -> &'static str {
        match self {
            Field::Name => "Username",
            Field::Uid => "UID",
            Field::Gid => "GID",
            Field::PrimaryGroup => "Primary group",
            Field::RealName => "Real name",
            Field::Office => "Office",
            Field::WorkPhone => "Office phone",
            Field::HomePhone => "Home phone",
            Field::Other => "Other",
            Field::Directory => "Directory",
            Field::Shell => "Shell",
            Field::Groups => "Groups",
            Field::LastChange => "Last password change",
            Field::MinAge => "Minimum password age",
            Field::MaxAge => "Maximum password age",
            Field::WarnPeriod => "Warning period",
            Field::InactivePeriod => "Inactivity period",
            Field::Expire => "Expiration",
            Field::EncryptedPassword => "Encrypted password",
            Field::Password => "Password",
        }
    }

    /// Look up a field by its CSV header. Surrounding whitespace is ignored.
    pub fn from_header(header: &str) -> Option<Field> {
        let header = header.trim();
        Field::ALL.into_iter().find(|f| f.header() == header)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Name => "name",
            Field::Uid => "uid",
            Field::Gid => "gid",
            Field::PrimaryGroup => "primary_group",
            Field::RealName => "rname",
            Field::Office => "office",
            Field::WorkPhone => "wphone",
            Field::HomePhone => "hphone",
            Field::Other => "other",
            Field::Directory => "directory",
            Field::Shell => "shell",
            Field::Groups => "groups",
            Field::LastChange => "lstchg",
            Field::MinAge => "min",
            Field::MaxAge => "max",
            Field::WarnPeriod => "warn",
            Field::InactivePeriod => "inact",
            Field::Expire => "expire",
            Field::EncryptedPassword => "password",
            Field::Password => "plainpw",
        };
        f.write_str(name)
    }
}
