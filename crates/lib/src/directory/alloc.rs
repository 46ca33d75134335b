//! Free uid/gid allocation.
//!
//! A search walks an inclusive [`IdRange`] (forwards, or backwards when
//! reversed) and returns the first id that is neither used by the set nor
//! listed in the caller's exclusion set. The `ignore` id is always treated as
//! free, which lets an existing account keep its own id when re-validated.
//!
//! Batch creation passes the ids it has already handed out as the exclusion
//! set, so many ids can be chosen before any of them is added to the set.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::AccountSet;

/// An inclusive range of uids or gids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRange {
    pub start: u32,
    pub end: u32,
}

impl IdRange {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, id: u32) -> bool {
        (self.start..=self.end).contains(&id)
    }
}

/// Parameters of a free-id search.
#[derive(Debug, Clone, Copy)]
pub struct IdSearch<'a> {
    range: IdRange,
    reverse: bool,
    ignore: Option<u32>,
    exclude: Option<&'a HashSet<u32>>,
}

impl<'a> IdSearch<'a> {
    pub fn new(range: IdRange) -> Self {
        Self {
            range,
            reverse: false,
            ignore: None,
            exclude: None,
        }
    }

    /// Search the regular account range.
    pub fn regular() -> Self {
        Self::new(crate::constants::REGULAR_IDS)
    }

    /// Search the system account range.
    pub fn system() -> Self {
        Self::new(crate::constants::SYSTEM_IDS)
    }

    /// Scan from the end of the range towards the start.
    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// Treat `id` as free even if it is in use.
    pub fn ignoring(mut self, id: Option<u32>) -> Self {
        self.ignore = id;
        self
    }

    /// Never return an id in `exclude`.
    pub fn excluding(mut self, exclude: &'a HashSet<u32>) -> Self {
        self.exclude = Some(exclude);
        self
    }

    fn is_free(&self, id: u32, used: &HashSet<u32>) -> bool {
        if self.ignore == Some(id) {
            return true;
        }
        !used.contains(&id) && !self.exclude.is_some_and(|e| e.contains(&id))
    }

    /// Run the search against a set of used ids.
    pub fn find(&self, used: &HashSet<u32>) -> Option<u32> {
        let IdRange { start, end } = self.range;
        if start > end {
            return None;
        }
        let found = if self.reverse {
            (start..=end).rev().find(|id| self.is_free(*id, used))
        } else {
            (start..=end).find(|id| self.is_free(*id, used))
        };
        if found.is_none() {
            tracing::debug!(start, end, reverse = self.reverse, "No free id in range");
        }
        found
    }
}

impl AccountSet {
    /// Find a free uid. Returns `None` when the range is exhausted.
    pub fn get_free_uid(&self, search: &IdSearch<'_>) -> Option<u32> {
        let used: HashSet<u32> = self.users().filter_map(|u| u.uid).collect();
        search.find(&used)
    }

    /// Find a free gid. Returns `None` when the range is exhausted.
    pub fn get_free_gid(&self, search: &IdSearch<'_>) -> Option<u32> {
        let used: HashSet<u32> = self.groups().filter_map(|g| g.gid).collect();
        search.find(&used)
    }
}
