//! Home directory ownership probe.

use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Numeric owner of a filesystem path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

/// Looks up who owns a path on disk.
pub trait HomeProbe: std::fmt::Debug {
    /// `Ok(None)` when the path does not exist; `Err` when it could not be
    /// examined for any other reason.
    fn owner(&self, path: &Path) -> io::Result<Option<Owner>>;
}

/// Probe backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl HomeProbe for FsProbe {
    fn owner(&self, path: &Path) -> io::Result<Option<Owner>> {
        match std::fs::metadata(path) {
            Ok(meta) => Ok(Some(Owner {
                uid: meta.uid(),
                gid: meta.gid(),
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
