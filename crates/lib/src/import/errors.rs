//! Error types for batch loading.
//!
//! Malformed values inside a source never produce an error; they are loaded
//! as missing fields and diagnosed later. Only an unreadable source fails.

use std::path::PathBuf;

use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ImportError {
    /// The CSV stream could not be read or written.
    #[error("CSV error")]
    Csv {
        #[source]
        source: csv::Error,
    },

    /// An account database file exists but could not be read.
    #[error("Cannot read {}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ImportError {
    pub fn is_io_error(&self) -> bool {
        match self {
            ImportError::Csv { source } => source.is_io_error(),
            ImportError::SourceUnreadable { .. } => true,
        }
    }
}

impl From<csv::Error> for ImportError {
    fn from(source: csv::Error) -> Self {
        ImportError::Csv { source }
    }
}

impl From<ImportError> for crate::Error {
    fn from(err: ImportError) -> Self {
        crate::Error::Import(err)
    }
}
