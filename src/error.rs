use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The primary error type for all operations in the `frametar` crate.
#[derive(Debug, Error)]
pub enum ArchiverError {
    /// An input file could not be opened, stat'd or read while creating an archive.
    #[error("Error reading {}: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An input path exists but is not a regular file.
    #[error("Error reading {}: not a regular file", path.display())]
    NotRegularFile { path: PathBuf },

    /// An input file ended before the size recorded in its header.
    /// The missing bytes were zero-filled in the archive.
    #[error("Error reading {}: file shrank while archiving ({actual} of {expected} bytes)", path.display())]
    SourceChanged { path: PathBuf, expected: u64, actual: u64 },

    /// An entry name is empty, too long for the header, or not UTF-8.
    #[error("invalid entry name {name:?}")]
    InvalidName { name: String },

    /// The archive ended in the middle of an entry header (or without an end marker).
    #[error("truncated header: expected {expected} bytes, got {actual}")]
    TruncatedHeader { expected: usize, actual: usize },

    /// The archive ended before an entry's declared content was delivered.
    #[error("truncated content for {name}: expected {expected} bytes, got {actual}")]
    TruncatedContent { name: String, expected: u64, actual: u64 },

    /// A destination file could not be created or written during extraction.
    #[error("cannot write {}: {source}", path.display())]
    DestinationWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Restoring mode or mtime on an extracted file failed.
    #[error("cannot restore metadata on {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading the archive input stream failed.
    #[error("archive read failed: {0}")]
    Source(#[source] io::Error),

    /// Writing to the archive output (or another sink) failed.
    #[error("archive write failed: {0}")]
    Sink(#[source] io::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ArchiverError {
    /// Returns `false` for errors confined to a single input file during creation,
    /// `true` for errors that end the whole pass.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ArchiverError::SourceUnavailable { .. }
                | ArchiverError::NotRegularFile { .. }
                | ArchiverError::SourceChanged { .. }
                | ArchiverError::InvalidName { .. }
                | ArchiverError::Metadata { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ArchiverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_file_errors_are_not_fatal() {
        let missing = ArchiverError::SourceUnavailable {
            path: PathBuf::from("missing.txt"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(!missing.is_fatal());
        assert!(missing.to_string().starts_with("Error reading missing.txt"));

        let truncated = ArchiverError::TruncatedContent { name: "a".into(), expected: 4, actual: 1 };
        assert!(truncated.is_fatal());
        assert!(ArchiverError::Sink(io::Error::from(io::ErrorKind::BrokenPipe)).is_fatal());
    }
}
