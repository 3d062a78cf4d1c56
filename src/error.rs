use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while mounting and reading a CPIO archive.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The staged file could not be opened, or the declared compression
    /// wrapper could not be constructed over it.
    #[error("could not open archive {}: {source}", path.display())]
    ArchiveOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Reading the archive failed while the index was being built.
    #[error("failed to build archive index: {0}")]
    IndexBuild(#[source] io::Error),
    #[error("no such file or directory: {0}")]
    NotFound(String),
    /// Content was requested for a directory or a synthesized node.
    #[error("not a readable file: {0}")]
    NotReadable(String),
    /// A rescan reached the end of the archive without meeting the entry
    /// the index was built from.
    #[error("entry vanished from archive during rescan: {0}")]
    EntryVanished(String),
    #[error("archive index has not been built yet")]
    NotInitialized,
    #[error("archive is unusable after a failed index build")]
    Unusable,
    #[error("failed to stage archive: {0}")]
    Stage(String),
    #[error("there was an i/o error: {0}")]
    Io(#[from] io::Error),
}
