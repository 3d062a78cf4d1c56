//! Read-only filesystem view over a staged CPIO archive.
//!
//! ## Architecture
//!
//! - [`cursor`]: the single decoder connection and its rewind semantics
//! - [`index`]: the path hierarchy built from one full scan
//! - [`reader`]: rescan-and-skip access to entry content
//! - [`path`]: path normalization shared by all of the above
//!
//! ## Lifecycle
//!
//! [`CpioFileSystem::init`] drains the archive once to build the index and
//! closes the decoder. Every [`CpioFileSystem::open_content`] call rewinds
//! to byte 0 and skips entries until it meets the requested one, because
//! the archive stream offers no way to seek.

mod cursor;
#[cfg(test)]
mod fixture;
mod index;
pub mod path;
mod reader;

pub use cursor::{Decoder, StreamCursor};
pub use index::{NamespaceIndex, Node, NodeKind};
pub use reader::EntryReader;

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::compression::Compression;
use crate::error::{Error, Result};

enum IndexState {
    Pending,
    Ready(NamespaceIndex),
    Failed,
}

/// A mounted CPIO archive.
///
/// The filesystem exclusively owns its cursor and index. Lookups only need
/// `&self`; reading content needs `&mut self` because it moves the shared
/// decoder.
///
/// ## Example
///
/// ```no_run
/// use std::io::Read;
/// use cpiofs::{Compression, CpioFileSystem};
///
/// fn main() -> cpiofs::Result<()> {
///     let mut fs = CpioFileSystem::mount("initramfs.cpio.gz", Compression::Gzip)?;
///
///     for name in fs.resolve("etc")?.map(|node| node.children()).unwrap_or_default() {
///         println!("{name}");
///     }
///
///     let mut hosts = String::new();
///     fs.open_content("etc/hosts")?.read_to_string(&mut hosts)?;
///     Ok(())
/// }
/// ```
pub struct CpioFileSystem {
    cursor: StreamCursor,
    state: IndexState,
}

impl CpioFileSystem {
    /// Create an unmounted filesystem over a staged archive file. The file
    /// is not touched until [`init()`](Self::init).
    pub fn new(staged: impl Into<PathBuf>, compression: Compression) -> Self {
        Self {
            cursor: StreamCursor::new(staged, compression),
            state: IndexState::Pending,
        }
    }

    /// Create and initialize in one step.
    pub fn mount(staged: impl Into<PathBuf>, compression: Compression) -> Result<Self> {
        let mut fs = Self::new(staged, compression);
        fs.init()?;
        Ok(fs)
    }

    /// Build the index by scanning the whole archive.
    ///
    /// Calling this again after success does nothing. After a failure the
    /// filesystem is unusable and every call reports [`Error::Unusable`].
    pub fn init(&mut self) -> Result<()> {
        match self.state {
            IndexState::Ready(_) => {
                debug!("archive index already built");
                Ok(())
            }
            IndexState::Failed => Err(Error::Unusable),
            IndexState::Pending => match NamespaceIndex::build(&mut self.cursor) {
                Ok(index) => {
                    info!(
                        path = %self.cursor.path().display(),
                        scheme = %self.cursor.compression(),
                        nodes = index.len(),
                        "mounted archive"
                    );
                    self.state = IndexState::Ready(index);
                    Ok(())
                }
                Err(e) => {
                    self.state = IndexState::Failed;
                    Err(e)
                }
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, IndexState::Ready(_))
    }

    /// The built index.
    pub fn index(&self) -> Result<&NamespaceIndex> {
        match &self.state {
            IndexState::Ready(index) => Ok(index),
            IndexState::Pending => Err(Error::NotInitialized),
            IndexState::Failed => Err(Error::Unusable),
        }
    }

    /// Find the node at `path`. `Ok(None)` means there is no such path.
    pub fn resolve(&self, path: &str) -> Result<Option<&Node>> {
        Ok(self.index()?.get(path))
    }

    /// Child nodes of the directory at `path`, in listing order.
    pub fn list(&self, path: &str) -> Result<Option<Vec<&Node>>> {
        let index = self.index()?;
        Ok(index.get(path).map(|node| index.children(node).collect()))
    }

    /// Open the content of the file at `path`.
    ///
    /// The archive is rescanned from the start up to the entry. The returned
    /// reader borrows the filesystem, so only one content stream can be
    /// open at a time.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if nothing lives at `path`
    /// - [`Error::NotReadable`] for directories and synthesized nodes
    /// - [`Error::EntryVanished`] if the rescan cannot find the entry again
    pub fn open_content(&mut self, path: &str) -> Result<EntryReader<'_>> {
        let node = self
            .index()?
            .get(path)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;

        let entry = match node.entry() {
            Some(entry) if !entry.is_directory() => entry.clone(),
            _ => return Err(Error::NotReadable(node.path().to_string())),
        };

        reader::locate(&mut self.cursor, &entry)
    }

    /// Read the whole content of the file at `path`.
    pub fn read_to_vec(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut reader = self.open_content(path)?;
        // header sizes are untrusted, cap the up-front reservation
        let mut data = Vec::with_capacity(reader.size().min(1 << 20) as usize);
        reader.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Release the decoder. The index stays usable and the next content
    /// read reopens the archive.
    pub fn close_communication_link(&mut self) {
        self.cursor.close();
    }

    pub fn staged_path(&self) -> &Path {
        self.cursor.path()
    }

    pub fn compression(&self) -> Compression {
        self.cursor.compression()
    }

    /// Number of times the archive has been opened, index build included.
    pub fn scans(&self) -> u64 {
        self.cursor.times_opened()
    }
}
