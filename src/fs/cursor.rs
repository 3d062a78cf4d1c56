use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::compression::{ArchiveInput, Compression};
use crate::cpio::CpioReader;
use crate::error::{Error, Result};

/// Decoder bound to the staged archive file.
pub type Decoder = CpioReader<ArchiveInput>;

/// Owner of the single live decoder over a staged archive.
///
/// CPIO streams cannot seek, so the only way back to an earlier entry is to
/// drop the decoder and start again from byte 0. At most one decoder is
/// open at any time.
pub struct StreamCursor {
    path: PathBuf,
    compression: Compression,
    decoder: Option<Decoder>,
    opened: u64,
}

impl StreamCursor {
    pub fn new(path: impl Into<PathBuf>, compression: Compression) -> Self {
        Self {
            path: path.into(),
            compression,
            decoder: None,
            opened: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn is_open(&self) -> bool {
        self.decoder.is_some()
    }

    /// How many decoders this cursor has constructed so far.
    pub fn times_opened(&self) -> u64 {
        self.opened
    }

    /// The currently open decoder, if any.
    pub fn decoder(&mut self) -> Option<&mut Decoder> {
        self.decoder.as_mut()
    }

    /// Close any open decoder and open a fresh one positioned at the first
    /// entry.
    ///
    /// Returns `Ok(None)` when the staged file does not exist, which stands
    /// for an empty archive.
    ///
    /// # Errors
    ///
    /// [`Error::ArchiveOpen`] if the file cannot be opened or the declared
    /// compression wrapper cannot be built over it.
    pub fn rewind(&mut self) -> Result<Option<&mut Decoder>> {
        self.close();
        self.open()
    }

    /// Release the open decoder, if any. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(decoder) = self.decoder.take() {
            debug!(
                path = %self.path.display(),
                entries = decoder.entries_read(),
                "closing archive decoder"
            );
            drop(decoder.into_inner());
        }
    }

    fn open(&mut self) -> Result<Option<&mut Decoder>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(
                    path = %self.path.display(),
                    "staged archive does not exist, treating as empty"
                );
                return Ok(None);
            }
            Err(source) => {
                return Err(Error::ArchiveOpen {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let input =
            ArchiveInput::open(file, self.compression).map_err(|source| Error::ArchiveOpen {
                path: self.path.clone(),
                source,
            })?;

        self.opened += 1;
        debug!(
            path = %self.path.display(),
            scheme = %self.compression,
            opened = self.opened,
            "opened archive decoder"
        );
        Ok(Some(self.decoder.insert(CpioReader::new(input))))
    }
}

impl Drop for StreamCursor {
    fn drop(&mut self) {
        self.close();
    }
}
