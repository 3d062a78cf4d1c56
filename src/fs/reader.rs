use std::io::{self, Read};

use tracing::{debug, trace};

use super::cursor::{Decoder, StreamCursor};
use crate::cpio::CpioEntry;
use crate::error::{Error, Result};

/// Payload of one archive entry, read straight off the shared decoder.
///
/// Holds the filesystem's cursor for as long as it lives, so a second
/// content stream cannot be opened until this one is dropped.
pub struct EntryReader<'a> {
    decoder: &'a mut Decoder,
    entry: CpioEntry,
}

impl EntryReader<'_> {
    pub fn entry(&self) -> &CpioEntry {
        &self.entry
    }

    /// Payload length announced by the entry header.
    pub fn size(&self) -> u64 {
        self.entry.size
    }
}

impl Read for EntryReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.decoder.read(buf)
    }
}

/// Rewind `cursor` and skip forward until the entry identified by `target`
/// is under the decoder.
///
/// Cost grows with the entry's position in the archive: every call decodes
/// the archive from the start.
///
/// # Errors
///
/// [`Error::EntryVanished`] when the archive ends without the entry,
/// [`Error::ArchiveOpen`] when it can no longer be opened, and
/// [`Error::Io`] for read failures along the way.
pub(crate) fn locate<'a>(
    cursor: &'a mut StreamCursor,
    target: &CpioEntry,
) -> Result<EntryReader<'a>> {
    let found = match cursor.rewind()? {
        Some(decoder) => skip_to(decoder, target),
        None => Ok(None),
    };

    let entry = match found {
        Ok(Some(entry)) => entry,
        Ok(None) => {
            cursor.close();
            return Err(Error::EntryVanished(target.name().to_string()));
        }
        Err(e) => {
            cursor.close();
            return Err(e.into());
        }
    };
    match cursor.decoder() {
        Some(decoder) => Ok(EntryReader { decoder, entry }),
        None => Err(Error::EntryVanished(target.name().to_string())),
    }
}

fn skip_to(decoder: &mut Decoder, target: &CpioEntry) -> io::Result<Option<CpioEntry>> {
    let mut skipped = 0u64;
    while let Some(entry) = decoder.next_entry()? {
        if entry.id == target.id {
            debug!(entry = entry.name(), skipped, "located entry");
            return Ok(Some(entry));
        }
        trace!(entry = entry.name(), "skipping entry");
        skipped += 1;
    }
    debug!(entry = target.name(), skipped, "entry not found on rescan");
    Ok(None)
}
