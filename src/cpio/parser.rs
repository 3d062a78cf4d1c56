//! Sequential CPIO archive reader.
//!
//! CPIO has no index, so the only way through an archive is forward:
//! 1. Read a header and detect its format from the magic
//! 2. Read the NUL-terminated name and skip its alignment padding
//! 3. Hand out the payload through [`Read`], bounded to the entry size
//! 4. On the next call, skip whatever payload the caller left unread
//!
//! The reader never seeks, so it works unchanged on top of a gzip or
//! bzip2 decompression stream.

use std::io::{self, Read};

use tracing::trace;

use super::structures::*;

/// Running byte sum for `070702` entries.
struct Checksum {
    expected: u32,
    sum: u32,
}

/// Streaming CPIO decoder.
///
/// [`next_entry()`](Self::next_entry) advances to the next record; reading
/// from the decoder itself yields that record's payload until the next
/// call.
///
/// ## Example
///
/// ```ignore
/// let mut reader = CpioReader::new(File::open("initrd.cpio")?);
/// while let Some(entry) = reader.next_entry()? {
///     println!("{} ({} bytes)", entry.name(), entry.size);
/// }
/// ```
pub struct CpioReader<R: Read> {
    inner: R,
    /// Ordinal the next yielded entry will carry
    ordinal: u64,
    /// Unread payload bytes of the current entry
    remaining: u64,
    /// Alignment bytes following the current payload
    trailing_padding: u64,
    checksum: Option<Checksum>,
    finished: bool,
}

impl<R: Read> CpioReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            ordinal: 0,
            remaining: 0,
            trailing_padding: 0,
            checksum: None,
            finished: false,
        }
    }

    /// Advance to the next entry.
    ///
    /// Returns `Ok(None)` at the `TRAILER!!!` record, or on a clean end of
    /// input at a header boundary.
    ///
    /// # Errors
    ///
    /// `InvalidData` for an unknown magic or malformed header fields,
    /// `UnexpectedEof` when the archive is cut short.
    pub fn next_entry(&mut self) -> io::Result<Option<CpioEntry>> {
        if self.finished {
            return Ok(None);
        }

        self.skip_current()?;

        let header = match self.read_header()? {
            Some(header) => header,
            None => {
                self.finished = true;
                return Ok(None);
            }
        };

        if header.name_size == 0 {
            return Err(invalid_data("entry with empty name"));
        }
        if header.name_size > MAX_NAME_SIZE {
            return Err(invalid_data(format!(
                "entry name of {} bytes exceeds the {MAX_NAME_SIZE} byte limit",
                header.name_size
            )));
        }
        let mut name_bytes = vec![0u8; header.name_size as usize];
        self.inner.read_exact(&mut name_bytes)?;
        if name_bytes.pop() != Some(0) {
            return Err(invalid_data("entry name is not NUL terminated"));
        }
        // Some writers pad the name field with extra NULs
        while name_bytes.last() == Some(&0) {
            name_bytes.pop();
        }
        let name = String::from_utf8_lossy(&name_bytes).to_string();

        let align = header.format.alignment();
        let name_padding = padding(header.format.header_size() as u64 + header.name_size, align);
        self.skip(name_padding)?;

        if name == TRAILER_NAME {
            trace!(entries = self.ordinal, "reached cpio trailer");
            self.finished = true;
            return Ok(None);
        }

        self.remaining = header.file_size;
        self.trailing_padding = padding(header.file_size, align);
        self.checksum = (header.format == Format::Crc).then_some(Checksum {
            expected: header.checksum,
            sum: 0,
        });

        let entry = CpioEntry::from_header(header, self.ordinal, name);
        self.ordinal += 1;
        Ok(Some(entry))
    }

    /// Number of entries yielded so far.
    pub fn entries_read(&self) -> u64 {
        self.ordinal
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read the fixed-size header, or `None` on a clean EOF before its
    /// first byte.
    fn read_header(&mut self) -> io::Result<Option<RawHeader>> {
        let mut magic = [0u8; 2];
        if !read_exact_or_eof(&mut self.inner, &mut magic)? {
            return Ok(None);
        }

        if let Some(format) = Format::from_binary_magic(magic) {
            let mut data = [0u8; BINARY_HEADER_SIZE];
            data[..2].copy_from_slice(&magic);
            self.inner.read_exact(&mut data[2..])?;
            return RawHeader::parse_binary(format, &data).map(Some);
        }

        let mut data = [0u8; NEWC_HEADER_SIZE];
        data[..2].copy_from_slice(&magic);
        self.inner.read_exact(&mut data[2..6])?;

        let format = Format::from_ascii_magic(&data[..6]).ok_or_else(|| {
            invalid_data(format!(
                "unrecognized cpio magic {:?}",
                String::from_utf8_lossy(&data[..6])
            ))
        })?;

        let size = format.header_size();
        self.inner.read_exact(&mut data[6..size])?;
        let header = match format {
            Format::Odc => RawHeader::parse_odc(&data[..size])?,
            _ => RawHeader::parse_newc(format, &data[..size])?,
        };
        Ok(Some(header))
    }

    /// Discard the rest of the current entry, padding included.
    fn skip_current(&mut self) -> io::Result<()> {
        let count = self.remaining + self.trailing_padding;
        self.skip(count)?;
        self.remaining = 0;
        self.trailing_padding = 0;
        self.checksum = None;
        Ok(())
    }

    fn skip(&mut self, count: u64) -> io::Result<()> {
        if count == 0 {
            return Ok(());
        }
        let skipped = io::copy(&mut (&mut self.inner).take(count), &mut io::sink())?;
        if skipped < count {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "archive truncated while skipping entry data",
            ));
        }
        Ok(())
    }
}

impl<R: Read> Read for CpioReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let max = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let n = self.inner.read(&mut buf[..max])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "archive truncated inside entry content",
            ));
        }
        self.remaining -= n as u64;

        if let Some(checksum) = &mut self.checksum {
            checksum.sum = buf[..n]
                .iter()
                .fold(checksum.sum, |acc, b| acc.wrapping_add(*b as u32));
            if self.remaining == 0 && checksum.sum != checksum.expected {
                return Err(invalid_data(format!(
                    "checksum mismatch: header says {:#x}, content sums to {:#x}",
                    checksum.expected, checksum.sum
                )));
            }
        }

        Ok(n)
    }
}

/// Fill `buf` completely, or return `false` if the input ends before the
/// first byte. Ending part-way through is an error.
fn read_exact_or_eof<R: Read>(input: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "archive truncated inside a header",
                ));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}
