//! Compression wrappers around the staged archive file.
//!
//! The scheme is declared by the caller, never sniffed: a file mounted as
//! `cpiogz` that does not start with the gzip magic fails to open instead
//! of being read as plain CPIO.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::str::FromStr;

use bzip2::read::BzDecoder;
use flate2::read::MultiGzDecoder;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const BZIP2_MAGIC: &[u8] = b"BZh";

/// Compression applied to the whole archive stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Compression {
    /// Plain CPIO (`cpio` scheme)
    #[default]
    #[value(name = "cpio")]
    None,
    /// gzip-wrapped CPIO (`cpiogz` scheme)
    #[value(name = "cpiogz")]
    Gzip,
    /// bzip2-wrapped CPIO (`cpiobz2` scheme)
    #[value(name = "cpiobz2")]
    Bzip2,
}

impl Compression {
    /// Scheme name this compression is mounted under.
    pub fn scheme(&self) -> &'static str {
        match self {
            Compression::None => "cpio",
            Compression::Gzip => "cpiogz",
            Compression::Bzip2 => "cpiobz2",
        }
    }

    /// Map a scheme name to its compression, case-insensitively.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        if scheme.eq_ignore_ascii_case("cpio") {
            Some(Compression::None)
        } else if scheme.eq_ignore_ascii_case("cpiogz") {
            Some(Compression::Gzip)
        } else if scheme.eq_ignore_ascii_case("cpiobz2") {
            Some(Compression::Bzip2)
        } else {
            None
        }
    }

    fn magic(&self) -> Option<&'static [u8]> {
        match self {
            Compression::None => None,
            Compression::Gzip => Some(GZIP_MAGIC),
            Compression::Bzip2 => Some(BZIP2_MAGIC),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

impl FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_scheme(s).ok_or_else(|| format!("unknown archive scheme: {s}"))
    }
}

/// Decompressed byte stream over the staged file.
#[allow(clippy::large_enum_variant)]
pub enum ArchiveInput {
    Plain(BufReader<File>),
    Gzip(BufReader<MultiGzDecoder<BufReader<File>>>),
    Bzip2(BufReader<BzDecoder<BufReader<File>>>),
}

impl ArchiveInput {
    /// Wrap `file` according to `compression`.
    ///
    /// For compressed schemes the magic bytes are checked and the first
    /// block is decoded up front, so a scheme mismatch or a corrupt
    /// compression header surfaces here rather than half-way through a
    /// scan.
    pub fn open(file: File, compression: Compression) -> io::Result<Self> {
        let mut raw = BufReader::new(file);

        if let Some(magic) = compression.magic() {
            let head = raw.fill_buf()?;
            if !head.starts_with(magic) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("not a {} stream (bad magic)", compression.scheme()),
                ));
            }
        }

        let mut input = match compression {
            Compression::None => ArchiveInput::Plain(raw),
            Compression::Gzip => ArchiveInput::Gzip(BufReader::new(MultiGzDecoder::new(raw))),
            Compression::Bzip2 => ArchiveInput::Bzip2(BufReader::new(BzDecoder::new(raw))),
        };
        input.prime()?;
        Ok(input)
    }

    pub fn compression(&self) -> Compression {
        match self {
            ArchiveInput::Plain(_) => Compression::None,
            ArchiveInput::Gzip(_) => Compression::Gzip,
            ArchiveInput::Bzip2(_) => Compression::Bzip2,
        }
    }

    /// Force the decompressor to parse its header and first block.
    fn prime(&mut self) -> io::Result<()> {
        match self {
            ArchiveInput::Plain(_) => {}
            ArchiveInput::Gzip(r) => {
                r.fill_buf()?;
            }
            ArchiveInput::Bzip2(r) => {
                r.fill_buf()?;
            }
        }
        Ok(())
    }
}

impl Read for ArchiveInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ArchiveInput::Plain(r) => r.read(buf),
            ArchiveInput::Gzip(r) => r.read(buf),
            ArchiveInput::Bzip2(r) => r.read(buf),
        }
    }
}
