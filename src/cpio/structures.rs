use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use std::io::{self, Cursor};

/// Name of the pseudo-entry that terminates every CPIO archive.
pub const TRAILER_NAME: &str = "TRAILER!!!";

pub const NEWC_MAGIC: &[u8] = b"070701";
pub const CRC_MAGIC: &[u8] = b"070702";
pub const ODC_MAGIC: &[u8] = b"070707";
pub const BINARY_MAGIC: u16 = 0o070707;

/// Header lengths including the magic.
pub const NEWC_HEADER_SIZE: usize = 110;
pub const ODC_HEADER_SIZE: usize = 76;
pub const BINARY_HEADER_SIZE: usize = 26;

/// Longest accepted name field, NUL included (`PATH_MAX` on Linux).
pub const MAX_NAME_SIZE: u64 = 4096;

pub const S_IFMT: u32 = 0o170000;
pub const S_IFSOCK: u32 = 0o140000;
pub const S_IFLNK: u32 = 0o120000;
pub const S_IFREG: u32 = 0o100000;
pub const S_IFBLK: u32 = 0o060000;
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFCHR: u32 = 0o020000;
pub const S_IFIFO: u32 = 0o010000;

/// CPIO header variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// SVR4 portable format without checksum (`070701`)
    Newc,
    /// SVR4 portable format with checksum (`070702`)
    Crc,
    /// POSIX.1 portable ASCII format (`070707`)
    Odc,
    /// Old binary format, little-endian words
    BinaryLe,
    /// Old binary format, big-endian words
    BinaryBe,
}

impl Format {
    /// Alignment applied after the header+name and after the content.
    pub fn alignment(&self) -> u64 {
        match self {
            Format::Newc | Format::Crc => 4,
            Format::BinaryLe | Format::BinaryBe => 2,
            Format::Odc => 1,
        }
    }

    pub fn header_size(&self) -> usize {
        match self {
            Format::Newc | Format::Crc => NEWC_HEADER_SIZE,
            Format::Odc => ODC_HEADER_SIZE,
            Format::BinaryLe | Format::BinaryBe => BINARY_HEADER_SIZE,
        }
    }

    /// Detect the format from the first two bytes of a header.
    ///
    /// Returns `None` for the ASCII formats, which need the full six byte
    /// magic to tell apart (see [`Format::from_ascii_magic`]).
    pub fn from_binary_magic(bytes: [u8; 2]) -> Option<Self> {
        if LittleEndian::read_u16(&bytes) == BINARY_MAGIC {
            Some(Format::BinaryLe)
        } else if BigEndian::read_u16(&bytes) == BINARY_MAGIC {
            Some(Format::BinaryBe)
        } else {
            None
        }
    }

    pub fn from_ascii_magic(magic: &[u8]) -> Option<Self> {
        if magic == NEWC_MAGIC {
            Some(Format::Newc)
        } else if magic == CRC_MAGIC {
            Some(Format::Crc)
        } else if magic == ODC_MAGIC {
            Some(Format::Odc)
        } else {
            None
        }
    }
}

/// Number of padding bytes needed to bring `len` up to `align`.
pub fn padding(len: u64, align: u64) -> u64 {
    (align - len % align) % align
}

/// Kind of filesystem object an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Regular,
    Directory,
    Symlink,
    CharDevice,
    BlockDevice,
    Fifo,
    Socket,
    Unknown,
}

impl FileType {
    pub fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFREG => FileType::Regular,
            S_IFDIR => FileType::Directory,
            S_IFLNK => FileType::Symlink,
            S_IFCHR => FileType::CharDevice,
            S_IFBLK => FileType::BlockDevice,
            S_IFIFO => FileType::Fifo,
            S_IFSOCK => FileType::Socket,
            _ => FileType::Unknown,
        }
    }

    /// One-letter tag in the style of `ls -l`.
    pub fn as_char(&self) -> char {
        match self {
            FileType::Regular => '-',
            FileType::Directory => 'd',
            FileType::Symlink => 'l',
            FileType::CharDevice => 'c',
            FileType::BlockDevice => 'b',
            FileType::Fifo => 'p',
            FileType::Socket => 's',
            FileType::Unknown => '?',
        }
    }
}

/// Fixed-size part of a CPIO header, decoded but before the name is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHeader {
    pub format: Format,
    pub dev_major: u32,
    pub dev_minor: u32,
    pub ino: u64,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub rdev_major: u32,
    pub rdev_minor: u32,
    pub mtime: u64,
    pub name_size: u64,
    pub file_size: u64,
    pub checksum: u32,
}

impl RawHeader {
    /// Parse a `070701`/`070702` header. `data` holds the whole header,
    /// magic included.
    pub fn parse_newc(format: Format, data: &[u8]) -> io::Result<Self> {
        if data.len() < NEWC_HEADER_SIZE {
            return Err(invalid_data("truncated newc header"));
        }
        let field = |i: usize| hex_field(&data[6 + i * 8..6 + (i + 1) * 8]);

        Ok(Self {
            format,
            ino: field(0)? as u64,
            mode: field(1)?,
            uid: field(2)?,
            gid: field(3)?,
            nlink: field(4)?,
            mtime: field(5)? as u64,
            file_size: field(6)? as u64,
            dev_major: field(7)?,
            dev_minor: field(8)?,
            rdev_major: field(9)?,
            rdev_minor: field(10)?,
            name_size: field(11)? as u64,
            checksum: field(12)?,
        })
    }

    /// Parse a `070707` header.
    pub fn parse_odc(data: &[u8]) -> io::Result<Self> {
        if data.len() < ODC_HEADER_SIZE {
            return Err(invalid_data("truncated odc header"));
        }
        let dev = octal_field(&data[6..12])?;
        let rdev = octal_field(&data[42..48])?;

        Ok(Self {
            format: Format::Odc,
            dev_major: 0,
            dev_minor: dev as u32,
            ino: octal_field(&data[12..18])?,
            mode: octal_field(&data[18..24])? as u32,
            uid: octal_field(&data[24..30])? as u32,
            gid: octal_field(&data[30..36])? as u32,
            nlink: octal_field(&data[36..42])? as u32,
            rdev_major: 0,
            rdev_minor: rdev as u32,
            mtime: octal_field(&data[48..59])?,
            name_size: octal_field(&data[59..65])?,
            file_size: octal_field(&data[65..76])?,
            checksum: 0,
        })
    }

    /// Parse an old binary header; the byte order comes from `format`.
    pub fn parse_binary(format: Format, data: &[u8]) -> io::Result<Self> {
        match format {
            Format::BinaryLe => Self::parse_binary_as::<LittleEndian>(format, data),
            Format::BinaryBe => Self::parse_binary_as::<BigEndian>(format, data),
            _ => Err(invalid_data("not a binary cpio header")),
        }
    }

    fn parse_binary_as<B: ByteOrder>(format: Format, data: &[u8]) -> io::Result<Self> {
        if data.len() < BINARY_HEADER_SIZE {
            return Err(invalid_data("truncated binary header"));
        }

        let mut cursor = Cursor::new(&data[2..]);
        let dev = cursor.read_u16::<B>()?;
        let ino = cursor.read_u16::<B>()?;
        let mode = cursor.read_u16::<B>()?;
        let uid = cursor.read_u16::<B>()?;
        let gid = cursor.read_u16::<B>()?;
        let nlink = cursor.read_u16::<B>()?;
        let rdev = cursor.read_u16::<B>()?;
        // 32-bit values are stored as two words, most significant first,
        // regardless of the word byte order
        let mtime = read_split_u32::<B>(&mut cursor)?;
        let name_size = cursor.read_u16::<B>()?;
        let file_size = read_split_u32::<B>(&mut cursor)?;

        Ok(Self {
            format,
            dev_major: (dev >> 8) as u32,
            dev_minor: (dev & 0xff) as u32,
            ino: ino as u64,
            mode: mode as u32,
            uid: uid as u32,
            gid: gid as u32,
            nlink: nlink as u32,
            rdev_major: (rdev >> 8) as u32,
            rdev_minor: (rdev & 0xff) as u32,
            mtime: mtime as u64,
            name_size: name_size as u64,
            file_size: file_size as u64,
            checksum: 0,
        })
    }
}

/// Identity of one archive record, stable across independent scans of the
/// same bytes.
///
/// The ordinal disambiguates archives that repeat a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryId {
    pub ordinal: u64,
    pub name: String,
}

/// One entry as yielded by [`CpioReader`](super::CpioReader).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpioEntry {
    pub id: EntryId,
    pub format: Format,
    pub ino: u64,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub mtime: u64,
    pub size: u64,
    pub dev_major: u32,
    pub dev_minor: u32,
    pub rdev_major: u32,
    pub rdev_minor: u32,
    pub checksum: u32,
}

impl CpioEntry {
    pub fn from_header(header: RawHeader, ordinal: u64, name: String) -> Self {
        Self {
            id: EntryId { ordinal, name },
            format: header.format,
            ino: header.ino,
            mode: header.mode,
            uid: header.uid,
            gid: header.gid,
            nlink: header.nlink,
            mtime: header.mtime,
            size: header.file_size,
            dev_major: header.dev_major,
            dev_minor: header.dev_minor,
            rdev_major: header.rdev_major,
            rdev_minor: header.rdev_minor,
            checksum: header.checksum,
        }
    }

    /// Entry name exactly as stored in the archive.
    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn file_type(&self) -> FileType {
        FileType::from_mode(self.mode)
    }

    pub fn is_directory(&self) -> bool {
        self.file_type() == FileType::Directory
    }

    pub fn is_regular(&self) -> bool {
        self.file_type() == FileType::Regular
    }

    pub fn is_symlink(&self) -> bool {
        self.file_type() == FileType::Symlink
    }

    /// Permission bits without the file type.
    pub fn permissions(&self) -> u32 {
        self.mode & !S_IFMT
    }
}

fn read_split_u32<B: ByteOrder>(cursor: &mut Cursor<&[u8]>) -> io::Result<u32> {
    let high = cursor.read_u16::<B>()? as u32;
    let low = cursor.read_u16::<B>()? as u32;
    Ok((high << 16) | low)
}

fn hex_field(bytes: &[u8]) -> io::Result<u32> {
    let text = std::str::from_utf8(bytes).map_err(|_| invalid_data("non-ascii header field"))?;
    u32::from_str_radix(text, 16)
        .map_err(|_| invalid_data(format!("invalid hex header field {text:?}")))
}

fn octal_field(bytes: &[u8]) -> io::Result<u64> {
    let text = std::str::from_utf8(bytes).map_err(|_| invalid_data("non-ascii header field"))?;
    u64::from_str_radix(text, 8)
        .map_err(|_| invalid_data(format!("invalid octal header field {text:?}")))
}

pub(crate) fn invalid_data(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}
