#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use cpiofs::Compression;

const S_IFDIR: u32 = 0o040000;
const S_IFREG: u32 = 0o100000;
const S_IFLNK: u32 = 0o120000;

/// Writes small newc archives for tests.
#[derive(Default)]
pub struct ArchiveBuilder {
    out: Vec<u8>,
    ino: u32,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(mut self, name: &str) -> Self {
        self.record(name, S_IFDIR | 0o755, b"");
        self
    }

    pub fn file(mut self, name: &str, data: &[u8]) -> Self {
        self.record(name, S_IFREG | 0o644, data);
        self
    }

    pub fn symlink(mut self, name: &str, target: &str) -> Self {
        self.record(name, S_IFLNK | 0o777, target.as_bytes());
        self
    }

    /// Finish with the trailer record.
    pub fn build(mut self) -> Vec<u8> {
        self.ino = 0;
        self.record("TRAILER!!!", 0, b"");
        self.out
    }

    /// Finish without a trailer, as if the writer stopped at an entry
    /// boundary.
    pub fn build_without_trailer(self) -> Vec<u8> {
        self.out
    }

    fn record(&mut self, name: &str, mode: u32, data: &[u8]) {
        self.ino += 1;
        let header = format!(
            "070701{:08X}{:08X}{:08X}{:08X}{:08X}{:08X}{:08X}{:08X}{:08X}{:08X}{:08X}{:08X}{:08X}",
            self.ino,
            mode,
            1000,
            1000,
            1,
            1_700_000_000u32,
            data.len(),
            8,
            1,
            0,
            0,
            name.len() + 1,
            0
        );
        self.out.extend_from_slice(header.as_bytes());
        self.out.extend_from_slice(name.as_bytes());
        self.out.push(0);
        self.pad();
        self.out.extend_from_slice(data);
        self.pad();
    }

    fn pad(&mut self) {
        while self.out.len() % 4 != 0 {
            self.out.push(0);
        }
    }
}

pub fn compress(bytes: &[u8], compression: Compression) -> Vec<u8> {
    match compression {
        Compression::None => bytes.to_vec(),
        Compression::Gzip => {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(bytes).unwrap();
            encoder.finish().unwrap()
        }
        Compression::Bzip2 => {
            let mut encoder =
                bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
            encoder.write_all(bytes).unwrap();
            encoder.finish().unwrap()
        }
    }
}

/// Write `bytes` compressed with `compression` into `dir`.
pub fn stage(dir: &Path, bytes: &[u8], compression: Compression) -> PathBuf {
    let path = dir.join(format!("archive.{}", compression.scheme()));
    std::fs::write(&path, compress(bytes, compression)).unwrap();
    path
}
