//! Archive fixtures for the unit tests of this module.

use std::path::{Path, PathBuf};

/// Encode `files` as a newc archive of regular files, trailer included.
pub(crate) fn newc_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    for (ino, (name, data)) in files.iter().enumerate() {
        record(&mut out, ino + 1, name, 0o100644, data);
    }
    record(&mut out, 0, "TRAILER!!!", 0, b"");
    out
}

/// Write `bytes` to `name` inside `dir`.
pub(crate) fn stage(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn record(out: &mut Vec<u8>, ino: usize, name: &str, mode: u32, data: &[u8]) {
    let fields = [
        ino,
        mode as usize,
        0,
        0,
        1,
        0,
        data.len(),
        0,
        0,
        0,
        0,
        name.len() + 1,
        0,
    ];
    out.extend_from_slice(b"070701");
    for field in fields {
        out.extend_from_slice(format!("{field:08X}").as_bytes());
    }
    out.extend_from_slice(name.as_bytes());
    out.push(0);
    pad(out);
    out.extend_from_slice(data);
    pad(out);
}

fn pad(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}
