mod common;

use std::io::Read;

use common::{ArchiveBuilder, stage};
use cpiofs::{Compression, CpioFileSystem, Error, FileType};

fn mount(bytes: &[u8], compression: Compression) -> (tempfile::TempDir, CpioFileSystem) {
    let dir = tempfile::tempdir().unwrap();
    let path = stage(dir.path(), bytes, compression);
    let fs = CpioFileSystem::mount(path, compression).unwrap();
    (dir, fs)
}

#[test]
fn directory_entry_after_children_is_upgraded_in_place() {
    let after = ArchiveBuilder::new()
        .file("a/b/c.txt", b"c")
        .dir("a/b/")
        .build();
    let before = ArchiveBuilder::new()
        .dir("a/b/")
        .file("a/b/c.txt", b"c")
        .build();

    for bytes in [after, before] {
        let (_dir, fs) = mount(&bytes, Compression::None);

        let b = fs.resolve("a/b").unwrap().unwrap();
        assert!(b.is_real());
        assert!(b.is_directory());
        assert_eq!(b.children(), ["c.txt"]);

        let a = fs.resolve("a").unwrap().unwrap();
        assert!(a.is_synthesized());
        assert_eq!(a.children(), ["b"]);
        assert_eq!(fs.index().unwrap().len(), 4);
    }
}

#[test]
fn missing_directories_are_synthesized() {
    let bytes = ArchiveBuilder::new().file("x/y/z.txt", b"zzz").build();
    let (_dir, fs) = mount(&bytes, Compression::None);

    let x = fs.resolve("x").unwrap().unwrap();
    let y = fs.resolve("/x/y/").unwrap().unwrap();
    assert!(x.is_synthesized() && x.is_directory());
    assert!(y.is_synthesized() && y.is_directory());
    assert_eq!(x.size(), None);

    let names: Vec<&str> = fs
        .list("x/y")
        .unwrap()
        .unwrap()
        .iter()
        .map(|node| node.name())
        .collect();
    assert_eq!(names, ["z.txt"]);
}

#[test]
fn every_entry_gets_exactly_one_node() {
    let bytes = ArchiveBuilder::new()
        .file("usr/bin/sh", b"#!")
        .file("usr/lib/libc.so", b"ELF")
        .dir("usr")
        .file("etc/hosts", b"127.0.0.1 localhost\n")
        .file("usr/bin/sh", b"#!/bin/sh")
        .build();
    let (_dir, fs) = mount(&bytes, Compression::None);

    // root, usr, usr/bin, usr/bin/sh, usr/lib, usr/lib/libc.so, etc, etc/hosts
    let index = fs.index().unwrap();
    assert_eq!(index.len(), 8);
    assert_eq!(index.walk().len(), 8);
    assert_eq!(fs.resolve("").unwrap().unwrap().children(), ["usr", "etc"]);
    assert_eq!(fs.resolve("usr/bin").unwrap().unwrap().children(), ["sh"]);
}

#[test]
fn resolving_twice_returns_the_same_node() {
    let bytes = ArchiveBuilder::new().file("a/b", b"1").build();
    let (_dir, fs) = mount(&bytes, Compression::None);

    let first = fs.resolve("a/b").unwrap().unwrap();
    let second = fs.resolve("./a//b").unwrap().unwrap();
    assert!(std::ptr::eq(first, second));
}

#[test]
fn init_after_success_does_not_rescan() {
    let bytes = ArchiveBuilder::new().file("f", b"data").build();
    let dir = tempfile::tempdir().unwrap();
    let path = stage(dir.path(), &bytes, Compression::None);
    let mut fs = CpioFileSystem::new(path, Compression::None);

    assert!(matches!(fs.resolve("f"), Err(Error::NotInitialized)));

    fs.init().unwrap();
    fs.init().unwrap();
    assert!(fs.is_ready());
    assert_eq!(fs.scans(), 1);
}

#[test]
fn content_matches_across_compressions_and_interleaved_reads() {
    let big: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
    let bytes = ArchiveBuilder::new()
        .dir("docs")
        .file("docs/readme.txt", b"hello, archive\n")
        .file("data/big.bin", &big)
        .file("empty", b"")
        .file("docs/odd", b"123")
        .build();

    for compression in [Compression::None, Compression::Gzip, Compression::Bzip2] {
        let (_dir, mut fs) = mount(&bytes, compression);

        assert_eq!(fs.read_to_vec("data/big.bin").unwrap(), big);
        assert_eq!(fs.read_to_vec("docs/readme.txt").unwrap(), b"hello, archive\n");
        assert_eq!(fs.read_to_vec("empty").unwrap(), b"");
        assert_eq!(fs.read_to_vec("docs/odd").unwrap(), b"123");
        assert_eq!(fs.read_to_vec("data/big.bin").unwrap(), big);

        // one scan for the index plus one per read
        assert_eq!(fs.scans(), 6);
    }
}

#[test]
fn abandoned_read_does_not_disturb_the_next_one() {
    let bytes = ArchiveBuilder::new()
        .file("first", b"abcdefghij")
        .file("second", b"0123456789")
        .build();
    let (_dir, mut fs) = mount(&bytes, Compression::Gzip);

    {
        let mut reader = fs.open_content("first").unwrap();
        let mut partial = [0u8; 3];
        reader.read_exact(&mut partial).unwrap();
        assert_eq!(&partial, b"abc");
        assert_eq!(reader.size(), 10);
    }

    let mut rest = String::new();
    fs.open_content("second")
        .unwrap()
        .read_to_string(&mut rest)
        .unwrap();
    assert_eq!(rest, "0123456789");
}

#[test]
fn symlink_content_is_its_target() {
    let bytes = ArchiveBuilder::new()
        .symlink("bin/sh", "busybox")
        .file("bin/busybox", b"\x7fELF")
        .build();
    let (_dir, mut fs) = mount(&bytes, Compression::None);

    let link = fs.resolve("bin/sh").unwrap().unwrap();
    assert_eq!(link.file_type(), FileType::Symlink);
    assert_eq!(fs.read_to_vec("bin/sh").unwrap(), b"busybox");
}

#[test]
fn later_duplicate_entry_wins() {
    let bytes = ArchiveBuilder::new()
        .file("etc/motd", b"old")
        .file("etc/motd", b"new")
        .build();
    let (_dir, mut fs) = mount(&bytes, Compression::None);

    assert_eq!(fs.resolve("etc").unwrap().unwrap().children(), ["motd"]);
    assert_eq!(fs.read_to_vec("etc/motd").unwrap(), b"new");
}

#[test]
fn directories_and_synthesized_nodes_are_not_readable() {
    let bytes = ArchiveBuilder::new()
        .dir("real")
        .file("virtual/file", b"x")
        .build();
    let (_dir, mut fs) = mount(&bytes, Compression::None);

    assert!(matches!(fs.open_content("real"), Err(Error::NotReadable(p)) if p == "real"));
    assert!(matches!(fs.open_content("virtual"), Err(Error::NotReadable(_))));
    assert!(matches!(fs.open_content(""), Err(Error::NotReadable(_))));
    assert!(matches!(fs.open_content("nope"), Err(Error::NotFound(_))));
    assert!(fs.resolve("nope").unwrap().is_none());
}

#[test]
fn missing_staged_file_is_an_empty_archive() {
    let dir = tempfile::tempdir().unwrap();
    let staged = dir.path().join("never-staged.cpio");
    let fs = CpioFileSystem::mount(staged, Compression::Gzip).unwrap();

    let root = fs.resolve("/").unwrap().unwrap();
    assert!(root.children().is_empty());
    assert!(fs.resolve("anything").unwrap().is_none());
    assert!(fs.index().unwrap().is_empty());
}

#[test]
fn trailer_only_and_zero_byte_archives_are_empty() {
    let trailer_only = ArchiveBuilder::new().build();
    for bytes in [trailer_only, Vec::new()] {
        let (_dir, fs) = mount(&bytes, Compression::None);
        assert!(fs.index().unwrap().is_empty());
        assert!(fs.resolve("").unwrap().is_some());
        assert!(fs.resolve("x").unwrap().is_none());
    }
}

#[test]
fn archive_without_trailer_is_still_indexed() {
    let bytes = ArchiveBuilder::new()
        .file("a", b"1")
        .file("b", b"2")
        .build_without_trailer();
    let (_dir, mut fs) = mount(&bytes, Compression::None);

    assert_eq!(fs.read_to_vec("b").unwrap(), b"2");
}

#[test]
fn compression_mismatch_fails_the_mount() {
    let bytes = ArchiveBuilder::new().file("a", b"1").build();
    let dir = tempfile::tempdir().unwrap();
    let path = stage(dir.path(), &bytes, Compression::None);

    for declared in [Compression::Gzip, Compression::Bzip2] {
        let mut fs = CpioFileSystem::new(&path, declared);
        assert!(matches!(fs.init(), Err(Error::ArchiveOpen { .. })));
        assert!(matches!(fs.resolve("a"), Err(Error::Unusable)));
        assert!(matches!(fs.init(), Err(Error::Unusable)));
    }
}

#[test]
fn corrupt_archive_fails_the_index_build() {
    let mut bytes = ArchiveBuilder::new()
        .file("a", b"1")
        .file("b", b"2")
        .build();
    bytes.truncate(150);
    let dir = tempfile::tempdir().unwrap();
    let path = stage(dir.path(), &bytes, Compression::None);
    let mut fs = CpioFileSystem::new(path, Compression::None);

    assert!(matches!(fs.init(), Err(Error::IndexBuild(_))));
    assert!(!fs.is_ready());
    assert!(matches!(fs.open_content("a"), Err(Error::Unusable)));
}

#[test]
fn entry_missing_on_rescan_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let original = ArchiveBuilder::new()
        .file("kept", b"same")
        .file("dropped", b"gone soon")
        .build();
    let path = stage(dir.path(), &original, Compression::None);
    let mut fs = CpioFileSystem::mount(&path, Compression::None).unwrap();

    let replaced = ArchiveBuilder::new()
        .file("kept", b"same")
        .file("other", b"new")
        .build();
    std::fs::write(&path, replaced).unwrap();

    assert!(matches!(fs.open_content("dropped"), Err(Error::EntryVanished(p)) if p == "dropped"));
    assert_eq!(fs.read_to_vec("kept").unwrap(), b"same");
}

#[test]
fn reads_work_after_the_link_is_closed() {
    let bytes = ArchiveBuilder::new().file("f", b"content").build();
    let (_dir, mut fs) = mount(&bytes, Compression::Bzip2);

    assert_eq!(fs.read_to_vec("f").unwrap(), b"content");
    fs.close_communication_link();
    fs.close_communication_link();
    assert_eq!(fs.read_to_vec("f").unwrap(), b"content");
}

#[test]
fn real_nodes_expose_entry_metadata() {
    let bytes = ArchiveBuilder::new().file("etc/passwd", b"root:x:0:0\n").build();
    let (_dir, fs) = mount(&bytes, Compression::None);

    let node = fs.resolve("etc/passwd").unwrap().unwrap();
    assert_eq!(node.size(), Some(11));
    assert_eq!(node.mtime(), Some(1_700_000_000));
    assert_eq!(node.mode(), Some(0o100644));
    let entry = node.entry().unwrap();
    assert_eq!(entry.uid, 1000);
    assert_eq!(entry.name(), "etc/passwd");
}
