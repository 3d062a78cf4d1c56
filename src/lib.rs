//! # cpiofs
//!
//! Browse and read CPIO archives as a read-only directory tree.
//!
//! CPIO is a purely sequential format: there is no central directory and no
//! way to seek to an entry. This crate scans the archive once to build a
//! complete path hierarchy, creating any directories the archive never
//! listed, and serves file content by rescanning from the start up to the
//! requested entry.
//!
//! ## Features
//!
//! - newc (`070701`), newc with checksum (`070702`), odc (`070707`) and old
//!   binary archives
//! - Plain, gzip (`cpiogz`) and bzip2 (`cpiobz2`) compressed archives
//! - Remote archives staged to a local file over HTTP(S)
//! - Entries may appear in any order; missing parent directories are
//!   synthesized
//!
//! ## Example
//!
//! ```no_run
//! use cpiofs::{Compression, CpioFileSystem};
//!
//! fn main() -> cpiofs::Result<()> {
//!     let mut fs = CpioFileSystem::mount("rootfs.cpio.bz2", Compression::Bzip2)?;
//!
//!     for node in fs.list("bin")?.unwrap_or_default() {
//!         println!("{} {:?}", node.name(), node.size());
//!     }
//!
//!     let init = fs.read_to_vec("init")?;
//!     println!("init is {} bytes", init.len());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod compression;
pub mod cpio;
pub mod error;
pub mod fs;
pub mod stage;

pub use cli::Cli;
pub use compression::Compression;
pub use cpio::{CpioEntry, CpioReader, EntryId, FileType};
pub use error::{Error, Result};
pub use fs::{CpioFileSystem, EntryReader, NamespaceIndex, Node, NodeKind, StreamCursor};
pub use stage::{HttpStager, LocalStager, Stager};
