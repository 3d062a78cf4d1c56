//! CPIO archive decoding.
//!
//! This module turns a byte stream into a sequence of archive entries. It
//! knows nothing about directories or paths beyond the raw entry names.
//!
//! ## Architecture
//!
//! - [`structures`]: header layouts, file types and entry records
//! - [`parser`]: the forward-only [`CpioReader`]
//!
//! ## Supported Formats
//!
//! - SVR4 portable ASCII (`070701`) and its checksummed variant (`070702`)
//! - POSIX.1 portable ASCII (`070707`, "odc")
//! - Old binary format in either byte order
//!
//! ## Limitations
//!
//! - No random access: reaching entry N means decoding entries 0..N
//! - Hard links are reported as independent entries

mod parser;
mod structures;

pub use parser::CpioReader;
pub use structures::*;
