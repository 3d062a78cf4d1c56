use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::compression::Compression;

#[derive(Parser, Debug)]
#[command(name = "cpiofs")]
#[command(version)]
#[command(about = "Browse CPIO archives as a read-only directory tree", long_about = None)]
#[command(after_help = "Examples:\n  \
  cpiofs initrd.cpio tree                      show every path in the archive\n  \
  cpiofs cpiogz:initrd.img ls -l etc           list etc/ in a gzip-compressed archive\n  \
  cpiofs -s cpiobz2 https://example.com/rootfs.cpio.bz2 cat init")]
pub struct Cli {
    /// Archive path or HTTP URL, optionally prefixed with a scheme
    /// (`cpio:`, `cpiogz:`, `cpiobz2:`)
    #[arg(value_name = "ARCHIVE")]
    pub archive: String,

    /// Compression scheme for an ARCHIVE given without a scheme prefix
    #[arg(short = 's', long, value_enum, default_value_t = Compression::None)]
    pub scheme: Compression,

    /// Directory that remote archives are downloaded into
    #[arg(long, value_name = "DIR")]
    pub staging_dir: Option<PathBuf>,

    /// Log more (-v => debug, -vv => trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List the children of a directory
    Ls {
        /// Directory inside the archive (default: root)
        #[arg(value_name = "PATH", default_value = "")]
        path: String,

        /// Long format: type, mode, size, origin
        #[arg(short = 'l')]
        long: bool,
    },

    /// Print every path in the archive, parents first
    Tree,

    /// Write file contents to stdout
    Cat {
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<String>,
    },

    /// Show metadata of one path
    Stat {
        #[arg(value_name = "PATH")]
        path: String,
    },

    /// Extract files into a directory
    Extract {
        /// Paths to extract (default: everything)
        #[arg(value_name = "PATH")]
        paths: Vec<String>,

        /// Extract files into exdir
        #[arg(short = 'd', value_name = "DIR", default_value = ".")]
        extract_dir: PathBuf,
    },
}

impl Cli {
    /// Split ARCHIVE into its location and the compression it is mounted
    /// with. An explicit scheme prefix overrides `--scheme`.
    pub fn location(&self) -> (&str, Compression) {
        if let Some((prefix, rest)) = self.archive.split_once(':') {
            if let Some(compression) = Compression::from_scheme(prefix) {
                return (rest, compression);
            }
        }
        (&self.archive, self.scheme)
    }

    pub fn is_http_url(&self) -> bool {
        let (location, _) = self.location();
        location.starts_with("http://") || location.starts_with("https://")
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "cpiofs=debug",
            _ => "cpiofs=trace",
        }
    }
}
