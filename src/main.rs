//! Main entry point for the cpiofs CLI application.
//!
//! Stages the archive (downloading it first if it is remote), mounts it and
//! runs one command against the resulting directory tree.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use cpiofs::cli::Command;
use cpiofs::{Cli, CpioFileSystem, Node, NodeKind, stage};

/// Application entry point.
///
/// Staging is async (it may hit the network); everything after that is
/// blocking archive I/O and runs on the blocking pool.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .with_writer(io::stderr)
        .init();

    // reqwest and rustls share one process-wide TLS provider
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("TLS crypto provider already installed");
    }

    let (location, compression) = cli.location();
    let stager = stage::for_location(location)?;
    let work_dir = cli
        .staging_dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("cpiofs"));
    let staged = stager
        .stage(&work_dir)
        .await
        .with_context(|| format!("failed to stage {}", stager.source()))?;

    tokio::task::spawn_blocking(move || {
        let mut fs = CpioFileSystem::mount(staged, compression)?;
        let result = run(&mut fs, cli.command);
        fs.close_communication_link();
        result
    })
    .await?
}

/// Dispatch one command against a mounted archive.
fn run(fs: &mut CpioFileSystem, command: Command) -> Result<()> {
    match command {
        Command::Ls { path, long } => list(fs, &path, long),
        Command::Tree => tree(fs),
        Command::Cat { paths } => cat(fs, &paths),
        Command::Stat { path } => stat(fs, &path),
        Command::Extract { paths, extract_dir } => extract(fs, &paths, &extract_dir),
    }
}

fn list(fs: &CpioFileSystem, path: &str, long: bool) -> Result<()> {
    let node = fs
        .resolve(path)?
        .with_context(|| format!("{path}: no such file or directory"))?;
    if !node.is_directory() {
        println!("{}", describe(node, long));
        return Ok(());
    }

    for child in fs.list(path)?.unwrap_or_default() {
        println!("{}", describe(child, long));
    }
    Ok(())
}

fn tree(fs: &CpioFileSystem) -> Result<()> {
    for node in fs.index()?.walk() {
        if node.path().is_empty() {
            println!("/");
            continue;
        }
        let depth = node.path().matches('/').count();
        let suffix = if node.is_directory() { "/" } else { "" };
        println!("{}{}{}", "  ".repeat(depth), node.name(), suffix);
    }
    Ok(())
}

fn cat(fs: &mut CpioFileSystem, paths: &[String]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    for path in paths {
        let mut reader = fs.open_content(path)?;
        io::copy(&mut reader, &mut stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

fn stat(fs: &CpioFileSystem, path: &str) -> Result<()> {
    let node = fs
        .resolve(path)?
        .with_context(|| format!("{path}: no such file or directory"))?;

    println!("  Path: /{}", node.path());
    println!("  Type: {:?}", node.file_type());
    match node.kind() {
        NodeKind::Synthesized => println!("Origin: synthesized"),
        NodeKind::Real(entry) => {
            println!("Origin: entry #{} ({:?})", entry.id.ordinal, entry.format);
            println!("  Size: {}", entry.size);
            println!("  Mode: {:04o}", entry.permissions());
            println!("   Uid: {}  Gid: {}", entry.uid, entry.gid);
            println!(" Inode: {}  Links: {}", entry.ino, entry.nlink);
            println!(" Mtime: {}", entry.mtime);
        }
    }
    if node.is_directory() {
        println!("Children: {}", node.children().len());
    }
    Ok(())
}

/// Extract files below `extract_dir`.
///
/// Each file costs one rescan of the archive.
fn extract(fs: &mut CpioFileSystem, paths: &[String], extract_dir: &Path) -> Result<()> {
    let targets: Vec<(String, bool)> = {
        let index = fs.index()?;
        let mut targets = Vec::new();
        let roots = if paths.is_empty() { vec![String::new()] } else { paths.to_vec() };
        for root in &roots {
            let Some(node) = index.get(root) else {
                bail!("{root}: no such file or directory");
            };
            // Collect the subtree under each requested path
            let mut stack = vec![node];
            while let Some(node) = stack.pop() {
                targets.push((node.path().to_string(), node.is_directory()));
                stack.extend(index.children(node));
            }
        }
        targets
    };

    for (path, is_directory) in targets {
        if path.is_empty() {
            continue;
        }
        let output: PathBuf = extract_dir.join(&path);
        if is_directory {
            std::fs::create_dir_all(&output)?;
            continue;
        }
        if !fs.resolve(&path)?.is_some_and(Node::is_readable) {
            continue;
        }
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        println!("  extracting: {}", path);
        let mut reader = fs.open_content(&path)?;
        let mut file = std::fs::File::create(&output)
            .with_context(|| format!("cannot create {}", output.display()))?;
        io::copy(&mut reader, &mut file)?;
    }
    Ok(())
}

/// One listing line for a node.
fn describe(node: &Node, long: bool) -> String {
    if !long {
        return node.name().to_string();
    }

    let kind = node.file_type().as_char();
    let origin = if node.is_synthesized() { "synth" } else { "entry" };
    format!(
        "{}{:04o} {:>10} {:>5}  {}",
        kind,
        node.mode().unwrap_or(0o755) & 0o7777,
        node.size().unwrap_or(0),
        origin,
        node.name()
    )
}
