//! Hierarchical namespace built from one pass over the archive.
//!
//! Archives list entries in whatever order their producer chose, and many
//! omit directory entries entirely. The index therefore creates missing
//! ancestors on demand as [`NodeKind::Synthesized`] nodes and upgrades them
//! in place when the matching directory entry turns up later.
//!
//! Nodes live in a map keyed by normalized path; children are stored as
//! names, so parents and children never own each other.

use std::collections::HashMap;
use std::io::Read;

use tracing::{debug, trace, warn};

use super::cursor::StreamCursor;
use super::path;
use crate::cpio::{CpioEntry, CpioReader, FileType};
use crate::error::{Error, Result};

/// What a node is backed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Backed by exactly one archive entry
    Real(CpioEntry),
    /// Directory inferred from a descendant's path
    Synthesized,
}

/// One element of the namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    path: String,
    kind: NodeKind,
    children: Vec<String>,
}

impl Node {
    fn new(path: String, kind: NodeKind) -> Self {
        Self {
            path,
            kind,
            children: Vec::new(),
        }
    }

    /// Normalized path; empty for the root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment; empty for the root.
    pub fn name(&self) -> &str {
        path::file_name(&self.path)
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Backing archive entry of a real node.
    pub fn entry(&self) -> Option<&CpioEntry> {
        match &self.kind {
            NodeKind::Real(entry) => Some(entry),
            NodeKind::Synthesized => None,
        }
    }

    pub fn is_synthesized(&self) -> bool {
        matches!(self.kind, NodeKind::Synthesized)
    }

    pub fn is_real(&self) -> bool {
        !self.is_synthesized()
    }

    pub fn file_type(&self) -> FileType {
        self.entry()
            .map_or(FileType::Directory, |entry| entry.file_type())
    }

    pub fn is_directory(&self) -> bool {
        self.file_type() == FileType::Directory
    }

    /// Whether content can be read from this node.
    pub fn is_readable(&self) -> bool {
        self.entry().is_some_and(|entry| !entry.is_directory())
    }

    /// Child names in the order they were attached.
    pub fn children(&self) -> &[String] {
        &self.children
    }

    /// Payload size; synthesized nodes have none.
    pub fn size(&self) -> Option<u64> {
        self.entry().map(|entry| entry.size)
    }

    /// Modification time in seconds since the epoch.
    pub fn mtime(&self) -> Option<u64> {
        self.entry().map(|entry| entry.mtime)
    }

    pub fn mode(&self) -> Option<u32> {
        self.entry().map(|entry| entry.mode)
    }
}

/// Path to node mapping for one mounted archive.
///
/// Built once by [`NamespaceIndex::build`] and never modified afterwards.
#[derive(Debug)]
pub struct NamespaceIndex {
    nodes: HashMap<String, Node>,
}

impl NamespaceIndex {
    /// Scan the whole archive behind `cursor` and build its namespace.
    ///
    /// The cursor is rewound first and closed when the scan ends, whether it
    /// succeeded or not.
    ///
    /// # Errors
    ///
    /// [`Error::ArchiveOpen`] if the archive cannot be opened, and
    /// [`Error::IndexBuild`] if reading fails part-way. No partial index is
    /// returned.
    pub fn build(cursor: &mut StreamCursor) -> Result<Self> {
        let mut index = Self::new();

        let scanned = match cursor.rewind()? {
            Some(decoder) => index.scan(decoder),
            None => Ok(()),
        };
        cursor.close();
        scanned.map_err(Error::IndexBuild)?;

        debug!(nodes = index.len(), "archive index built");
        Ok(index)
    }

    fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            path::ROOT.to_string(),
            Node::new(path::ROOT.to_string(), NodeKind::Synthesized),
        );
        Self { nodes }
    }

    fn scan<R: Read>(&mut self, decoder: &mut CpioReader<R>) -> std::io::Result<()> {
        while let Some(entry) = decoder.next_entry()? {
            self.insert_entry(entry);
        }
        Ok(())
    }

    fn insert_entry(&mut self, entry: CpioEntry) {
        let path = path::normalize(entry.name());
        trace!(entry = entry.name(), %path, "indexing entry");

        if let Some(node) = self.nodes.get_mut(&path) {
            if path.is_empty() && !entry.is_directory() {
                warn!(
                    entry = entry.name(),
                    "skipping non-directory entry naming the archive root"
                );
                return;
            }
            match &node.kind {
                NodeKind::Synthesized if entry.is_directory() => {
                    trace!(%path, "upgrading synthesized directory");
                }
                NodeKind::Synthesized => {
                    debug!(%path, "entry replaces synthesized directory");
                }
                NodeKind::Real(previous) => {
                    debug!(
                        %path,
                        previous = previous.id.ordinal,
                        current = entry.id.ordinal,
                        "duplicate entry, later one wins"
                    );
                }
            }
            node.kind = NodeKind::Real(entry);
            return;
        }

        self.ensure_ancestors(&path);
        self.nodes
            .insert(path.clone(), Node::new(path.clone(), NodeKind::Real(entry)));
        self.attach(&path);
    }

    /// Create every missing ancestor of `path`, outermost first.
    fn ensure_ancestors(&mut self, path: &str) {
        let mut missing = Vec::new();
        let mut current = path::parent(path);
        while let Some(ancestor) = current {
            if self.nodes.contains_key(ancestor) {
                break;
            }
            missing.push(ancestor);
            current = path::parent(ancestor);
        }

        for ancestor in missing.into_iter().rev() {
            trace!(path = ancestor, "synthesizing directory");
            self.nodes.insert(
                ancestor.to_string(),
                Node::new(ancestor.to_string(), NodeKind::Synthesized),
            );
            self.attach(ancestor);
        }
    }

    /// Register `path` with its parent. The parent must already exist.
    fn attach(&mut self, path: &str) {
        if let Some(parent) = path::parent(path).and_then(|p| self.nodes.get_mut(p)) {
            parent.children.push(path::file_name(path).to_string());
        }
    }

    /// Look up a node; `path` is normalized first.
    pub fn get(&self, path: &str) -> Option<&Node> {
        self.nodes.get(&path::normalize(path))
    }

    pub fn root(&self) -> &Node {
        &self.nodes[path::ROOT]
    }

    /// Child nodes of `node`, in attach order.
    pub fn children<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a Node> + 'a {
        node.children
            .iter()
            .filter_map(move |name| self.nodes.get(&path::join(&node.path, name)))
    }

    /// All nodes depth-first from the root, parents before children.
    pub fn walk(&self) -> Vec<&Node> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            out.push(node);
            let mut children: Vec<&Node> = self.children(node).collect();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root().children.is_empty()
    }
}
