//! Archive path normalization.
//!
//! Paths inside the namespace are `/`-separated and relative to the archive
//! root, which is the empty string.

/// Path of the namespace root.
pub const ROOT: &str = "";

/// Normalize an entry name or lookup path.
///
/// Leading `/` and `./` are dropped, repeated separators collapse, `.`
/// segments vanish and `..` removes the preceding segment without ever
/// climbing above the root. A trailing `/` is dropped.
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name),
        }
    }
    segments.join("/")
}

/// Parent of a normalized path, or `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    Some(path.rsplit_once('/').map_or(ROOT, |(parent, _)| parent))
}

/// Last segment of a normalized path; empty for the root.
pub fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

/// Join a child name onto a normalized parent path.
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}
