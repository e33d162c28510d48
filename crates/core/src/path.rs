//! Path normalization
//!
//! Device paths are `/`-separated with a single leading slash. The store
//! itself knows nothing about paths, so every path the engine hands out is
//! built with these helpers.

/// Path separator used on the device
pub const SEPARATOR: char = '/';

/// Root path
pub const ROOT: &str = "/";

/// Canonicalize a path string
///
/// Backslashes become forward slashes, empty segments are dropped, the result
/// has exactly one leading slash and no trailing slash (except for root).
pub fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
    {
        out.push(SEPARATOR);
        out.push_str(segment);
    }

    if out.is_empty() {
        out.push(SEPARATOR);
    }
    out
}

/// Join a parent path and a child name with a single separator
pub fn join(parent: &str, name: &str) -> String {
    normalize(&format!("{parent}{SEPARATOR}{name}"))
}

/// Whether the path denotes the storage root
pub fn is_root(path: &str) -> bool {
    normalize(path) == ROOT
}

/// Non-empty segments of a path, in order
pub fn segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Normalized path of the containing directory
///
/// The root is its own parent.
pub fn parent(path: &str) -> String {
    let normalized = normalize(path);
    match normalized.rfind(SEPARATOR) {
        Some(0) | None => ROOT.to_string(),
        Some(pos) => normalized[..pos].to_string(),
    }
}

/// Last segment of a path, empty for root
pub fn file_name(path: &str) -> &str {
    segments(path).last().copied().unwrap_or_default()
}

/// Extension of a file name: text after the last `.`, empty for directories
pub fn extension(name: &str, is_dir: bool) -> String {
    if is_dir {
        return String::new();
    }
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_string())
        .unwrap_or_default()
}
