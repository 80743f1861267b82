//! Folder-path normalization for tree-shaped resources
//!
//! Folder paths are stored on tree items as plain strings and may arrive in
//! any shape (`"docs"`, `"//docs//sub/"`, `"docs\\sub"`, `""`). Everything in
//! this module is total: any string is accepted and coerced into a canonical
//! folder path that begins and ends with `/` and contains no empty segments.

use std::sync::OnceLock;

use regex::Regex;

/// The folder every tree is anchored at.
pub const ROOT_FOLDER: &str = "/";

fn repeated_slashes() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/+").expect("static pattern is valid"))
}

/// Canonicalize a folder path.
///
/// Backslashes are treated as separators. Then, in order: a leading `/` is
/// prepended when missing, a trailing `/` is appended when missing, and runs
/// of consecutive `/` are collapsed into one.
///
/// # Examples
///
/// ```
/// use strata::path::normalize_folder;
///
/// assert_eq!(normalize_folder("a//b"), "/a/b/");
/// assert_eq!(normalize_folder(""), "/");
/// assert_eq!(normalize_folder("/docs/"), "/docs/");
/// ```
pub fn normalize_folder(path: &str) -> String {
    let mut folder = path.replace('\\', "/");

    if !folder.starts_with('/') {
        folder.insert(0, '/');
    }

    if !folder.ends_with('/') {
        folder.push('/');
    }

    repeated_slashes().replace_all(&folder, "/").into_owned()
}

/// Check whether a folder path is already in canonical form
pub fn is_valid_folder(path: &str) -> bool {
    path.starts_with('/') && path.ends_with('/') && !path.contains("//") && !path.contains('\\')
}

/// Split a folder path into its non-empty segments
pub fn folder_segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\']).filter(|s| !s.is_empty()).collect()
}

/// Number of segments below the root (`/` is depth 0, `/a/b/` is depth 2)
pub fn folder_depth(path: &str) -> usize {
    folder_segments(path).len()
}

/// The normalized parent of a folder, or `None` for the root
pub fn parent_folder(path: &str) -> Option<String> {
    let segments = folder_segments(path);
    if segments.is_empty() {
        return None;
    }
    let parent = &segments[..segments.len() - 1];
    Some(normalize_folder(&parent.join("/")))
}
