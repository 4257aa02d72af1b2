//! Security and safety checks for archive extraction.
//!
//! This module resolves archive entry names against the destination
//! directory and rejects anything that would land outside of it
//! (zip-slip), as well as enforcing the decompressed size limit.

use crate::error::{ExtractError, SecurityError};
use std::io;
use std::path::{Component, Path, PathBuf};

/// Returns the cleaned, absolute form of the destination directory.
///
/// Relative paths are resolved against the current working directory and
/// `.`/`..` components are folded lexically, so the result can be used as
/// a prefix for [`resolve_entry_path`].
pub fn destination_root(dest: &Path) -> io::Result<PathBuf> {
    let absolute = if dest.is_absolute() {
        dest.to_path_buf()
    } else {
        std::env::current_dir()?.join(dest)
    };

    let mut cleaned = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other),
        }
    }
    Ok(cleaned)
}

/// Resolves an (already decoded and root-stripped) entry name to its
/// destination path under `root`.
///
/// The name is split on `/` and folded lexically: `.` and empty segments
/// are dropped and `..` removes the previous segment. The resulting path
/// must lie strictly inside `root`; anything that climbs above it, or that
/// collapses to `root` itself, is a path traversal attempt.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use extractor::safety::resolve_entry_path;
///
/// let root = Path::new("/srv/projects/abc");
///
/// let safe = resolve_entry_path(root, "files/./page.html").unwrap();
/// assert_eq!(safe, Path::new("/srv/projects/abc/files/page.html"));
///
/// assert!(resolve_entry_path(root, "../../etc/evil").is_err());
/// assert!(resolve_entry_path(root, "/etc/passwd").is_err());
/// ```
pub fn resolve_entry_path(root: &Path, name: &str) -> Result<PathBuf, SecurityError> {
    if name.starts_with('/') || Path::new(name).is_absolute() {
        return Err(SecurityError::AbsolutePath(name.to_string()));
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in name.split(is_separator) {
        match segment {
            "" | "." => continue,
            ".." => {
                if segments.pop().is_none() {
                    return Err(SecurityError::PathTraversal(name.to_string()));
                }
            }
            part => segments.push(part),
        }
    }

    // Folding to the root itself is not "strictly inside" it.
    if segments.is_empty() {
        return Err(SecurityError::PathTraversal(name.to_string()));
    }

    let mut resolved = root.to_path_buf();
    resolved.extend(segments);
    Ok(resolved)
}

fn is_separator(c: char) -> bool {
    c == '/' || (cfg!(windows) && c == '\\')
}

/// Checks if the current extracted size exceeds the configured limit.
///
/// # Examples
///
/// ```
/// use extractor::safety::check_size_limits;
///
/// // Within limit
/// assert!(check_size_limits(1000, Some(2000)).is_ok());
///
/// // Exceeds limit
/// assert!(check_size_limits(3000, Some(2000)).is_err());
///
/// // No limit
/// assert!(check_size_limits(999_999_999, None).is_ok());
/// ```
pub fn check_size_limits(current_bytes: u64, limit: Option<u64>) -> Result<(), ExtractError> {
    if let Some(max_bytes) = limit {
        if current_bytes > max_bytes {
            return Err(ExtractError::SizeLimitExceeded {
                current: current_bytes,
                limit: max_bytes,
            });
        }
    }
    Ok(())
}
