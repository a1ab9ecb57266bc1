//! Lexical path helpers shared by the resolver and the manifest writer.

use std::path::{Component, Path, PathBuf};

use crate::error::{Result, WorkspaceError};

/// Make `path` absolute against the process working directory, then normalize it.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|e| WorkspaceError::io(path, e))?;
    Ok(normalize(&absolute))
}

/// Resolve `.` and `..` components without touching the filesystem.
///
/// Symlinks are left alone so that paths written to the manifest match the
/// paths the user declared.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Render a path with `/` separators regardless of platform.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
