//! Local git queries used by the bookmark command.

use git2::{Repository, StatusOptions};
use std::path::Path;

use crate::error::{Result, WorkspaceError};

/// Snapshot of the repository containing a directory.
#[derive(Debug, Clone)]
pub struct GitState {
    pub head_commit: String,
    pub dirty_files: Vec<String>,
}

impl GitState {
    pub fn is_dirty(&self) -> bool {
        !self.dirty_files.is_empty()
    }
}

/// Inspect the git repository enclosing `dir`.
pub fn inspect(dir: &Path) -> Result<GitState> {
    let git_err = |source| WorkspaceError::Git {
        path: dir.to_path_buf(),
        source,
    };

    let repo = Repository::discover(dir).map_err(git_err)?;
    let head = repo
        .head()
        .and_then(|h| h.peel_to_commit())
        .map_err(git_err)?;

    let mut options = StatusOptions::new();
    options.include_untracked(true).include_ignored(false);
    let statuses = repo.statuses(Some(&mut options)).map_err(git_err)?;
    let dirty_files = statuses
        .iter()
        .filter_map(|s| s.path().map(String::from))
        .collect();

    Ok(GitState {
        head_commit: head.id().to_string(),
        dirty_files,
    })
}
