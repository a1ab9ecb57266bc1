//! Build manifest (`lerna.json`) synthesis.
//!
//! The manifest lives in the engine home directory, not in the user's
//! workspace, and is regenerated on every invocation.

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::error::{Result, WorkspaceError};
use crate::monorepo::NESTED_MANIFEST_FILE;
use crate::paths;
use crate::workspace::ResolvedRepository;

/// Generated manifest file name.
pub const MANIFEST_FILE: &str = NESTED_MANIFEST_FILE;

pub const NOTICE: &str =
    "This file is used internally by kaltura-ng-workspace. you should avoid using lerna cli directly";
pub const LERNA_VERSION: &str = "0.0.2";
pub const NPM_CLIENT: &str = "yarn";

/// The generated manifest. Field order is the serialized key order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildManifest {
    #[serde(rename = "NOTICE")]
    pub notice: String,
    pub lerna: String,
    /// Extension point for orchestrator options; empty by convention.
    pub commands: Map<String, Value>,
    #[serde(rename = "npmClient")]
    pub npm_client: String,
    /// Absolute, `/`-separated package directories.
    pub packages: Vec<String>,
}

impl BuildManifest {
    /// List every plain repository, and every nested package of each mono-repo.
    ///
    /// Mono-repo roots are never listed themselves.
    pub fn from_repositories(repositories: &[ResolvedRepository]) -> Self {
        let mut packages = Vec::new();

        for repo in repositories {
            if repo.is_mono_repo {
                for package in &repo.packages {
                    trace!("adding package '{}/{}' to lerna packages", repo.name, package.name);
                    packages.push(paths::to_slash(&package.path));
                }
            } else {
                trace!("adding repo '{}' to lerna packages", repo.name);
                packages.push(paths::to_slash(&repo.path));
            }
        }

        Self {
            notice: NOTICE.to_string(),
            lerna: LERNA_VERSION.to_string(),
            commands: Map::new(),
            npm_client: NPM_CLIENT.to_string(),
            packages,
        }
    }

    /// Pretty JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut content =
            serde_json::to_string_pretty(self).map_err(|e| WorkspaceError::ConfigParse {
                path: PathBuf::from(MANIFEST_FILE),
                message: e.to_string(),
            })?;
        content.push('\n');
        Ok(content)
    }

    /// Overwrite `<home_dir>/lerna.json`; returns the written path.
    pub fn write(&self, home_dir: &Path) -> Result<PathBuf> {
        let path = home_dir.join(MANIFEST_FILE);
        let content = self.to_json()?;

        std::fs::create_dir_all(home_dir).map_err(|e| WorkspaceError::io(home_dir, e))?;
        std::fs::write(&path, content).map_err(|e| WorkspaceError::io(&path, e))?;

        debug!(
            path = %path.display(),
            "wrote lerna.json with {} package(s); avoid using the lerna cli directly",
            self.packages.len()
        );
        Ok(path)
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
