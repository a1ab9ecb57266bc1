//! Mono-repo package discovery.
//!
//! A repository is a mono-repo when a `lerna.json` sits at its root. Its
//! `packages` globs are expanded in declared order; within one glob, matches
//! keep the glob crate's enumeration order (sorted per directory), which makes
//! the result reproducible on every platform.

use glob::{MatchOptions, Pattern};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};

use crate::error::{Result, WorkspaceError};
use crate::package::{PackageDescriptor, PACKAGE_FILE};
use crate::paths;

/// Nested manifest file marking a mono-repo.
pub const NESTED_MANIFEST_FILE: &str = "lerna.json";

const EXCLUDED_DIR: &str = "node_modules";

fn default_patterns() -> Vec<String> {
    vec!["packages/*".to_string()]
}

/// The parts of a nested `lerna.json` the engine reads.
#[derive(Debug, Clone, Deserialize)]
pub struct NestedManifest {
    #[serde(default = "default_patterns")]
    pub packages: Vec<String>,
}

impl NestedManifest {
    /// Load `lerna.json` from `repo_root`; `Ok(None)` when the repository is not a mono-repo.
    pub fn load(repo_root: &Path) -> Result<Option<Self>> {
        let path = repo_root.join(NESTED_MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).map_err(|e| WorkspaceError::io(&path, e))?;
        let manifest = serde_json::from_str(&content).map_err(|e| WorkspaceError::ConfigParse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(Some(manifest))
    }
}

/// One package nested inside a mono-repo.
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    /// Path relative to the owning repository root, `/`-separated.
    pub name: String,
    pub path: PathBuf,
    pub package: PackageDescriptor,
}

/// Expand the mono-repo globs of the repository at `repo_root`.
///
/// Returns `None` if the repository has no nested manifest.
pub fn discover_packages(repo_root: &Path) -> Result<Option<Vec<ResolvedPackage>>> {
    let Some(manifest) = NestedManifest::load(repo_root)? else {
        trace!(repo = %repo_root.display(), "no nested manifest, not a mono-repo");
        return Ok(None);
    };

    let mut packages = Vec::new();
    for pattern in &manifest.packages {
        let found = expand_pattern(repo_root, pattern)?;
        debug!(
            repo = %repo_root.display(),
            "pattern '{pattern}' matched {} package(s)",
            found.len()
        );
        packages.extend(found);
    }
    Ok(Some(packages))
}

fn expand_pattern(repo_root: &Path, pattern: &str) -> Result<Vec<ResolvedPackage>> {
    let invalid = |message: String| WorkspaceError::InvalidPattern {
        path: repo_root.join(NESTED_MANIFEST_FILE),
        pattern: pattern.to_string(),
        message,
    };

    let relative = pattern.trim_end_matches(['/', '\\']).replace('\\', "/");
    if Path::new(&relative).is_absolute()
        || Path::new(&relative)
            .components()
            .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(invalid("pattern must stay inside the repository".to_string()));
    }

    let root = paths::to_slash(repo_root);
    let full = format!(
        "{}/{}/{}",
        Pattern::escape(root.trim_end_matches('/')),
        relative,
        PACKAGE_FILE
    );
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut packages = Vec::new();
    for entry in glob::glob_with(&full, options).map_err(|e| invalid(e.to_string()))? {
        let descriptor_path = entry.map_err(|e| invalid(e.to_string()))?;
        let package_dir = match descriptor_path.parent() {
            Some(dir) => paths::normalize(dir),
            None => continue,
        };

        let Ok(relative_dir) = package_dir.strip_prefix(repo_root) else {
            continue;
        };
        if relative_dir.as_os_str().is_empty()
            || relative_dir.components().any(|c| c.as_os_str() == EXCLUDED_DIR)
        {
            continue;
        }

        let package = PackageDescriptor::load(&descriptor_path)?;
        packages.push(ResolvedPackage {
            name: paths::to_slash(relative_dir),
            path: package_dir,
            package,
        });
    }
    Ok(packages)
}

#[cfg(test)]
#[path = "monorepo_tests.rs"]
mod tests;
