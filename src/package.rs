//! `package.json` parsing utilities.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::{Result, WorkspaceError};

/// File name of the per-repository / per-package descriptor.
pub const PACKAGE_FILE: &str = "package.json";

/// Represents a `package.json` file, read without normalization.
#[derive(Debug, Clone)]
pub struct PackageDescriptor {
    pub path: PathBuf,
    pub name: Option<String>,
    pub version: Option<String>,
    pub dependencies: Vec<Dependency>,
    pub scripts: Vec<String>,
    raw: Value,
}

/// Represents a dependency in `package.json`.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub name: String,
    pub requirement: String,
    pub dep_type: DependencyType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyType {
    Normal,
    Dev,
}

impl PackageDescriptor {
    /// Load the `package.json` inside `dir`.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::load(dir.as_ref().join(PACKAGE_FILE))
    }

    /// Load a `package.json` file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| WorkspaceError::PackageDescriptor {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        let raw: Value =
            serde_json::from_str(&content).map_err(|e| WorkspaceError::PackageDescriptor {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if !raw.is_object() {
            return Err(WorkspaceError::PackageDescriptor {
                path: path.to_path_buf(),
                message: "expected a JSON object".to_string(),
            });
        }

        let name = raw.get("name").and_then(Value::as_str).map(String::from);
        let version = raw.get("version").and_then(Value::as_str).map(String::from);

        let mut dependencies = Vec::new();
        if let Some(deps) = raw.get("dependencies").and_then(Value::as_object) {
            Self::collect_dependencies(deps, DependencyType::Normal, &mut dependencies);
        }
        if let Some(deps) = raw.get("devDependencies").and_then(Value::as_object) {
            Self::collect_dependencies(deps, DependencyType::Dev, &mut dependencies);
        }

        let scripts = raw
            .get("scripts")
            .and_then(Value::as_object)
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            name,
            version,
            dependencies,
            scripts,
            raw,
        })
    }

    fn collect_dependencies(
        deps: &Map<String, Value>,
        dep_type: DependencyType,
        out: &mut Vec<Dependency>,
    ) {
        for (name, requirement) in deps {
            out.push(Dependency {
                name: name.clone(),
                // Non-string requirements are kept verbatim as JSON text.
                requirement: requirement
                    .as_str()
                    .map(String::from)
                    .unwrap_or_else(|| requirement.to_string()),
                dep_type,
            });
        }
    }

    /// Return the package name or fail naming the descriptor path.
    pub fn require_name(&self) -> Result<&str> {
        self.name
            .as_deref()
            .ok_or_else(|| WorkspaceError::PackageDescriptor {
                path: self.path.clone(),
                message: "missing 'name' field".to_string(),
            })
    }

    /// Whether the package declares the given npm script.
    pub fn has_script(&self, script: &str) -> bool {
        self.scripts.iter().any(|s| s == script)
    }

    /// Dependencies of a single kind.
    pub fn dependencies_of(&self, dep_type: DependencyType) -> Vec<&Dependency> {
        self.dependencies
            .iter()
            .filter(|d| d.dep_type == dep_type)
            .collect()
    }

    /// The untouched JSON document.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

#[cfg(test)]
#[path = "package_tests.rs"]
mod tests;
