//! Workspace descriptor (`kaltura-ws.json`) loading and persistence.
//!
//! The descriptor is decoded once: repository entries become
//! [`RepositoryEntry`] values and github URIs are parsed here, so a malformed
//! entry is reported before any repository is touched. The free-form
//! `commands` tree stays as JSON and is reached through dotted paths.

use regex::Regex;
use semver::Version;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, trace};

use crate::error::{Result, WorkspaceError};
use crate::paths;

/// File name searched upward from the start directory.
pub const DESCRIPTOR_FILE: &str = "kaltura-ws.json";

static GITHUB_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(https://github\.com/[A-Za-z0-9_.-]+/([A-Za-z0-9_.-]+?)\.git)(?:#([A-Za-z0-9_./][A-Za-z0-9_./-]*))?$",
    )
        .expect("github uri pattern is valid")
});

/// A declared repository, decoded from a string or an `{origin, ...}` object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryEntry {
    /// A directory relative to the workspace root.
    Fs { path: String },
    /// A GitHub repository cloned next to the descriptor when absent.
    Github(GithubUri),
}

/// Parsed `https://github.com/<owner>/<name>.git[#<ref>]` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubUri {
    /// Clone URL without the `#<ref>` fragment.
    pub url: String,
    /// Repository name; also the local directory name.
    pub name: String,
    pub reference: Option<String>,
}

impl GithubUri {
    /// Owner, name and ref are limited to characters git accepts, so the
    /// parts can be passed to a shell unquoted.
    pub fn parse(uri: &str) -> Result<Self> {
        let invalid = || WorkspaceError::InvalidRepositoryUri {
            uri: uri.to_string(),
        };
        let caps = GITHUB_URI.captures(uri.trim()).ok_or_else(invalid)?;
        if matches!(&caps[2], "." | "..") {
            return Err(invalid());
        }

        Ok(Self {
            url: caps[1].to_string(),
            name: caps[2].to_string(),
            reference: caps.get(3).map(|m| m.as_str().to_string()),
        })
    }
}

impl fmt::Display for GithubUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reference {
            Some(reference) => write!(f, "{}#{}", self.url, reference),
            None => f.write_str(&self.url),
        }
    }
}

impl RepositoryEntry {
    /// Decode one element of the `repositories` array.
    pub fn from_value(value: &Value) -> Result<Self> {
        let invalid = |reason: &str| WorkspaceError::InvalidRepositoryEntry {
            entry: value.to_string(),
            reason: reason.to_string(),
        };

        match value {
            Value::String(path) => Ok(Self::Fs { path: path.clone() }),
            Value::Object(obj) => match obj.get("origin").and_then(Value::as_str) {
                Some("fs") => {
                    let path = obj
                        .get("path")
                        .and_then(Value::as_str)
                        .ok_or_else(|| invalid("origin 'fs' requires a 'path' string"))?;
                    Ok(Self::Fs {
                        path: path.to_string(),
                    })
                }
                Some("github") => {
                    let uri = obj.get("uri").and_then(Value::as_str).ok_or_else(|| {
                        WorkspaceError::InvalidRepositoryUri {
                            uri: obj.get("uri").map(Value::to_string).unwrap_or_default(),
                        }
                    })?;
                    Ok(Self::Github(GithubUri::parse(uri)?))
                }
                Some(_) => Err(invalid("'origin' must be one of 'fs', 'github'")),
                None => Err(invalid("missing 'origin'")),
            },
            _ => Err(invalid("expected a path string or an object")),
        }
    }
}

/// `licenses` section, consumed by the license report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicensesConfig {
    pub ignore_list: Vec<String>,
}

/// The parsed workspace descriptor.
#[derive(Debug, Clone)]
pub struct WorkspaceDescriptor {
    pub path: PathBuf,
    pub version: Version,
    pub repositories: Vec<RepositoryEntry>,
    pub licenses: Option<LicensesConfig>,
    raw: Value,
}

impl WorkspaceDescriptor {
    /// Search `start` and its ancestors for the descriptor file.
    pub fn find(start: &Path) -> Result<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(DESCRIPTOR_FILE))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| WorkspaceError::ConfigNotFound {
                file: DESCRIPTOR_FILE,
                start: start.to_path_buf(),
            })
    }

    /// Locate and load the descriptor; returns it with its directory (the root path).
    ///
    /// A relative `start` is resolved against the process working directory,
    /// so the returned root is always absolute.
    pub fn discover(start: &Path) -> Result<(PathBuf, Self)> {
        let start = paths::absolute(start)?;
        let path = Self::find(&start)?;
        let descriptor = Self::load(&path)?;
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        debug!(root = %root.display(), "workspace root");
        Ok((root, descriptor))
    }

    /// Load a descriptor file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| WorkspaceError::io(path, e))?;
        let raw: Value = serde_json::from_str(&content).map_err(|e| WorkspaceError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        trace!(descriptor = %raw, "loaded workspace descriptor");
        Self::from_value(path, raw)
    }

    fn from_value(path: &Path, raw: Value) -> Result<Self> {
        let parse_error = |message: String| WorkspaceError::ConfigParse {
            path: path.to_path_buf(),
            message,
        };

        let obj = raw
            .as_object()
            .ok_or_else(|| parse_error("expected a JSON object".to_string()))?;

        let version_str = obj
            .get("version")
            .and_then(Value::as_str)
            .ok_or_else(|| parse_error("missing required 'version' string".to_string()))?;
        let version = Version::parse(version_str)
            .map_err(|e| parse_error(format!("invalid version '{version_str}': {e}")))?;

        let repositories = match obj.get("repositories") {
            None | Some(Value::Null) => vec![RepositoryEntry::Fs {
                path: ".".to_string(),
            }],
            Some(Value::Array(entries)) => entries
                .iter()
                .map(RepositoryEntry::from_value)
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(parse_error("'repositories' must be an array".to_string())),
        };

        let licenses = obj.get("licenses").and_then(Value::as_object).map(|l| {
            LicensesConfig {
                ignore_list: l
                    .get("ignoreList")
                    .and_then(Value::as_array)
                    .map(|names| {
                        names
                            .iter()
                            .filter_map(Value::as_str)
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default(),
            }
        });

        Ok(Self {
            path: path.to_path_buf(),
            version,
            repositories,
            licenses,
            raw,
        })
    }

    /// Look up `commands.<dotted_path>`; `None` if any level is missing.
    pub fn command_value(&self, dotted_path: &str) -> Option<&Value> {
        dotted_path
            .split('.')
            .try_fold(self.raw.get("commands")?, |node, key| node.get(key))
    }

    /// Dependency names excluded from license reports.
    pub fn license_ignore_list(&self) -> &[String] {
        self.licenses
            .as_ref()
            .map(|l| l.ignore_list.as_slice())
            .unwrap_or_default()
    }

    /// Deep-merge `partial` into the descriptor, persist it, and return the new snapshot.
    ///
    /// `self` is left untouched; callers switch to the returned value.
    pub fn update(&self, partial: &Value) -> Result<Self> {
        let mut raw = self.raw.clone();
        deep_merge(&mut raw, partial);

        let updated = Self::from_value(&self.path, raw)?;
        updated.save()?;
        debug!(path = %self.path.display(), "workspace descriptor updated");
        Ok(updated)
    }

    /// Save the descriptor back to disk.
    pub fn save(&self) -> Result<()> {
        let mut content = serde_json::to_string_pretty(&self.raw).map_err(|e| {
            WorkspaceError::ConfigParse {
                path: self.path.clone(),
                message: e.to_string(),
            }
        })?;
        content.push('\n');
        std::fs::write(&self.path, content).map_err(|e| WorkspaceError::io(&self.path, e))
    }

    /// The untouched JSON document.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Recursively merge objects; any other value in `patch` replaces the target.
pub fn deep_merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => merge_maps(target, patch),
        (target, patch) => *target = patch.clone(),
    }
}

fn merge_maps(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        match target.get_mut(key) {
            Some(existing) => deep_merge(existing, value),
            None => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
