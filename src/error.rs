//! Error types for workspace resolution and manifest synthesis.
//!
//! Every variant is fatal to the current invocation. The binary prints the
//! message as a single line and exits non-zero; nothing is retried.

use semver::Version;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading, resolving, and synthesizing a workspace.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// No workspace descriptor between the start directory and the filesystem root.
    #[error("file '{file}' is missing in '{}' and all of its parent directories", .start.display())]
    ConfigNotFound { file: &'static str, start: PathBuf },

    /// The descriptor (or a nested mono-repo manifest) is not valid.
    #[error("failed to parse '{}': {message}", .path.display())]
    ConfigParse { path: PathBuf, message: String },

    /// A `repositories` element has an unsupported shape or origin.
    #[error("repository list contains invalid value {entry}: {reason}")]
    InvalidRepositoryEntry { entry: String, reason: String },

    #[error(
        "version mismatch: the current engine version is {engine}, but the version in the \
         workspace descriptor is {declared}. Either update the descriptor's 'version' to a \
         release compatible with {engine}, or install an engine release matching ^{declared}"
    )]
    VersionIncompatible { engine: Version, declared: Version },

    #[error(
        "repository with origin 'github' must have a valid 'uri' \
         (https://github.com/<owner>/<name>.git[#<ref>]), got '{uri}'"
    )]
    InvalidRepositoryUri { uri: String },

    #[error("repository path '{}' does not exist", .path.display())]
    RepositoryNotFound { path: PathBuf },

    #[error("failed to read package descriptor '{}': {message}", .path.display())]
    PackageDescriptor { path: PathBuf, message: String },

    /// Two repositories declare the same package name.
    #[error(
        "repositories '{}' and '{}' share the package name '{name}'",
        .first.display(),
        .second.display()
    )]
    DuplicateRepositoryName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("invalid package pattern '{pattern}' in '{}': {message}", .path.display())]
    InvalidPattern {
        path: PathBuf,
        pattern: String,
        message: String,
    },

    #[error("git clone of '{uri}' into '{}' failed: {stderr}", .path.display())]
    CloneFailed {
        uri: String,
        path: PathBuf,
        stderr: String,
    },

    #[error(
        "command '{command}' failed ({}): {stderr}",
        .code.map(|c| format!("exit code {c}")).unwrap_or_else(|| "terminated by signal".to_string())
    )]
    ShellCommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to find a 'lerna' installation above '{}'", .searched_from.display())]
    OrchestratorNotFound { searched_from: PathBuf },

    #[error("couldn't find bookmark named '{name}'")]
    BookmarkNotFound { name: String },

    #[error("git error in '{}': {source}", .path.display())]
    Git {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WorkspaceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used across the library.
pub type Result<T, E = WorkspaceError> = std::result::Result<T, E>;
