//! Multi-repository workspace management.
//!
//! Resolves the repositories declared in `kaltura-ws.json` into local
//! checkouts, discovers the packages of nested mono-repos, and writes the
//! `lerna.json` manifest the build orchestrator runs against.

pub mod commands;
pub mod descriptor;
pub mod error;
pub mod git;
pub mod logging;
pub mod manifest;
pub mod monorepo;
pub mod orchestrator;
pub mod package;
pub mod paths;
pub mod shell;
pub mod version;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use descriptor::{GithubUri, RepositoryEntry, WorkspaceDescriptor, DESCRIPTOR_FILE};
pub use error::{Result, WorkspaceError};
pub use logging::LogLevel;
pub use manifest::{BuildManifest, MANIFEST_FILE};
pub use monorepo::ResolvedPackage;
pub use package::PackageDescriptor;
pub use shell::{CommandRunner, ShellRunner};
pub use workspace::{ResolvedRepository, Workspace, WorkspaceOptions};
