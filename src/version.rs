//! Engine/descriptor version compatibility.

use semver::{Version, VersionReq};
use tracing::debug;

use crate::error::{Result, WorkspaceError};

/// Version of the running engine.
pub fn engine_version() -> Version {
    Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or_else(|_| Version::new(0, 0, 0))
}

/// Check that the engine satisfies `^declared`.
///
/// The descriptor pins the minimum engine release within one major line;
/// an engine from another major line may write a manifest the downstream
/// tool cannot read, so the caller must stop before resolving anything.
pub fn check_compatibility(engine: &Version, declared: &Version) -> Result<()> {
    debug!("matching engine version {engine} with descriptor version {declared}");

    if caret(declared).matches(engine) {
        Ok(())
    } else {
        Err(WorkspaceError::VersionIncompatible {
            engine: engine.clone(),
            declared: declared.clone(),
        })
    }
}

fn caret(version: &Version) -> VersionReq {
    VersionReq {
        comparators: vec![semver::Comparator {
            op: semver::Op::Caret,
            major: version.major,
            minor: Some(version.minor),
            patch: Some(version.patch),
            pre: version.pre.clone(),
        }],
    }
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
