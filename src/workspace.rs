//! Workspace resolution: descriptor, version gate, repositories, manifest.

use semver::Version;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::descriptor::{GithubUri, RepositoryEntry, WorkspaceDescriptor};
use crate::error::{Result, WorkspaceError};
use crate::logging::LogLevel;
use crate::manifest::BuildManifest;
use crate::monorepo::{self, ResolvedPackage};
use crate::orchestrator::BuildOrchestrator;
use crate::package::PackageDescriptor;
use crate::paths;
use crate::shell::{CommandRunner, ShellRunner};
use crate::version;

/// A declared repository after it has been located (and cloned if needed).
#[derive(Debug, Clone)]
pub struct ResolvedRepository {
    /// Taken from the repository's own `package.json`.
    pub name: String,
    pub path: PathBuf,
    pub package: PackageDescriptor,
    pub is_mono_repo: bool,
    /// Empty unless `is_mono_repo`.
    pub packages: Vec<ResolvedPackage>,
}

/// Resolves declared repository entries against the filesystem.
pub struct RepositoryResolver {
    root: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl RepositoryResolver {
    pub fn new(root: impl AsRef<Path>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            root: paths::normalize(root.as_ref()),
            runner,
        }
    }

    /// Resolve every entry concurrently, then discover mono-repo packages in order.
    ///
    /// The result keeps declaration order. The first failing entry (in
    /// declaration order) aborts resolution and cancels the entries still
    /// in flight, so no clone outlives the error.
    pub async fn resolve_all(&self, entries: &[RepositoryEntry]) -> Result<Vec<ResolvedRepository>> {
        info!("extracting repositories list");

        let mut handles: Vec<JoinHandle<Result<(PathBuf, PackageDescriptor)>>> = Vec::new();
        for entry in entries {
            let root = self.root.clone();
            let runner = Arc::clone(&self.runner);
            let entry = entry.clone();
            handles.push(tokio::spawn(async move {
                Self::locate(&root, runner.as_ref(), &entry).await
            }));
        }

        let mut located = Vec::with_capacity(handles.len());
        let mut pending = handles.into_iter();
        while let Some(handle) = pending.next() {
            let result = handle
                .await
                .map_err(|e| WorkspaceError::Io {
                    path: self.root.clone(),
                    source: std::io::Error::other(e),
                })
                .and_then(|result| result);
            match result {
                Ok(entry) => located.push(entry),
                Err(e) => {
                    cancel_all(pending).await;
                    return Err(e);
                }
            }
        }

        let mut repositories = Vec::with_capacity(located.len());
        for (path, package) in located {
            let name = package.require_name()?.to_string();
            let packages = monorepo::discover_packages(&path)?;
            trace!(repo = %name, mono_repo = packages.is_some(), "resolved repository");

            repositories.push(ResolvedRepository {
                name,
                path,
                package,
                is_mono_repo: packages.is_some(),
                packages: packages.unwrap_or_default(),
            });
        }

        check_unique_names(&repositories)?;
        info!("extracted {} repositories", repositories.len());
        Ok(repositories)
    }

    /// Find (or clone) one repository and read its package descriptor.
    async fn locate(
        root: &Path,
        runner: &dyn CommandRunner,
        entry: &RepositoryEntry,
    ) -> Result<(PathBuf, PackageDescriptor)> {
        trace!(?entry, "resolving repository entry");

        let path = match entry {
            RepositoryEntry::Fs { path } => {
                let repo_path = paths::normalize(&root.join(path));
                if !repo_path.is_dir() {
                    return Err(WorkspaceError::RepositoryNotFound { path: repo_path });
                }
                repo_path
            }
            RepositoryEntry::Github(uri) => Self::ensure_cloned(root, runner, uri).await?,
        };

        let package = PackageDescriptor::load_dir(&path)?;
        Ok((path, package))
    }

    async fn ensure_cloned(
        root: &Path,
        runner: &dyn CommandRunner,
        uri: &GithubUri,
    ) -> Result<PathBuf> {
        let repo_path = root.join(&uri.name);

        if repo_path.exists() {
            info!("repository folder '{}' exists, skip creation of repository", uri.name);
            return Ok(repo_path);
        }

        info!("git clone repository '{}' from '{}'", uri.name, uri.url);
        let command = clone_command(uri);
        debug!("{command}");

        runner
            .run(&command, root, false)
            .await
            .map_err(|e| match e {
                WorkspaceError::ShellCommandFailed { stderr, .. } => WorkspaceError::CloneFailed {
                    uri: uri.to_string(),
                    path: repo_path.clone(),
                    stderr,
                },
                other => other,
            })?;

        if !repo_path.is_dir() {
            return Err(WorkspaceError::RepositoryNotFound { path: repo_path });
        }
        Ok(repo_path)
    }
}

/// Abort the remaining tasks and wait until each one is gone; dropping a
/// task's future kills any child process it spawned.
async fn cancel_all<T>(handles: impl Iterator<Item = JoinHandle<T>>) {
    for handle in handles {
        handle.abort();
        let _ = handle.await;
    }
}

/// `git clone [-b <ref>] <url> <name>`
pub fn clone_command(uri: &GithubUri) -> String {
    match &uri.reference {
        Some(reference) => format!("git clone -b {} {} {}", reference, uri.url, uri.name),
        None => format!("git clone {} {}", uri.url, uri.name),
    }
}

fn check_unique_names(repositories: &[ResolvedRepository]) -> Result<()> {
    let mut seen: HashMap<&str, &Path> = HashMap::new();
    for repo in repositories {
        if let Some(first) = seen.insert(&repo.name, &repo.path) {
            return Err(WorkspaceError::DuplicateRepositoryName {
                name: repo.name.clone(),
                first: first.to_path_buf(),
                second: repo.path.clone(),
            });
        }
    }
    Ok(())
}

/// Inputs for [`Workspace::open`]. Nothing is read from process-global state.
pub struct WorkspaceOptions {
    /// Where the upward descriptor search starts.
    pub start_dir: PathBuf,
    /// Engine installation root; the build manifest is written here.
    pub home_dir: PathBuf,
    pub engine_version: Version,
    pub log_level: LogLevel,
    pub runner: Arc<dyn CommandRunner>,
}

impl WorkspaceOptions {
    pub fn new(start_dir: impl Into<PathBuf>, home_dir: impl Into<PathBuf>) -> Self {
        Self {
            start_dir: start_dir.into(),
            home_dir: home_dir.into(),
            engine_version: version::engine_version(),
            log_level: LogLevel::default(),
            runner: Arc::new(ShellRunner::new()),
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_engine_version(mut self, version: Version) -> Self {
        self.engine_version = version;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }
}

/// A loaded workspace: descriptor, resolved repositories, and the written manifest.
///
/// Downstream commands receive a reference to this value.
pub struct Workspace {
    root_path: PathBuf,
    start_dir: PathBuf,
    home_dir: PathBuf,
    descriptor: WorkspaceDescriptor,
    repositories: Vec<ResolvedRepository>,
    manifest_path: PathBuf,
    log_level: LogLevel,
    runner: Arc<dyn CommandRunner>,
}

impl Workspace {
    /// Load the descriptor, gate on version, resolve repositories, write the manifest.
    pub async fn open(options: WorkspaceOptions) -> Result<Self> {
        let start_dir = paths::absolute(&options.start_dir)?;
        let (root_path, descriptor) = WorkspaceDescriptor::discover(&start_dir)?;
        let root_path = paths::normalize(&root_path);

        version::check_compatibility(&options.engine_version, &descriptor.version)?;

        let resolver = RepositoryResolver::new(&root_path, Arc::clone(&options.runner));
        let repositories = resolver.resolve_all(&descriptor.repositories).await?;

        let manifest = BuildManifest::from_repositories(&repositories);
        let manifest_path = manifest.write(&options.home_dir)?;

        Ok(Self {
            root_path,
            start_dir,
            home_dir: options.home_dir,
            descriptor,
            repositories,
            manifest_path,
            log_level: options.log_level,
            runner: options.runner,
        })
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn start_dir(&self) -> &Path {
        &self.start_dir
    }

    pub fn repositories(&self) -> &[ResolvedRepository] {
        &self.repositories
    }

    pub fn descriptor(&self) -> &WorkspaceDescriptor {
        &self.descriptor
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    /// Dotted-path lookup into the descriptor's `commands` tree.
    pub fn config_value(&self, dotted_path: &str) -> Option<&Value> {
        self.descriptor.command_value(dotted_path)
    }

    /// Deep-merge `partial` into the descriptor, persist it, and switch to the new snapshot.
    pub fn update_config(&mut self, partial: &Value) -> Result<&WorkspaceDescriptor> {
        self.descriptor = self.descriptor.update(partial)?;
        Ok(&self.descriptor)
    }

    /// Run a shell command from the directory the workspace was opened in.
    pub async fn run_shell_command(&self, command: &str, silent: bool) -> Result<String> {
        self.runner.run(command, &self.start_dir, silent).await
    }

    /// Run the build orchestrator against the synthesized manifest.
    pub async fn run_orchestrator_command(&self, args: &str) -> Result<String> {
        BuildOrchestrator::new(&self.home_dir, self.log_level)
            .run(self.runner.as_ref(), args)
            .await
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
