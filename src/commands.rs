//! Commands built on top of a resolved [`Workspace`].
//!
//! Each command receives an already opened workspace, so the descriptor has
//! been validated and the manifest regenerated before any of this runs.

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::WorkspaceError;
use crate::git;
use crate::workspace::Workspace;

/// Summary printed by `sync`.
#[derive(Debug)]
pub struct SyncReport {
    pub root_path: PathBuf,
    pub manifest_path: PathBuf,
    pub repositories: Vec<(String, Vec<String>)>,
}

impl SyncReport {
    pub fn from_workspace(workspace: &Workspace) -> Self {
        Self {
            root_path: workspace.root_path().to_path_buf(),
            manifest_path: workspace.manifest_path().to_path_buf(),
            repositories: workspace
                .repositories()
                .iter()
                .map(|r| (r.name.clone(), r.packages.iter().map(|p| p.name.clone()).collect()))
                .collect(),
        }
    }

    pub fn package_count(&self) -> usize {
        self.repositories
            .iter()
            .map(|(_, packages)| packages.len().max(1))
            .sum()
    }

    pub fn print(&self) {
        println!(
            "{} {}",
            "Workspace:".cyan(),
            self.root_path.display().to_string().bright_white()
        );
        for (name, packages) in &self.repositories {
            if packages.is_empty() {
                println!("  {} {}", "•".green(), name);
            } else {
                println!(
                    "  {} {} {}",
                    "•".green(),
                    name,
                    format!("(mono-repo, {} packages)", packages.len()).dimmed()
                );
                for package in packages {
                    println!("      {}", package.dimmed());
                }
            }
        }
        println!(
            "\n{} {} packages written to {}",
            "✓".green().bold(),
            self.package_count(),
            self.manifest_path.display().to_string().dimmed()
        );
    }
}

/// Regenerate the manifest (already done by opening) and report what it contains.
pub fn sync(workspace: &Workspace) -> SyncReport {
    SyncReport::from_workspace(workspace)
}

/// Options for [`setup`].
#[derive(Debug, Clone, Copy)]
pub struct SetupOptions {
    pub clean: bool,
    pub build: bool,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            clean: false,
            build: true,
        }
    }
}

/// Bootstrap every package, optionally cleaning first and building after.
pub async fn setup(workspace: &Workspace, options: SetupOptions) -> Result<()> {
    if options.clean {
        info!("delete packages 'node_modules' folder");
        workspace
            .run_orchestrator_command("clean --yes")
            .await
            .context("Failed to clean packages")?;
    }

    info!("bootstrap repositories dependencies");
    workspace
        .run_orchestrator_command("bootstrap --nohoist")
        .await
        .context("Failed to bootstrap packages")?;

    if options.build {
        workspace
            .run_orchestrator_command("run build")
            .await
            .context("Failed to build packages")?;
    }
    Ok(())
}

/// Remove `node_modules` from all packages and from every mono-repo root.
pub async fn clean(workspace: &Workspace) -> Result<Vec<PathBuf>> {
    workspace
        .run_orchestrator_command("clean --yes")
        .await
        .context("Failed to clean packages")?;

    let mut removed = Vec::new();
    for repo in workspace.repositories().iter().filter(|r| r.is_mono_repo) {
        let modules = repo.path.join("node_modules");
        if modules.exists() {
            info!("removing {}", modules.display());
            tokio::fs::remove_dir_all(&modules)
                .await
                .with_context(|| format!("Failed to remove {}", modules.display()))?;
            removed.push(modules);
        }
    }
    Ok(removed)
}

/// Install mono-repo root dependencies, then link all packages.
pub async fn npm_link(workspace: &Workspace) -> Result<()> {
    info!("setup your workspace (this action might take several minutes)");
    for repo in workspace.repositories().iter().filter(|r| r.is_mono_repo) {
        info!("install dependencies in '{}' mono repository root folder", repo.name);
        workspace
            .runner()
            .run("npm install", &repo.path, false)
            .await
            .with_context(|| format!("Failed to install dependencies in {}", repo.path.display()))?;
    }

    info!("bootstrap repositories dependencies (this action might take several minutes)");
    workspace
        .run_orchestrator_command("bootstrap --nohoist")
        .await
        .context("Failed to bootstrap packages")?;
    Ok(())
}

/// Run an npm script in each package that declares it.
pub async fn run_script(workspace: &Workspace, script: &str, args: &[String]) -> Result<()> {
    if script.trim().is_empty() {
        anyhow::bail!("You must specify which npm script to run.");
    }

    let declared = workspace
        .repositories()
        .iter()
        .flat_map(|r| {
            if r.is_mono_repo {
                r.packages.iter().map(|p| &p.package).collect::<Vec<_>>()
            } else {
                vec![&r.package]
            }
        })
        .filter(|p| p.has_script(script))
        .count();
    if declared == 0 {
        warn!("no package declares the script '{script}'");
    }

    let mut lerna_args = vec!["run".to_string(), script.to_string()];
    lerna_args.extend(args.iter().cloned());
    workspace
        .run_orchestrator_command(&lerna_args.join(" "))
        .await
        .with_context(|| format!("Failed to run script '{script}'"))?;
    Ok(())
}

/// Outcome of [`bookmark`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookmarkOutcome {
    Updated { name: String, commit: String },
    CheckedOut { name: String, commit: String },
    /// Uncommitted changes prevented the checkout.
    Skipped { name: String, dirty_files: usize },
}

impl BookmarkOutcome {
    pub fn print(&self) {
        match self {
            Self::Updated { name, commit } => println!(
                "{} bookmark {} now points to {}",
                "✓".green().bold(),
                name.bright_white(),
                commit.dimmed()
            ),
            Self::CheckedOut { name, commit } => println!(
                "{} checked out bookmark {} ({})",
                "✓".green().bold(),
                name.bright_white(),
                commit.dimmed()
            ),
            Self::Skipped { name, dirty_files } => println!(
                "{} bookmark {} not checked out: {} uncommitted change(s)",
                "⚠".yellow().bold(),
                name.bright_white(),
                dirty_files
            ),
        }
    }
}

/// Record (`update`) or check out a named commit stored under `commands.bookmark`.
pub async fn bookmark(workspace: &mut Workspace, name: &str, update: bool) -> Result<BookmarkOutcome> {
    if update {
        let state = git::inspect(workspace.start_dir())?;
        info!("updating bookmark {name} to the latest commit in local repo");
        workspace
            .update_config(&json!({ "commands": { "bookmark": { name: state.head_commit } } }))
            .context("Failed to record bookmark")?;
        return Ok(BookmarkOutcome::Updated {
            name: name.to_string(),
            commit: state.head_commit,
        });
    }

    info!("git checkout to stored commit of bookmark named {name}");
    let commit = workspace
        .config_value(&format!("bookmark.{name}"))
        .and_then(|v| v.as_str())
        .filter(|c| !c.is_empty())
        .map(String::from)
        .ok_or_else(|| WorkspaceError::BookmarkNotFound {
            name: name.to_string(),
        })?;

    let state = git::inspect(workspace.start_dir())?;
    if state.is_dirty() {
        warn!(
            "it seems that you have uncommitted changes. to perform this command you should \
             either commit your changes or reset them. aborting command"
        );
        return Ok(BookmarkOutcome::Skipped {
            name: name.to_string(),
            dirty_files: state.dirty_files.len(),
        });
    }

    workspace
        .run_shell_command(&format!("git checkout {commit}"), false)
        .await
        .with_context(|| format!("Failed to checkout {commit}"))?;
    Ok(BookmarkOutcome::CheckedOut {
        name: name.to_string(),
        commit,
    })
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
