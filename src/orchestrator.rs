//! Invocation of the external build orchestrator (lerna).

use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::error::{Result, WorkspaceError};
use crate::logging::LogLevel;
use crate::shell::CommandRunner;

/// Location of the lerna entry point inside a `node_modules` tree.
const LERNA_BIN: [&str; 4] = ["node_modules", "lerna", "bin", "lerna"];

/// Runs lerna from the engine home, where the generated manifest lives.
#[derive(Debug, Clone)]
pub struct BuildOrchestrator {
    home_dir: PathBuf,
    log_level: LogLevel,
}

impl BuildOrchestrator {
    pub fn new(home_dir: impl AsRef<Path>, log_level: LogLevel) -> Self {
        Self {
            home_dir: home_dir.as_ref().to_path_buf(),
            log_level,
        }
    }

    /// Find the nearest `node_modules/lerna/bin/lerna` at or above the home directory.
    pub fn locate(&self) -> Result<PathBuf> {
        self.home_dir
            .ancestors()
            .map(|dir| LERNA_BIN.iter().fold(dir.to_path_buf(), |p, part| p.join(part)))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| WorkspaceError::OrchestratorNotFound {
                searched_from: self.home_dir.clone(),
            })
    }

    /// Full command line for `args`.
    pub fn command_line(&self, lerna: &Path, args: &str) -> String {
        format!(
            "node \"{}\" {} --loglevel={}",
            lerna.display(),
            args.trim(),
            self.log_level
        )
    }

    /// Run `lerna <args>` with output streamed to the terminal.
    pub async fn run(&self, runner: &dyn CommandRunner, args: &str) -> Result<String> {
        let lerna = self.locate()?;
        trace!(lerna = %lerna.display(), "lerna script path");

        let command = self.command_line(&lerna, args);
        debug!("running lerna with arguments '{}'", args.trim());
        runner.run(&command, &self.home_dir, false).await
    }
}
