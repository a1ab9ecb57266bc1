//! Test helpers shared by unit tests.

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use crate::descriptor::DESCRIPTOR_FILE;
use crate::error::{Result, WorkspaceError};
use crate::shell::CommandRunner;

/// Records commands instead of running them.
///
/// `git clone ... <name>` creates `<cwd>/<name>/package.json` so resolution
/// can continue; commands containing a configured fragment fail.
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: Mutex<Vec<(String, PathBuf)>>,
    fail_on: Option<String>,
    delay: Option<Duration>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(fragment: &str) -> Self {
        Self {
            fail_on: Some(fragment.to_string()),
            ..Self::default()
        }
    }

    /// Each command takes `delay` before it has any effect.
    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(command, _)| command.clone())
            .collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &str, cwd: &Path, _silent: bool) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((command.to_string(), cwd.to_path_buf()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(fragment) = &self.fail_on {
            if command.contains(fragment.as_str()) {
                return Err(WorkspaceError::ShellCommandFailed {
                    command: command.to_string(),
                    code: Some(128),
                    stderr: "fatal: simulated failure".to_string(),
                });
            }
        }

        if command.starts_with("git clone") {
            if let Some(name) = command.split_whitespace().last() {
                write_package(cwd, name, name);
            }
        }
        Ok(String::new())
    }
}

pub fn write_descriptor(root: &Path, content: &str) {
    fs::write(root.join(DESCRIPTOR_FILE), content).unwrap();
}

pub fn write_package(root: &Path, rel: &str, name: &str) -> PathBuf {
    let dir = root.join(rel);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("package.json"),
        format!(r#"{{ "name": "{name}", "version": "1.0.0", "scripts": {{ "build": "tsc" }} }}"#),
    )
    .unwrap();
    dir
}
