//! External command execution.
//!
//! Every subprocess the engine starts (git clones, npm, the build
//! orchestrator, bookmark checkouts) goes through a [`CommandRunner`], which
//! lets tests observe the commands without running them.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::{Result, WorkspaceError};

/// Runs one shell command line to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` in `cwd`.
    ///
    /// Resolves with captured stdout on exit code 0 and fails with
    /// [`WorkspaceError::ShellCommandFailed`] carrying stderr otherwise.
    /// When `silent` is false the output is also streamed to the terminal.
    async fn run(&self, command: &str, cwd: &Path, silent: bool) -> Result<String>;
}

/// [`CommandRunner`] backed by the platform shell.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }

    fn shell_command(command: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        }
    }
}

fn echo_stdout(line: &str) {
    println!("{line}");
}

fn echo_stderr(line: &str) {
    eprintln!("{line}");
}

/// Read a child stream line by line, optionally echoing each line.
async fn collect<R>(stream: Option<R>, echo: Option<fn(&str)>) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut captured = String::new();
    let Some(stream) = stream else {
        return Ok(captured);
    };

    let mut lines = BufReader::new(stream).lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(echo) = echo {
            echo(&line);
        }
        captured.push_str(&line);
        captured.push('\n');
    }
    Ok(captured)
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, cwd: &Path, silent: bool) -> Result<String> {
        debug!(cwd = %cwd.display(), "running '{command}'");

        let mut child = Self::shell_command(command)
            .current_dir(cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| WorkspaceError::io(cwd, e))?;

        let (echo_out, echo_err) = if silent {
            (None, None)
        } else {
            (Some(echo_stdout as fn(&str)), Some(echo_stderr as fn(&str)))
        };

        let (stdout, stderr) = tokio::try_join!(
            collect(child.stdout.take(), echo_out),
            collect(child.stderr.take(), echo_err),
        )
        .map_err(|e| WorkspaceError::io(cwd, e))?;

        let status = child.wait().await.map_err(|e| WorkspaceError::io(cwd, e))?;
        trace!(?status, "'{command}' finished");

        if status.success() {
            Ok(stdout)
        } else {
            Err(WorkspaceError::ShellCommandFailed {
                command: command.to_string(),
                code: status.code(),
                stderr: stderr.trim_end().to_string(),
            })
        }
    }
}
