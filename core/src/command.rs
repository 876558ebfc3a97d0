use crate::error::{self, Result};
use async_trait::async_trait;
use log::trace;
use snafu::ResultExt;
use std::process::Stdio;
use tokio::process::Command;

/// The captured result of running an external command to completion.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommandOutput {
    /// The exit code, or `None` if the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// If the command was successful (exit code zero), returns the command's `stdout`. Otherwise
    /// returns an error carrying the raw diagnostic text of the command.
    /// - `hint`: the command that was executed, e.g. `k3d cluster list -o json`
    pub fn into_stdout<S>(self, hint: S) -> Result<String>
    where
        S: Into<String>,
    {
        if self.success() {
            Ok(self.stdout)
        } else {
            error::CommandSnafu {
                hint,
                code: self.code.unwrap_or(-1),
                stderr: self.stderr,
                stdout: self.stdout,
            }
            .fail()
        }
    }
}

/// Executes external programs. The pipelines only ever talk to the outside world through this
/// trait.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` to completion, capturing its output. An `Err` means the process
    /// could not be started at all; a non-zero exit is reported through [`CommandOutput`].
    async fn output(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Start `program` with `args` in the background and return immediately without waiting for it
    /// or inspecting its result.
    fn spawn(&self, program: &str, args: &[&str]) -> Result<()>;
}

/// Runs commands on the local machine.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn output(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        trace!("Running '{}'", command_line(program, args));
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .context(error::SpawnSnafu { program })?;
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    fn spawn(&self, program: &str, args: &[&str]) -> Result<()> {
        trace!("Spawning '{}'", command_line(program, args));
        // Dropping the child does not kill it unless `kill_on_drop` is set.
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context(error::SpawnSnafu { program })?;
        Ok(())
    }
}

/// Formats a command the way a user would type it, for logs and error messages.
pub fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}
