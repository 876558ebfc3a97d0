use crate::command::CommandRunner;
use crate::error::{self, Result};
use crate::report::Outcome;
use log::{debug, info, warn};
use serde::Deserialize;
use snafu::{ensure, OptionExt, ResultExt};

/// The environment variable prefix for [`Tools`].
pub const TOOLS_ENV_PREFIX: &str = "HOMELAB_";

/// Where to find the external programs that are driven by the pipelines. Each value is a path or a
/// bare name that is found via `$PATH`.
///
/// # Example
///
/// ```text
/// HOMELAB_K3D_PATH=/opt/bin/k3d
/// HOMELAB_RUNTIME_LAUNCH="systemctl --user start docker"
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Tools {
    /// The package manager, used to install missing CLIs.
    #[serde(default = "brew")]
    pub brew_path: String,

    /// The container runtime CLI.
    #[serde(default = "docker")]
    pub docker_path: String,

    /// The cluster manager CLI.
    #[serde(default = "k3d")]
    pub k3d_path: String,

    /// The GitOps CLI.
    #[serde(default = "flux")]
    pub flux_path: String,

    /// The command line that starts the container runtime application, split on whitespace.
    #[serde(default = "runtime_launch")]
    pub runtime_launch: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            brew_path: brew(),
            docker_path: docker(),
            k3d_path: k3d(),
            flux_path: flux(),
            runtime_launch: runtime_launch(),
        }
    }
}

impl Tools {
    /// Read the tool settings from `HOMELAB_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        envy::prefixed(TOOLS_ENV_PREFIX)
            .from_env::<Tools>()
            .context(error::SettingsSnafu)
    }

    /// The runtime launch command split into the program and its arguments.
    pub fn runtime_launch_command(&self) -> Result<(&str, Vec<&str>)> {
        let mut parts = self.runtime_launch.split_whitespace();
        let program = parts.next().context(error::LaunchCommandSnafu)?;
        Ok((program, parts.collect()))
    }
}

// We need these to provide defaults for serde.
fn brew() -> String {
    String::from("brew")
}

fn docker() -> String {
    String::from("docker")
}

fn k3d() -> String {
    String::from("k3d")
}

fn flux() -> String {
    String::from("flux")
}

fn runtime_launch() -> String {
    String::from("open --background -a Docker")
}

/// A CLI that the provisioning pipeline makes sure is installed.
#[derive(Clone, Debug)]
pub struct Installable<'a> {
    /// Human readable name used in logs and errors.
    pub name: &'a str,
    /// The program to probe.
    pub program: &'a str,
    /// Arguments for a read-only probe that succeeds when the tool is usable.
    pub probe: &'a [&'a str],
    /// The package manager formula that provides the tool.
    pub formula: &'a str,
}

/// Returns `true` if running `program` with `args` exits successfully. A program that cannot be
/// started counts as a failed probe.
pub async fn probe<R>(runner: &R, program: &str, args: &[&str]) -> bool
where
    R: CommandRunner + ?Sized,
{
    match runner.output(program, args).await {
        Ok(output) => output.success(),
        Err(e) => {
            debug!("Probe '{}' could not run: {}", program, e);
            false
        }
    }
}

/// Makes sure `tool` is installed, installing it with the package manager when it is missing.
/// `package_manager` is `false` when the package manager itself is unavailable, in which case a
/// missing tool is an error.
pub async fn ensure_installed<R>(
    runner: &R,
    tools: &Tools,
    tool: &Installable<'_>,
    package_manager: bool,
) -> Result<Outcome>
where
    R: CommandRunner + ?Sized,
{
    if probe(runner, tool.program, tool.probe).await {
        debug!("'{}' is already installed", tool.name);
        return Ok(Outcome::Skipped);
    }
    ensure!(
        package_manager,
        error::MissingToolSnafu {
            tool: tool.name.to_string()
        }
    );

    info!("Installing '{}' with '{}'", tool.name, tools.brew_path);
    runner
        .output(&tools.brew_path, &["install", tool.formula])
        .await
        .and_then(|output| output.into_stdout(format!("brew install {}", tool.formula)))
        .context(error::InstallSnafu {
            tool: tool.name.to_string(),
        })?;

    if !probe(runner, tool.program, tool.probe).await {
        warn!(
            "'{}' was installed but '{}' still does not respond",
            tool.name, tool.program
        );
    }
    Ok(Outcome::Performed)
}
