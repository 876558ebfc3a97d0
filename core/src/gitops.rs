use crate::command::{command_line, CommandRunner};
use crate::config::GitOpsConfig;
use crate::error::{self, Result};
use log::info;
use snafu::ResultExt;

/// The git provider flux is bootstrapped against.
pub const PROVIDER: &str = "github";

/// Drives the `flux` CLI.
#[derive(Debug)]
pub struct GitOps<'a, R: ?Sized> {
    runner: &'a R,
    program: &'a str,
}

impl<'a, R> GitOps<'a, R>
where
    R: CommandRunner + ?Sized,
{
    pub fn new(runner: &'a R, program: &'a str) -> Self {
        Self { runner, program }
    }

    async fn run_checked(&self, args: &[&str]) -> Result<String> {
        self.runner
            .output(self.program, args)
            .await?
            .into_stdout(command_line(self.program, args))
    }

    /// `flux check --pre`
    pub async fn check_prerequisites(&self) -> Result<()> {
        info!("Checking flux prerequisites");
        self.run_checked(&["check", "--pre"])
            .await
            .context(error::GitOpsPrerequisitesSnafu)?;
        Ok(())
    }

    /// `flux bootstrap github` for a personal account.
    pub async fn bootstrap(&self, gitops: &GitOpsConfig) -> Result<()> {
        let owner = format!("--owner={}", gitops.owner);
        let repository = format!("--repository={}", gitops.repository);
        let branch = format!("--branch={}", gitops.branch);
        let path = format!("--path={}", gitops.path);
        info!(
            "Bootstrapping flux from '{}/{}' on branch '{}'",
            gitops.owner, gitops.repository, gitops.branch
        );
        self.run_checked(&[
            "bootstrap",
            PROVIDER,
            owner.as_str(),
            repository.as_str(),
            branch.as_str(),
            path.as_str(),
            "--personal",
        ])
        .await
        .context(error::GitOpsBootstrapSnafu {
            owner: gitops.owner.as_str(),
            repository: gitops.repository.as_str(),
        })?;
        Ok(())
    }
}
