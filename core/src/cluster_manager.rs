use crate::command::{command_line, CommandOutput, CommandRunner};
use crate::config::ClusterConfig;
use crate::error::{self, Result};
use log::{debug, info};
use snafu::ResultExt;
use std::path::Path;

/// Drives the `k3d` cluster manager.
#[derive(Debug)]
pub struct ClusterManager<'a, R: ?Sized> {
    runner: &'a R,
    program: &'a str,
}

impl<'a, R> ClusterManager<'a, R>
where
    R: CommandRunner + ?Sized,
{
    pub fn new(runner: &'a R, program: &'a str) -> Self {
        Self { runner, program }
    }

    async fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        self.runner.output(self.program, args).await
    }

    async fn run_checked(&self, args: &[&str]) -> Result<String> {
        self.run(args)
            .await?
            .into_stdout(command_line(self.program, args))
    }

    /// `k3d cluster list -o json`. The raw result is returned so the caller can decide what a
    /// failed listing means.
    pub async fn list(&self) -> Result<CommandOutput> {
        self.run(&["cluster", "list", "-o", "json"]).await
    }

    /// `k3d cluster create`, blocking until the cluster reports that it is up.
    pub async fn create(&self, cluster: &ClusterConfig) -> Result<()> {
        let servers = cluster.servers.to_string();
        let agents = cluster.agents.to_string();
        info!(
            "Creating cluster '{}' with {} server(s) and {} agent(s) from '{}'",
            cluster.name, servers, agents, cluster.image
        );
        self.run_checked(&[
            "cluster",
            "create",
            cluster.name.as_str(),
            "--image",
            cluster.image.as_str(),
            "--servers",
            servers.as_str(),
            "--agents",
            agents.as_str(),
            "--wait",
        ])
        .await
        .context(error::CreateClusterSnafu {
            name: cluster.name.as_str(),
        })?;
        debug!("k3d cluster create has completed");
        Ok(())
    }

    /// `k3d cluster delete`
    pub async fn delete(&self, name: &str) -> Result<()> {
        info!("Deleting cluster '{}'", name);
        self.run_checked(&["cluster", "delete", name])
            .await
            .context(error::DeleteClusterSnafu { name })?;
        Ok(())
    }

    /// `k3d kubeconfig get`, returning the cluster's kubeconfig document.
    pub async fn kubeconfig_get(&self, name: &str) -> Result<String> {
        self.run_checked(&["kubeconfig", "get", name])
            .await
            .context(error::KubeconfigSnafu { name })
    }

    /// `k3d kubeconfig merge`, letting k3d merge the cluster's credentials into `output`.
    pub async fn kubeconfig_merge(&self, name: &str, output: &Path) -> Result<()> {
        let output = output.to_string_lossy();
        info!("Merging credentials for cluster '{}' into '{}'", name, output);
        self.run_checked(&["kubeconfig", "merge", name, "--output", &*output])
            .await
            .context(error::KubeconfigSnafu { name })?;
        Ok(())
    }
}
