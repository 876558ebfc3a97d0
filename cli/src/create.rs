use anyhow::{Context, Result};
use clap::Parser;
use homelab_core::config::{
    default_gitops_path, default_kubeconfig_path, default_marker_path, default_merge_marker_path,
    DEFAULT_AGENTS, DEFAULT_BRANCH, DEFAULT_IMAGE, DEFAULT_READY_ATTEMPTS, DEFAULT_READY_INTERVAL, DEFAULT_SERVERS,
};
use homelab_core::{
    ClusterConfig, CommandRunner, CredentialConfig, GitOpsConfig, MatchMode, ProvisionConfig,
    Provisioner, ReadinessConfig, Tools,
};
use std::path::PathBuf;
use std::time::Duration;

/// The create subcommand makes sure the cluster exists, that its credentials are merged into the
/// local kubeconfig and that flux has been bootstrapped onto it.
#[derive(Debug, Parser)]
pub(crate) struct Create {
    /// The k3s node image, including its version tag.
    #[clap(long = "image", default_value = DEFAULT_IMAGE)]
    image: String,

    /// The number of server nodes.
    #[clap(long = "servers", default_value_t = DEFAULT_SERVERS)]
    servers: u32,

    /// The number of agent nodes.
    #[clap(long = "agents", default_value_t = DEFAULT_AGENTS)]
    agents: u32,

    /// The kubeconfig file the cluster credentials are merged into. Defaults to
    /// `$HOME/.kube/config`.
    #[clap(long = "kubeconfig-output")]
    kubeconfig_output: Option<PathBuf>,

    /// A file recording that this cluster's credentials were merged into the kubeconfig. Defaults
    /// to `$HOME/.homelab/<name>.merged`.
    #[clap(long = "merge-marker")]
    merge_marker: Option<PathBuf>,

    /// The GitHub account that owns the flux repository.
    #[clap(long = "github-owner", env = "GITHUB_USER")]
    github_owner: String,

    /// The name of the flux repository.
    #[clap(long = "github-repo", env = "GITHUB_REPO")]
    github_repo: String,

    /// The branch flux reconciles from.
    #[clap(long = "branch", default_value = DEFAULT_BRANCH)]
    branch: String,

    /// The directory in the repository holding this cluster's manifests. Defaults to
    /// `clusters/<name>`.
    #[clap(long = "gitops-path")]
    gitops_path: Option<String>,

    /// A file whose presence means flux has already been bootstrapped. Defaults to
    /// `$HOME/.homelab/<name>.bootstrapped`.
    #[clap(long = "bootstrap-marker")]
    bootstrap_marker: Option<PathBuf>,

    /// How many times to check whether the container runtime has started.
    #[clap(long = "ready-attempts", default_value_t = DEFAULT_READY_ATTEMPTS)]
    ready_attempts: u32,

    /// Seconds between container runtime checks.
    #[clap(long = "ready-interval-secs", default_value_t = DEFAULT_READY_INTERVAL.as_secs())]
    ready_interval_secs: u64,
}

impl Create {
    fn into_config(self, name: String, match_mode: MatchMode) -> Result<ProvisionConfig> {
        let kubeconfig_output = match self.kubeconfig_output {
            Some(path) => path,
            None => default_kubeconfig_path()?,
        };
        let merge_marker = match self.merge_marker {
            Some(path) => path,
            None => default_merge_marker_path(&name)?,
        };
        let marker = match self.bootstrap_marker {
            Some(path) => path,
            None => default_marker_path(&name)?,
        };
        let gitops_path = self
            .gitops_path
            .unwrap_or_else(|| default_gitops_path(&name));
        Ok(ProvisionConfig {
            cluster: ClusterConfig {
                name,
                image: self.image,
                servers: self.servers,
                agents: self.agents,
            },
            credentials: CredentialConfig::new(kubeconfig_output, merge_marker),
            gitops: GitOpsConfig {
                owner: self.github_owner,
                repository: self.github_repo,
                branch: self.branch,
                path: gitops_path,
                marker,
            },
            readiness: ReadinessConfig {
                max_attempts: self.ready_attempts,
                interval: Duration::from_secs(self.ready_interval_secs),
            },
            match_mode,
        })
    }

    pub(crate) async fn run<R>(
        self,
        runner: &R,
        tools: &Tools,
        name: String,
        match_mode: MatchMode,
    ) -> Result<()>
    where
        R: CommandRunner,
    {
        let config = self.into_config(name, match_mode)?;
        let report = Provisioner::new(runner, tools, &config)
            .run()
            .await
            .context(format!(
                "Unable to provision cluster '{}'. (Some artifacts may be left behind)",
                config.cluster.name
            ))?;

        for notice in &report.notices {
            println!("{}", notice);
        }
        Ok(())
    }
}
