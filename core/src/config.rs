use crate::error::{self, Result};
use crate::oracle::MatchMode;
use serde::Serialize;
use snafu::OptionExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CLUSTER_NAME: &str = "homelab";
pub const DEFAULT_IMAGE: &str = "rancher/k3s:v1.27.4-k3s1";
pub const DEFAULT_SERVERS: u32 = 1;
pub const DEFAULT_AGENTS: u32 = 3;
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_READY_ATTEMPTS: u32 = 30;
pub const DEFAULT_READY_INTERVAL: Duration = Duration::from_secs(5);

/// The mode the credential directory is created with.
pub const CREDENTIAL_DIR_MODE: u32 = 0o755;

/// The cluster to create, as handed to the cluster manager.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    pub name: String,
    /// Node image, including its version tag.
    pub image: String,
    pub servers: u32,
    pub agents: u32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_CLUSTER_NAME.to_string(),
            image: DEFAULT_IMAGE.to_string(),
            servers: DEFAULT_SERVERS,
            agents: DEFAULT_AGENTS,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialConfig {
    /// The kubeconfig file the cluster credentials are merged into.
    pub output: PathBuf,
    /// Written after a successful merge. It holds the path of the file the credentials went to.
    pub marker: PathBuf,
}

impl CredentialConfig {
    pub fn new<P, M>(output: P, marker: M) -> Self
    where
        P: Into<PathBuf>,
        M: Into<PathBuf>,
    {
        Self {
            output: output.into(),
            marker: marker.into(),
        }
    }

    /// The directory holding the kubeconfig file.
    pub fn dir(&self) -> &Path {
        self.output
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }
}

/// Where flux should be bootstrapped from.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitOpsConfig {
    /// The GitHub account that owns the repository.
    pub owner: String,
    pub repository: String,
    pub branch: String,
    /// Directory inside the repository holding this cluster's manifests.
    pub path: String,
    /// Present once bootstrap has happened.
    pub marker: PathBuf,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReadinessConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_READY_ATTEMPTS,
            interval: DEFAULT_READY_INTERVAL,
        }
    }
}

/// Everything the provisioning pipeline needs to know.
#[derive(Clone, Debug)]
pub struct ProvisionConfig {
    pub cluster: ClusterConfig,
    pub credentials: CredentialConfig,
    pub gitops: GitOpsConfig,
    pub readiness: ReadinessConfig,
    pub match_mode: MatchMode,
}

fn home_dir(flag: &str) -> Result<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .context(error::HomeDirSnafu { flag })
}

/// `$HOME/.kube/config`
pub fn default_kubeconfig_path() -> Result<PathBuf> {
    Ok(home_dir("--kubeconfig-output")?.join(".kube").join("config"))
}

/// `$HOME/.homelab/<cluster_name>.bootstrapped`
pub fn default_marker_path(cluster_name: &str) -> Result<PathBuf> {
    Ok(home_dir("--bootstrap-marker")?
        .join(".homelab")
        .join(format!("{}.bootstrapped", cluster_name)))
}

/// `$HOME/.homelab/<cluster_name>.merged`
pub fn default_merge_marker_path(cluster_name: &str) -> Result<PathBuf> {
    Ok(home_dir("--merge-marker")?
        .join(".homelab")
        .join(format!("{}.merged", cluster_name)))
}

/// The directory in the GitOps repository that flux reconciles for `cluster_name`.
pub fn default_gitops_path(cluster_name: &str) -> String {
    format!("clusters/{}", cluster_name)
}
