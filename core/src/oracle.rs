/*!

The existence oracle answers "does the cluster named `N` exist?" from the cluster manager's
structured list output. Every create and delete decision in the pipelines goes through it.

!*/

use crate::cluster_manager::ClusterManager;
use crate::command::CommandRunner;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// How a cluster name is matched against the list output.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchMode {
    /// Parse the list output into records and compare names for equality.
    #[default]
    Exact,
    /// Search the raw list output for the name. `homelab` is reported present when only
    /// `homelab-test` exists; kept only for compatibility with older tooling.
    Substring,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(MatchMode::Exact),
            "substring" => Ok(MatchMode::Substring),
            other => Err(format!(
                "unknown match mode '{}', expected 'exact' or 'substring'",
                other
            )),
        }
    }
}

impl Display for MatchMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchMode::Exact => write!(f, "exact"),
            MatchMode::Substring => write!(f, "substring"),
        }
    }
}

/// One entry of `k3d cluster list -o json`. Only the fields we report on are kept.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedCluster {
    pub name: String,
    #[serde(default)]
    pub servers_count: Option<u32>,
    #[serde(default)]
    pub servers_running: Option<u32>,
    #[serde(default)]
    pub agents_count: Option<u32>,
    #[serde(default)]
    pub agents_running: Option<u32>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClusterState {
    Present,
    Absent,
    /// The list query failed, nothing may be concluded.
    Unknown,
}

impl ClusterState {
    pub fn is_present(self) -> bool {
        self == ClusterState::Present
    }
}

impl Display for ClusterState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterState::Present => write!(f, "present"),
            ClusterState::Absent => write!(f, "absent"),
            ClusterState::Unknown => write!(f, "unknown"),
        }
    }
}

/// The oracle's answer for one cluster name.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    pub name: String,
    pub state: ClusterState,
    /// The matching record, when exact matching found one.
    pub cluster: Option<ListedCluster>,
    /// Why the state is `Unknown`.
    pub reason: Option<String>,
}

impl ClusterStatus {
    fn unknown<S: Into<String>>(name: &str, reason: S) -> Self {
        Self {
            name: name.to_string(),
            state: ClusterState::Unknown,
            cluster: None,
            reason: Some(reason.into()),
        }
    }
}

impl Display for ClusterStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.state)?;
        if let Some(cluster) = &self.cluster {
            if let (Some(servers), Some(agents)) = (cluster.servers_count, cluster.agents_count) {
                write!(f, " ({} server(s), {} agent(s))", servers, agents)?;
            }
        }
        if let Some(reason) = &self.reason {
            write!(f, " ({})", reason)?;
        }
        Ok(())
    }
}

/// Parse the JSON printed by `k3d cluster list -o json`. Empty output and `null` mean there are no
/// clusters.
pub fn parse_cluster_list(stdout: &str) -> serde_json::Result<Vec<ListedCluster>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    let clusters: Option<Vec<ListedCluster>> = serde_json::from_str(stdout)?;
    Ok(clusters.unwrap_or_default())
}

/// Decide whether `name` is in the successful list output `stdout`.
pub fn match_cluster(name: &str, stdout: &str, mode: MatchMode) -> ClusterStatus {
    match mode {
        MatchMode::Exact => match parse_cluster_list(stdout) {
            Ok(clusters) => {
                let cluster = clusters.into_iter().find(|cluster| cluster.name == name);
                ClusterStatus {
                    name: name.to_string(),
                    state: if cluster.is_some() {
                        ClusterState::Present
                    } else {
                        ClusterState::Absent
                    },
                    cluster,
                    reason: None,
                }
            }
            Err(e) => ClusterStatus::unknown(name, format!("unable to parse cluster list: {}", e)),
        },
        MatchMode::Substring => ClusterStatus {
            name: name.to_string(),
            state: if stdout.contains(name) {
                ClusterState::Present
            } else {
                ClusterState::Absent
            },
            cluster: None,
            reason: None,
        },
    }
}

/// Queries the cluster manager for the existence of named clusters.
#[derive(Debug)]
pub struct ExistenceOracle<'a, R: ?Sized> {
    manager: &'a ClusterManager<'a, R>,
    mode: MatchMode,
}

impl<'a, R> ExistenceOracle<'a, R>
where
    R: CommandRunner + ?Sized,
{
    pub fn new(manager: &'a ClusterManager<'a, R>, mode: MatchMode) -> Self {
        Self { manager, mode }
    }

    /// Never fails: a list invocation that cannot run or exits non-zero yields
    /// [`ClusterState::Unknown`].
    pub async fn query(&self, name: &str) -> ClusterStatus {
        if self.mode == MatchMode::Substring {
            warn!(
                "Using substring matching to find cluster '{}', clusters whose names contain it \
                 will be mistaken for it",
                name
            );
        }
        let output = match self.manager.list().await {
            Ok(output) => output,
            Err(e) => {
                warn!("Unable to list clusters: {}", e);
                return ClusterStatus::unknown(name, e.to_string());
            }
        };
        if !output.success() {
            warn!(
                "Listing clusters failed with exit code {}\nstderr:\n{}",
                output.code.unwrap_or(-1),
                output.stderr
            );
            return ClusterStatus::unknown(
                name,
                format!(
                    "cluster list exited with code {}",
                    output.code.unwrap_or(-1)
                ),
            );
        }
        trace!("Cluster list output:\n{}", output.stdout);
        let status = match_cluster(name, &output.stdout, self.mode);
        debug!("Cluster '{}' is {}", name, status.state);
        status
    }

    /// Returns `true` only if the cluster is known to exist.
    pub async fn exists(&self, name: &str) -> bool {
        self.query(name).await.state.is_present()
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=
