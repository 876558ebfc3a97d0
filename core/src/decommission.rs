use crate::cluster_manager::ClusterManager;
use crate::command::CommandRunner;
use crate::error::Result;
use crate::oracle::{ClusterState, ClusterStatus, ExistenceOracle, MatchMode};
use crate::report::Notice;
use crate::tools::Tools;
use log::{info, warn};
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecommissionReport {
    /// What the existence oracle said before anything was deleted.
    pub cluster: ClusterStatus,
    /// Whether this run deleted the cluster.
    pub deleted: bool,
    pub notices: Vec<Notice>,
}

/// Deletes the named cluster if, and only if, it is known to exist. Deletion is best-effort
/// cleanup: a cluster that is absent, or whose existence cannot be determined, is not an error.
#[derive(Debug)]
pub struct Decommissioner<'a, R: ?Sized> {
    runner: &'a R,
    tools: &'a Tools,
    name: &'a str,
    match_mode: MatchMode,
}

impl<'a, R> Decommissioner<'a, R>
where
    R: CommandRunner + ?Sized,
{
    pub fn new(runner: &'a R, tools: &'a Tools, name: &'a str, match_mode: MatchMode) -> Self {
        Self {
            runner,
            tools,
            name,
            match_mode,
        }
    }

    pub async fn run(&self) -> Result<DecommissionReport> {
        let manager = ClusterManager::new(self.runner, &self.tools.k3d_path);
        let oracle = ExistenceOracle::new(&manager, self.match_mode);
        let cluster = oracle.query(self.name).await;

        let mut report = DecommissionReport {
            cluster,
            deleted: false,
            notices: Vec::new(),
        };
        match report.cluster.state {
            ClusterState::Present => {
                manager.delete(self.name).await?;
                report.deleted = true;
                report.notices.push(Notice::ClusterDeleted {
                    name: self.name.to_string(),
                });
            }
            ClusterState::Absent => {
                info!("Cluster '{}' does not exist, nothing to delete", self.name)
            }
            ClusterState::Unknown => warn!(
                "Unable to tell whether cluster '{}' exists, treating it as absent",
                self.name
            ),
        }
        Ok(report)
    }
}
