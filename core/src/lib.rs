/*!

`homelab-core` provisions and decommissions a local `k3d` Kubernetes cluster and bootstraps `flux`
onto it.

All external programs are driven through the [`CommandRunner`] trait so that the pipelines can be
exercised without `docker`, `k3d` or `flux` installed. [`SystemRunner`] is the implementation that
runs real processes.

- [`Provisioner`] makes sure the tooling is present, creates the cluster if it is absent, merges
  its credentials and bootstraps flux.
- [`Decommissioner`] deletes the cluster if it exists.
- [`ExistenceOracle`] decides whether a cluster exists; both pipelines rely on it.

!*/

pub mod cluster_manager;
pub mod command;
pub mod config;
pub mod decommission;
mod error;
pub mod gitops;
pub mod oracle;
pub mod provision;
pub mod report;
pub mod runtime;
pub mod tools;
pub mod wait;

pub use cluster_manager::ClusterManager;
pub use command::{CommandOutput, CommandRunner, SystemRunner};
pub use config::{ClusterConfig, CredentialConfig, GitOpsConfig, ProvisionConfig, ReadinessConfig};
pub use decommission::{DecommissionReport, Decommissioner};
pub use error::{Error, Result};
pub use oracle::{ClusterState, ClusterStatus, ExistenceOracle, MatchMode};
pub use provision::{ProvisionReport, ProvisionStep, Provisioner};
pub use report::{Notice, Outcome};
pub use tools::Tools;

/// Ask the existence oracle about `name` without changing anything.
pub async fn cluster_status<R>(
    runner: &R,
    tools: &Tools,
    name: &str,
    match_mode: MatchMode,
) -> ClusterStatus
where
    R: CommandRunner + ?Sized,
{
    let manager = ClusterManager::new(runner, &tools.k3d_path);
    ExistenceOracle::new(&manager, match_mode).query(name).await
}
