/*!

The provisioning pipeline. It is an ordered list of guarded steps. Each step first checks whether
its precondition already holds and only acts when it does not. Running the pipeline against a
fully provisioned machine performs no mutating calls.

!*/

use crate::cluster_manager::ClusterManager;
use crate::command::CommandRunner;
use crate::config::ProvisionConfig;
use crate::error::{self, Result};
use crate::gitops::GitOps;
use crate::oracle::{ClusterState, ClusterStatus, ExistenceOracle};
use crate::report::{Notice, Outcome};
use crate::runtime::ContainerRuntime;
use crate::tools::{ensure_installed, probe, Installable, Tools};
use crate::wait::wait_until_ready;
use log::{debug, info, warn};
use serde::Serialize;
use snafu::ResultExt;
use std::fmt::{Display, Formatter};
use std::path::Path;

const K3D: &str = "k3d";
const K3D_FORMULA: &str = "k3d";
const FLUX: &str = "flux";
const FLUX_FORMULA: &str = "fluxcd/tap/flux";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProvisionStep {
    EnsurePackageManager,
    EnsureContainerRuntime,
    EnsureClusterCli,
    QueryCluster,
    CreateCluster,
    FetchCredentials,
    EnsureCredentialDir,
    MergeCredentials,
    NotifyReady,
    EnsureGitOpsCli,
    CheckGitOps,
    BootstrapGitOps,
}

impl ProvisionStep {
    /// The order the steps are run in.
    pub const ORDER: [ProvisionStep; 12] = [
        ProvisionStep::EnsurePackageManager,
        ProvisionStep::EnsureContainerRuntime,
        ProvisionStep::EnsureClusterCli,
        ProvisionStep::QueryCluster,
        ProvisionStep::CreateCluster,
        ProvisionStep::FetchCredentials,
        ProvisionStep::EnsureCredentialDir,
        ProvisionStep::MergeCredentials,
        ProvisionStep::NotifyReady,
        ProvisionStep::EnsureGitOpsCli,
        ProvisionStep::CheckGitOps,
        ProvisionStep::BootstrapGitOps,
    ];
}

impl Display for ProvisionStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProvisionStep::EnsurePackageManager => "ensure package manager",
            ProvisionStep::EnsureContainerRuntime => "ensure container runtime",
            ProvisionStep::EnsureClusterCli => "ensure cluster CLI",
            ProvisionStep::QueryCluster => "query cluster",
            ProvisionStep::CreateCluster => "create cluster",
            ProvisionStep::FetchCredentials => "fetch credentials",
            ProvisionStep::EnsureCredentialDir => "ensure credential directory",
            ProvisionStep::MergeCredentials => "merge credentials",
            ProvisionStep::NotifyReady => "notify ready",
            ProvisionStep::EnsureGitOpsCli => "ensure flux CLI",
            ProvisionStep::CheckGitOps => "check flux prerequisites",
            ProvisionStep::BootstrapGitOps => "bootstrap flux",
        };
        Display::fmt(s, f)
    }
}

/// State threaded from step to step, returned to the caller once the pipeline finishes.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionReport {
    /// Whether the package manager was found.
    pub package_manager: bool,
    /// What the existence oracle said before anything was created.
    pub cluster: Option<ClusterStatus>,
    /// Whether this run created the cluster.
    pub created: bool,
    pub steps: Vec<(ProvisionStep, Outcome)>,
    pub notices: Vec<Notice>,
}

impl ProvisionReport {
    pub fn outcome(&self, step: ProvisionStep) -> Option<Outcome> {
        self.steps
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, outcome)| *outcome)
    }

    pub fn performed(&self, step: ProvisionStep) -> bool {
        self.outcome(step).map(Outcome::performed).unwrap_or(false)
    }

    /// `true` if the cluster is known to exist, either because it was found or because it was just
    /// created.
    pub fn cluster_present(&self) -> bool {
        self.created
            || self
                .cluster
                .as_ref()
                .map(|status| status.state.is_present())
                .unwrap_or(false)
    }
}

/// Runs the provisioning pipeline.
#[derive(Debug)]
pub struct Provisioner<'a, R: ?Sized> {
    runner: &'a R,
    tools: &'a Tools,
    config: &'a ProvisionConfig,
}

impl<'a, R> Provisioner<'a, R>
where
    R: CommandRunner + ?Sized,
{
    pub fn new(runner: &'a R, tools: &'a Tools, config: &'a ProvisionConfig) -> Self {
        Self {
            runner,
            tools,
            config,
        }
    }

    /// Run every step in [`ProvisionStep::ORDER`]. The first fatal error stops the pipeline; steps
    /// that already ran are not rolled back.
    pub async fn run(&self) -> Result<ProvisionReport> {
        let mut report = ProvisionReport::default();
        for step in ProvisionStep::ORDER {
            debug!("Starting step '{}'", step);
            let outcome = self.run_step(step, &mut report).await?;
            match outcome {
                Outcome::Performed => info!("Step '{}' done", step),
                Outcome::Skipped => debug!("Step '{}' skipped", step),
            }
            report.steps.push((step, outcome));
        }
        Ok(report)
    }

    async fn run_step(&self, step: ProvisionStep, report: &mut ProvisionReport) -> Result<Outcome> {
        match step {
            ProvisionStep::EnsurePackageManager => self.ensure_package_manager(report).await,
            ProvisionStep::EnsureContainerRuntime => self.ensure_container_runtime().await,
            ProvisionStep::EnsureClusterCli => self.ensure_cluster_cli(report).await,
            ProvisionStep::QueryCluster => self.query_cluster(report).await,
            ProvisionStep::CreateCluster => self.create_cluster(report).await,
            ProvisionStep::FetchCredentials => self.fetch_credentials(report).await,
            ProvisionStep::EnsureCredentialDir => self.ensure_credential_dir(report).await,
            ProvisionStep::MergeCredentials => self.merge_credentials(report).await,
            ProvisionStep::NotifyReady => Ok(self.notify_ready(report)),
            ProvisionStep::EnsureGitOpsCli => self.ensure_gitops_cli(report).await,
            ProvisionStep::CheckGitOps => self.check_gitops().await,
            ProvisionStep::BootstrapGitOps => self.bootstrap_gitops(report).await,
        }
    }

    fn cluster_manager(&self) -> ClusterManager<'a, R> {
        ClusterManager::new(self.runner, &self.tools.k3d_path)
    }

    fn gitops(&self) -> GitOps<'a, R> {
        GitOps::new(self.runner, &self.tools.flux_path)
    }

    async fn ensure_package_manager(&self, report: &mut ProvisionReport) -> Result<Outcome> {
        report.package_manager = probe(self.runner, &self.tools.brew_path, &["--version"]).await;
        if !report.package_manager {
            warn!(
                "Package manager '{}' was not found, missing tools cannot be installed",
                self.tools.brew_path
            );
        }
        Ok(Outcome::Skipped)
    }

    async fn ensure_container_runtime(&self) -> Result<Outcome> {
        let runtime = ContainerRuntime::new(self.runner, self.tools);
        if runtime.info().await {
            debug!("Container runtime is reachable");
            return Ok(Outcome::Skipped);
        }
        if let Err(e) = runtime.launch() {
            warn!("Unable to launch the container runtime: {}", e);
        }
        let readiness = self.config.readiness;
        info!(
            "Waiting for the container runtime, up to {} attempt(s) every {}s",
            readiness.max_attempts,
            readiness.interval.as_secs_f64()
        );
        wait_until_ready(|| runtime.info(), readiness.max_attempts, readiness.interval)
            .await
            .context(error::RuntimeUnreachableSnafu)?;
        Ok(Outcome::Performed)
    }

    async fn ensure_cluster_cli(&self, report: &ProvisionReport) -> Result<Outcome> {
        let k3d = Installable {
            name: K3D,
            program: &self.tools.k3d_path,
            probe: &["version"],
            formula: K3D_FORMULA,
        };
        ensure_installed(self.runner, self.tools, &k3d, report.package_manager).await
    }

    async fn query_cluster(&self, report: &mut ProvisionReport) -> Result<Outcome> {
        let manager = self.cluster_manager();
        let oracle = ExistenceOracle::new(&manager, self.config.match_mode);
        let status = oracle.query(&self.config.cluster.name).await;
        info!("Cluster {}", status);
        report.cluster = Some(status);
        Ok(Outcome::Performed)
    }

    async fn create_cluster(&self, report: &mut ProvisionReport) -> Result<Outcome> {
        let state = report
            .cluster
            .as_ref()
            .map(|status| status.state)
            .unwrap_or(ClusterState::Unknown);
        match state {
            ClusterState::Absent => {
                self.cluster_manager()
                    .create(&self.config.cluster)
                    .await?;
                report.created = true;
                Ok(Outcome::Performed)
            }
            ClusterState::Present => Ok(Outcome::Skipped),
            ClusterState::Unknown => {
                warn!(
                    "Unable to tell whether cluster '{}' exists, it will not be created",
                    self.config.cluster.name
                );
                Ok(Outcome::Skipped)
            }
        }
    }

    async fn fetch_credentials(&self, report: &ProvisionReport) -> Result<Outcome> {
        if !report.cluster_present() {
            return Ok(Outcome::Skipped);
        }
        let kubeconfig = self
            .cluster_manager()
            .kubeconfig_get(&self.config.cluster.name)
            .await?;
        debug!("Retrieved {} bytes of cluster credentials", kubeconfig.len());
        Ok(Outcome::Performed)
    }

    async fn ensure_credential_dir(&self, report: &ProvisionReport) -> Result<Outcome> {
        let dir = self.config.credentials.dir();
        if !report.cluster_present() || is_dir(dir).await {
            return Ok(Outcome::Skipped);
        }
        info!("Creating credential directory '{}'", dir.display());
        create_credential_dir(dir).await?;
        Ok(Outcome::Performed)
    }

    async fn merge_credentials(&self, report: &ProvisionReport) -> Result<Outcome> {
        let credentials = &self.config.credentials;
        if !report.cluster_present() {
            return Ok(Outcome::Skipped);
        }
        if !report.created && merged_into(&credentials.marker, &credentials.output).await {
            debug!(
                "Credentials for cluster '{}' were already merged into '{}'",
                self.config.cluster.name,
                credentials.output.display()
            );
            return Ok(Outcome::Skipped);
        }
        self.cluster_manager()
            .kubeconfig_merge(&self.config.cluster.name, &credentials.output)
            .await?;
        let output = credentials.output.to_string_lossy();
        write_marker(&credentials.marker, output.as_bytes()).await?;
        Ok(Outcome::Performed)
    }

    fn notify_ready(&self, report: &mut ProvisionReport) -> Outcome {
        if !report.cluster_present() {
            return Outcome::Skipped;
        }
        report.notices.push(Notice::ClusterReady {
            name: self.config.cluster.name.clone(),
        });
        Outcome::Performed
    }

    async fn ensure_gitops_cli(&self, report: &ProvisionReport) -> Result<Outcome> {
        let flux = Installable {
            name: FLUX,
            program: &self.tools.flux_path,
            probe: &["--version"],
            formula: FLUX_FORMULA,
        };
        ensure_installed(self.runner, self.tools, &flux, report.package_manager).await
    }

    async fn check_gitops(&self) -> Result<Outcome> {
        self.gitops().check_prerequisites().await?;
        Ok(Outcome::Performed)
    }

    async fn bootstrap_gitops(&self, report: &mut ProvisionReport) -> Result<Outcome> {
        let gitops = &self.config.gitops;
        if exists(&gitops.marker).await {
            debug!(
                "Bootstrap marker '{}' exists, flux is already bootstrapped",
                gitops.marker.display()
            );
            return Ok(Outcome::Skipped);
        }
        self.gitops().bootstrap(gitops).await?;
        write_marker(&gitops.marker, b"").await?;
        report.notices.push(Notice::GitOpsBootstrapped {
            owner: gitops.owner.clone(),
            repository: gitops.repository.clone(),
            branch: gitops.branch.clone(),
        });
        Ok(Outcome::Performed)
    }
}

async fn create_credential_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .context(error::CreateDirSnafu { path: dir })?;
    #[cfg(unix)]
    {
        use crate::config::CREDENTIAL_DIR_MODE;
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(dir, std::fs::Permissions::from_mode(CREDENTIAL_DIR_MODE))
            .await
            .context(error::PermissionsSnafu { path: dir })?;
    }
    Ok(())
}

async fn exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false)
}

/// `true` if `marker` records a merge into `output`. A missing or unreadable marker means the
/// credentials still have to be merged.
async fn merged_into(marker: &Path, output: &Path) -> bool {
    match tokio::fs::read_to_string(marker).await {
        Ok(recorded) => exists(output).await && Path::new(recorded.trim()) == output,
        Err(_) => false,
    }
}

async fn write_marker(marker: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = marker.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .context(error::WriteMarkerSnafu { path: marker })?;
    }
    tokio::fs::write(marker, contents)
        .await
        .context(error::WriteMarkerSnafu { path: marker })
}
