/*!

This test module provides a fake host implementing [`CommandRunner`]. It pretends to be `brew`,
`docker`, `k3d` and `flux` so that the pipelines can be tested without any of them installed.

The host keeps just enough state to answer the way the real tools would: which clusters exist,
whether the runtime daemon is up, which CLIs are installed. Every invocation is recorded so tests
can assert on the mutating calls that were made.

!*/

use homelab_core::command::command_line;
use homelab_core::{CommandOutput, CommandRunner, Error, Result};
use serde_json::json;
use std::sync::{Mutex, MutexGuard};

/// The knobs and observable state of the fake host.
#[derive(Clone, Debug)]
pub struct HostState {
    pub brew: bool,
    pub k3d: bool,
    pub flux: bool,
    pub docker_running: bool,
    /// Set once the runtime launcher was spawned.
    pub docker_launched: bool,
    /// How many `docker info` probes fail after launch before the daemon answers. `None` means it
    /// never comes up.
    pub probes_until_ready: Option<u32>,
    pub clusters: Vec<String>,
    /// Makes `k3d cluster list` exit non-zero.
    pub list_fails: bool,
    /// Makes `k3d cluster delete` exit non-zero without deleting anything.
    pub delete_fails: bool,
    pub flux_check_passes: bool,
    /// Every command line run to completion, in order.
    pub calls: Vec<String>,
    /// Every command line started in the background.
    pub spawned: Vec<String>,
}

impl Default for HostState {
    /// A machine with every tool installed and running, and no clusters.
    fn default() -> Self {
        Self {
            brew: true,
            k3d: true,
            flux: true,
            docker_running: true,
            docker_launched: false,
            probes_until_ready: Some(0),
            clusters: Vec::new(),
            list_fails: false,
            delete_fails: false,
            flux_check_passes: true,
            calls: Vec::new(),
            spawned: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeHost {
    state: Mutex<HostState>,
}

/// Command line prefixes that change something on the host.
const MUTATING: &[&str] = &[
    "brew install",
    "k3d cluster create",
    "k3d cluster delete",
    "k3d kubeconfig merge",
    "flux bootstrap",
];

impl FakeHost {
    pub fn new(state: HostState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap()
    }

    pub fn with_clusters(names: &[&str]) -> Self {
        Self::new(HostState {
            clusters: names.iter().map(|name| name.to_string()).collect(),
            ..Default::default()
        })
    }

    /// The recorded calls that change host state, plus everything spawned.
    pub fn mutating_calls(&self) -> Vec<String> {
        let state = self.state();
        state
            .calls
            .iter()
            .filter(|call| MUTATING.iter().any(|prefix| call.starts_with(prefix)))
            .chain(state.spawned.iter())
            .cloned()
            .collect()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn clear_calls(&self) {
        let mut state = self.state();
        state.calls.clear();
        state.spawned.clear();
    }
}

fn ok<S: Into<String>>(stdout: S) -> Result<CommandOutput> {
    Ok(CommandOutput {
        code: Some(0),
        stdout: stdout.into(),
        stderr: String::new(),
    })
}

fn fail<S: Into<String>>(stderr: S) -> Result<CommandOutput> {
    Ok(CommandOutput {
        code: Some(1),
        stdout: String::new(),
        stderr: stderr.into(),
    })
}

fn not_found(program: &str) -> Result<CommandOutput> {
    Err(Error::Spawn {
        program: program.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
    })
}

impl HostState {
    fn docker(&mut self, args: &[&str]) -> Result<CommandOutput> {
        match args {
            ["info"] => {
                if !self.docker_running && self.docker_launched {
                    match self.probes_until_ready {
                        Some(0) => self.docker_running = true,
                        Some(n) => self.probes_until_ready = Some(n - 1),
                        None => {}
                    }
                }
                if self.docker_running {
                    ok("Server Version: 24.0.6")
                } else {
                    fail("Cannot connect to the Docker daemon at unix:///var/run/docker.sock")
                }
            }
            _ => fail(format!("unexpected docker args {:?}", args)),
        }
    }

    fn brew(&mut self, args: &[&str]) -> Result<CommandOutput> {
        if !self.brew {
            return not_found("brew");
        }
        match args {
            ["--version"] => ok("Homebrew 4.1.0"),
            ["install", "k3d"] => {
                self.k3d = true;
                ok("")
            }
            ["install", "fluxcd/tap/flux"] => {
                self.flux = true;
                ok("")
            }
            _ => fail(format!("unexpected brew args {:?}", args)),
        }
    }

    fn k3d(&mut self, args: &[&str]) -> Result<CommandOutput> {
        if !self.k3d {
            return not_found("k3d");
        }
        match args {
            ["version"] => ok("k3d version v5.6.0"),
            ["cluster", "list", "-o", "json"] => {
                if self.list_fails || !self.docker_running {
                    return fail("Failed to list clusters: docker daemon not reachable");
                }
                let clusters = self
                    .clusters
                    .iter()
                    .map(|name| {
                        json!({
                            "name": name,
                            "network": format!("k3d-{}", name),
                            "serversCount": 1,
                            "serversRunning": 1,
                            "agentsCount": 3,
                            "agentsRunning": 3,
                        })
                    })
                    .collect::<Vec<_>>();
                ok(serde_json::to_string(&clusters).unwrap())
            }
            ["cluster", "create", name, ..] => {
                if self.clusters.iter().any(|c| c.as_str() == *name) {
                    return fail(format!(
                        "Failed to create cluster '{}' because a cluster with that name already exists",
                        name
                    ));
                }
                self.clusters.push(name.to_string());
                ok("")
            }
            ["cluster", "delete", name] => {
                if self.delete_fails {
                    return fail(format!(
                        "Failed to delete cluster '{}': error response from daemon",
                        name
                    ));
                }
                self.clusters.retain(|c| c.as_str() != *name);
                ok("")
            }
            ["kubeconfig", "get", name] => {
                if self.clusters.iter().any(|c| c.as_str() == *name) {
                    ok(format!(
                        "apiVersion: v1\nkind: Config\ncurrent-context: k3d-{}\n",
                        name
                    ))
                } else {
                    fail(format!("cluster '{}' not found", name))
                }
            }
            ["kubeconfig", "merge", name, "--output", path] => {
                if !self.clusters.iter().any(|c| c.as_str() == *name) {
                    return fail(format!("cluster '{}' not found", name));
                }
                match std::fs::write(path, format!("current-context: k3d-{}\n", name)) {
                    Ok(()) => ok(path.to_string()),
                    Err(e) => fail(e.to_string()),
                }
            }
            _ => fail(format!("unexpected k3d args {:?}", args)),
        }
    }

    fn flux(&mut self, args: &[&str]) -> Result<CommandOutput> {
        if !self.flux {
            return not_found("flux");
        }
        match args {
            ["--version"] => ok("flux version 2.1.2"),
            ["check", "--pre"] => {
                if self.flux_check_passes {
                    ok("✔ prerequisites checks passed")
                } else {
                    fail("✗ Kubernetes version v1.18.0 does not match >=1.26.0-0")
                }
            }
            ["bootstrap", "github", ..] => ok("✔ all components are healthy"),
            _ => fail(format!("unexpected flux args {:?}", args)),
        }
    }
}

#[async_trait::async_trait]
impl CommandRunner for FakeHost {
    async fn output(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let mut state = self.state();
        state.calls.push(command_line(program, args));
        match program {
            "brew" => state.brew(args),
            "docker" => state.docker(args),
            "k3d" => state.k3d(args),
            "flux" => state.flux(args),
            other => not_found(other),
        }
    }

    fn spawn(&self, program: &str, args: &[&str]) -> Result<()> {
        let mut state = self.state();
        state.spawned.push(command_line(program, args));
        if program == "open" {
            state.docker_launched = true;
        }
        Ok(())
    }
}

/// A provisioning configuration that keeps every file it touches under `dir`.
pub fn provision_config(dir: &std::path::Path) -> homelab_core::ProvisionConfig {
    use homelab_core::{
        ClusterConfig, CredentialConfig, GitOpsConfig, MatchMode, ProvisionConfig, ReadinessConfig,
    };
    ProvisionConfig {
        cluster: ClusterConfig::default(),
        credentials: CredentialConfig::new(
            dir.join("kube").join("config"),
            dir.join("state").join("homelab.merged"),
        ),
        gitops: GitOpsConfig {
            owner: "octocat".to_string(),
            repository: "homelab-fleet".to_string(),
            branch: "main".to_string(),
            path: "clusters/homelab".to_string(),
            marker: dir.join("state").join("homelab.bootstrapped"),
        },
        readiness: ReadinessConfig {
            max_attempts: 5,
            interval: std::time::Duration::from_millis(1),
        },
        match_mode: MatchMode::Exact,
    }
}
