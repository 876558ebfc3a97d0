use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Whether an idempotent step acted or found its precondition already satisfied.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Skipped,
    Performed,
}

impl Outcome {
    pub fn performed(self) -> bool {
        self == Outcome::Performed
    }
}

/// A human readable completion notice emitted by a pipeline.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "notice")]
pub enum Notice {
    /// The cluster exists and its credentials have been handled.
    ClusterReady { name: String },
    /// Flux was bootstrapped onto the cluster during this run.
    GitOpsBootstrapped {
        owner: String,
        repository: String,
        branch: String,
    },
    /// The cluster was deleted during this run.
    ClusterDeleted { name: String },
}

impl Display for Notice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::ClusterReady { name } => write!(f, "Cluster '{}' is ready.", name),
            Notice::GitOpsBootstrapped {
                owner,
                repository,
                branch,
            } => write!(
                f,
                "Flux was bootstrapped from '{}/{}' on branch '{}'.",
                owner, repository, branch
            ),
            Notice::ClusterDeleted { name } => write!(f, "Cluster '{}' was deleted.", name),
        }
    }
}
