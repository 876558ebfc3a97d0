use crate::wait::Timeout;
use snafu::Snafu;
use std::path::PathBuf;

/// The crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// The crate-wide error type.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display(
        "Error running '{}', exit code {}\nstderr:\n{}\nstdout:\n{}",
        hint,
        code,
        stderr,
        stdout
    ))]
    Command {
        hint: String,
        code: i32,
        stderr: String,
        stdout: String,
    },

    #[snafu(display("Unable to create credential directory '{}': {}", path.display(), source))]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to create cluster '{}': {}", name, source))]
    CreateCluster {
        name: String,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },

    #[snafu(display("Failed to delete cluster '{}': {}", name, source))]
    DeleteCluster {
        name: String,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },

    #[snafu(display(
        "Failed to bootstrap flux from '{}/{}': {}",
        owner,
        repository,
        source
    ))]
    GitOpsBootstrap {
        owner: String,
        repository: String,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },

    #[snafu(display("Flux prerequisite check failed: {}", source))]
    GitOpsPrerequisites {
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },

    #[snafu(display(
        "Unable to determine the home directory, '$HOME' is not set; pass '{}' explicitly",
        flag
    ))]
    HomeDir { flag: String },

    #[snafu(display("Failed to install '{}': {}", tool, source))]
    Install {
        tool: String,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },

    #[snafu(display("Unable to read credentials for cluster '{}': {}", name, source))]
    Kubeconfig {
        name: String,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },

    #[snafu(display("Empty launch command for the container runtime"))]
    LaunchCommand,

    #[snafu(display(
        "'{}' is not installed and no package manager is available to install it",
        tool
    ))]
    MissingTool { tool: String },

    #[snafu(display("Unable to set permissions on '{}': {}", path.display(), source))]
    Permissions {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Container runtime did not become reachable: {}", source))]
    RuntimeUnreachable { source: Timeout },

    #[snafu(display("Unable to read tool settings from the environment: {}", source))]
    Settings { source: envy::Error },

    #[snafu(display("Failed to create '{}' process: {}", program, source))]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[snafu(display("Unable to write bootstrap marker '{}': {}", path.display(), source))]
    WriteMarker {
        path: PathBuf,
        source: std::io::Error,
    },
}
