use crate::command::{command_line, CommandRunner};
use crate::error::Result;
use crate::tools::{probe, Tools};
use log::info;

/// The container runtime that k3d runs its nodes in.
#[derive(Debug)]
pub struct ContainerRuntime<'a, R: ?Sized> {
    runner: &'a R,
    tools: &'a Tools,
}

impl<'a, R> ContainerRuntime<'a, R>
where
    R: CommandRunner + ?Sized,
{
    pub fn new(runner: &'a R, tools: &'a Tools) -> Self {
        Self { runner, tools }
    }

    /// `docker info`, which only succeeds when the daemon is reachable.
    pub async fn info(&self) -> bool {
        probe(self.runner, &self.tools.docker_path, &["info"]).await
    }

    /// Start the runtime application in the background. Returns as soon as the launcher has been
    /// started, use [`crate::wait::wait_until_ready`] with [`Self::info`] to find out when the
    /// daemon is up.
    pub fn launch(&self) -> Result<()> {
        let (program, args) = self.tools.runtime_launch_command()?;
        info!(
            "Launching the container runtime with '{}'",
            command_line(program, &args)
        );
        self.runner.spawn(program, &args)
    }
}
