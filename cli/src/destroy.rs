use anyhow::{Context, Result};
use clap::Parser;
use homelab_core::{CommandRunner, Decommissioner, MatchMode, Tools};

/// The destroy subcommand deletes the cluster if it exists. A cluster that does not exist is not an
/// error.
#[derive(Debug, Parser)]
pub(crate) struct Destroy {}

impl Destroy {
    pub(crate) async fn run<R>(
        self,
        runner: &R,
        tools: &Tools,
        name: &str,
        match_mode: MatchMode,
    ) -> Result<()>
    where
        R: CommandRunner,
    {
        let report = Decommissioner::new(runner, tools, name, match_mode)
            .run()
            .await
            .context(format!("Unable to delete cluster '{}'", name))?;

        for notice in &report.notices {
            println!("{}", notice);
        }
        Ok(())
    }
}
