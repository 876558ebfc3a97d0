use anyhow::{Context, Result};
use clap::Parser;
use homelab_core::{cluster_status, CommandRunner, MatchMode, Tools};

/// Check whether the cluster exists without changing anything.
#[derive(Debug, Parser)]
pub(crate) struct Status {
    /// Output the status in JSON format.
    #[clap(long = "json")]
    json: bool,
}

impl Status {
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
        let status = cluster_status(runner, tools, name, match_mode).await;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&status)
                    .context("Could not create string from status.")?
            );
        } else {
            println!("{}", status);
        }
        Ok(())
    }
}
