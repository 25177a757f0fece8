//! `kb-agent clear` command
//!
//! Clears all data from the remote knowledge base deployment.

use anyhow::Result;
use clap::Args;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct ClearArgs {
    /// Confirm removal of all knowledge from the deployment
    #[arg(long)]
    pub yes: bool,
}

pub async fn run(args: ClearArgs, config: &Config) -> Result<()> {
    if !args.yes {
        anyhow::bail!("clear removes all knowledge from the deployment. Pass --yes to confirm.");
    }

    let request = super::build_request(config, "clear", None)?;
    super::print_result(crate::agent::run_with_config(request, config).await)
}
