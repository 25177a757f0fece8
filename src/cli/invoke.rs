//! `kb-agent invoke` command
//!
//! Runs a raw inbound request envelope, exactly as a node would hand it to
//! the agent. Useful for replaying captured requests.
//!
//! # Usage
//! ```bash
//! kb-agent invoke --file request.json
//! cat request.json | kb-agent invoke --file -
//! ```

use std::io::Read;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct InvokeArgs {
    /// Path to a JSON request envelope ("-" for stdin)
    #[arg(short, long)]
    pub file: String,
}

pub async fn run(args: InvokeArgs, config: &Config) -> Result<()> {
    let raw = if args.file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&args.file)
            .with_context(|| format!("cannot read request file {}", args.file))?
    };

    let request: Value = serde_json::from_str(&raw).context("request file is not valid JSON")?;
    super::print_result(crate::agent::run_with_config(request, config).await)
}
