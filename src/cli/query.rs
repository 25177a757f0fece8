//! `kb-agent query` command
//!
//! Searches the remote knowledge base and prints the hits.
//!
//! # Usage
//! ```bash
//! kb-agent query --query "What is Lorem Ipsum?"
//! kb-agent query --query "timeouts" --top-k 5
//! ```

use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Search query
    #[arg(short, long)]
    pub query: String,

    /// Number of hits to request (server default: 2)
    #[arg(short = 'k', long)]
    pub top_k: Option<u32>,
}

pub async fn run(args: QueryArgs, config: &Config) -> Result<()> {
    let mut payload = json!({ "query": args.query });
    if let Some(top_k) = args.top_k {
        payload["top_k"] = json!(top_k);
    }

    let request = super::build_request(config, "query", Some(payload))?;
    super::print_result(crate::agent::run_with_config(request, config).await)
}
