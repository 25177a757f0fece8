//! `kb-agent store` command
//!
//! Stores a piece of text with optional metadata in the remote knowledge
//! base.
//!
//! # Usage
//! ```bash
//! kb-agent store --text "Timeout is 30s"
//! kb-agent store --text "Timeout is 30s" --metadata '{"source": "docs"}'
//! ```

use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Text to store
    #[arg(short, long)]
    pub text: String,

    /// Metadata as a JSON object
    #[arg(short, long)]
    pub metadata: Option<String>,
}

pub async fn run(args: StoreArgs, config: &Config) -> Result<()> {
    let metadata: serde_json::Value = match &args.metadata {
        Some(raw) => serde_json::from_str(raw)?,
        None => json!({}),
    };

    let request = super::build_request(
        config,
        "store",
        Some(json!({ "text": args.text, "metadata": metadata })),
    )?;

    super::print_result(crate::agent::run_with_config(request, config).await)
}
