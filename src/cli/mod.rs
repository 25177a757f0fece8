//! CLI module - command definitions and handlers

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use crate::config::Config;
use crate::schemas::UniformResult;

pub mod clear;
pub mod invoke;
pub mod query;
pub mod store;

/// kb-agent - knowledge base agent CLI
///
/// Signs and dispatches store/query/clear operations against a remote
/// knowledge base deployment.
#[derive(Parser, Debug)]
#[command(name = "kb-agent")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, global = true, env = "KB_AGENT_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store a piece of knowledge
    Store(store::StoreArgs),

    /// Query the knowledge base
    Query(query::QueryArgs),

    /// Clear all data from the knowledge base
    Clear(clear::ClearArgs),

    /// Run a raw request envelope from a JSON file
    Invoke(invoke::InvokeArgs),
}

/// Build a signed inbound envelope from the configured identity
pub(crate) fn build_request(
    config: &Config,
    func_name: &str,
    func_input_data: Option<Value>,
) -> Result<Value> {
    let consumer_id = config.identity.consumer_id.as_str();
    if consumer_id.is_empty() {
        anyhow::bail!("no consumer id configured. Set identity.consumer_id in config.");
    }
    let credential = config.credential()?;

    Ok(json!({
        "consumer_id": consumer_id,
        "signature": credential.sign_consumer_id(consumer_id),
        "deployment": {
            "name": "kb-agent",
            "kb_deployments": [{ "name": config.node.kb_deployment }]
        },
        "inputs": {
            "func_name": func_name,
            "func_input_data": func_input_data
        }
    }))
}

/// Print the result as pretty JSON; exit status follows the result status
pub(crate) fn print_result(result: UniformResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&result)?);
    if result.is_success() {
        Ok(())
    } else {
        anyhow::bail!(
            "{}",
            result
                .message
                .unwrap_or_else(|| "operation failed".to_string())
        )
    }
}
