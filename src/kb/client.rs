//! Knowledge base node client
//!
//! Async HTTP facade for one node. Transport, auth, and node errors surface
//! upward unmodified; the dispatcher owns normalization.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::types::{KbRunInput, KbRunOutput, NodeAck, NodeErrorReply};
use crate::error::{AgentError, Result};
use crate::schemas::KbDeployment;

/// Backend seam for knowledge base calls
///
/// Implemented by [`KbClient`] for real nodes and by stubs in tests.
#[async_trait]
pub trait KbBackend: Send + Sync {
    /// Establish (register or validate) a deployment before first use
    async fn create(&self, deployment: &KbDeployment) -> Result<()>;

    /// Execute one signed envelope and await the node's reply
    async fn run(&self, input: KbRunInput) -> Result<KbRunOutput>;
}

/// HTTP client for a knowledge base node
#[derive(Debug, Clone)]
pub struct KbClient {
    client: Client,
    node_url: Url,
}

impl KbClient {
    /// Create a new client bound to one node URL
    pub fn new(node_url: &str, timeout_secs: u64) -> Result<Self> {
        let node_url = Url::parse(node_url)
            .map_err(|e| AgentError::config(format!("invalid node URL {}: {}", node_url, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { client, node_url })
    }

    /// Build a URL for an endpoint
    fn url(&self, path: &str) -> Result<Url> {
        self.node_url
            .join(path)
            .map_err(|e| AgentError::config(format!("invalid endpoint path {}: {}", path, e)))
    }

    /// Handle response and deserialize
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T> {
        let status = resp.status();

        if !status.is_success() {
            let message = self.extract_error(resp).await;
            return Err(AgentError::backend(format!(
                "node error ({}): {}",
                status, message
            )));
        }

        resp.json().await.map_err(AgentError::from)
    }

    /// Extract error message from response
    async fn extract_error(&self, resp: reqwest::Response) -> String {
        if let Ok(err) = resp.json::<NodeErrorReply>().await {
            err.error
        } else {
            "Unknown error".to_string()
        }
    }
}

#[async_trait]
impl KbBackend for KbClient {
    async fn create(&self, deployment: &KbDeployment) -> Result<()> {
        let url = self.url("kb/create")?;
        debug!(deployment = %deployment.name, "establishing knowledge base deployment");

        let resp = self
            .client
            .post(url)
            .json(&json!({ "kb_deployment": deployment }))
            .send()
            .await?;

        let _: NodeAck = self.handle_response(resp).await?;
        Ok(())
    }

    async fn run(&self, input: KbRunInput) -> Result<KbRunOutput> {
        let url = self.url("kb/run")?;

        let resp = self.client.post(url).json(&input).send().await?;
        self.handle_response(resp).await
    }
}
