//! Request and response schemas
//!
//! Typed shapes for inbound agent requests and the normalized results the
//! agent hands back. Everything here is built per request, validated once,
//! and dropped when the call completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AgentError, Result};

// ============== Inbound Envelope ==============

/// Named call inputs carried by both inbound requests and node envelopes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallInputs {
    pub func_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func_input_data: Option<Value>,
}

/// Deployment descriptor for one knowledge base instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbDeployment {
    pub name: String,
    /// Node address override; falls back to the configured node when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_url: Option<String>,
}

/// Agent-level deployment, carrying the knowledge base sub-deployments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDeployment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub kb_deployments: Vec<KbDeployment>,
}

impl AgentDeployment {
    /// The knowledge base sub-deployment calls are narrowed to (the first one)
    pub fn primary_kb(&self) -> Result<&KbDeployment> {
        self.kb_deployments
            .first()
            .ok_or_else(|| AgentError::validation("deployment has no kb_deployments"))
    }
}

/// Top-level inbound request envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRunInput {
    pub consumer_id: String,
    pub deployment: AgentDeployment,
    pub signature: String,
    pub inputs: CallInputs,
}

impl AgentRunInput {
    /// Check the outer shape before any operation is dispatched
    pub fn validate(&self) -> Result<()> {
        if self.consumer_id.trim().is_empty() {
            return Err(AgentError::validation("consumer_id must not be empty"));
        }
        if self.signature.trim().is_empty() {
            return Err(AgentError::validation("signature must not be empty"));
        }
        Ok(())
    }
}

// ============== Operation Payloads ==============

/// Payload for the `store` operation
///
/// `text` is the canonical field name; `content` is accepted as a legacy
/// alias for older callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorePayload {
    #[serde(alias = "content")]
    pub text: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl StorePayload {
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(AgentError::validation(
                "store payload field `text` must be a non-empty string",
            ));
        }
        Ok(())
    }
}

fn default_top_k() -> u32 {
    2
}

/// Payload for the `query` operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPayload {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
}

impl QueryPayload {
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(AgentError::validation(
                "query payload field `query` must be a non-empty string",
            ));
        }
        if self.top_k == 0 {
            return Err(AgentError::validation(
                "query payload field `top_k` must be a positive integer",
            ));
        }
        Ok(())
    }
}

// ============== Response Shapes ==============

/// One knowledge hit as returned by the node, passed through unmodified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub chunk: String,
    pub chunk_start: i64,
    pub chunk_end: i64,
    pub full_text: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Innermost shape of the node's search reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHits {
    pub data: Vec<KnowledgeItem>,
}

/// Normalized result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Error,
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultStatus::Success => write!(f, "success"),
            ResultStatus::Error => write!(f, "error"),
        }
    }
}

/// The single normalized response shape returned to every caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniformResult {
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Ordered knowledge hits, most relevant first (query only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<KnowledgeItem>>,
    /// Operation-specific fields surfaced from the node reply (e.g. `id`)
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl UniformResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Error,
            message: Some(message.into()),
            results: None,
            data: Map::new(),
        }
    }

    /// Success carrying node reply fields (store/clear reshape)
    pub fn success_with_data(message: Option<String>, data: Map<String, Value>) -> Self {
        Self {
            status: ResultStatus::Success,
            message,
            results: None,
            data,
        }
    }

    /// Success carrying ordered knowledge hits (query reshape)
    pub fn query_hits(results: Vec<KnowledgeItem>) -> Self {
        Self {
            status: ResultStatus::Success,
            message: None,
            results: Some(results),
            data: Map::new(),
        }
    }

    /// Success with zero hits; not an error, carries an explanatory message
    pub fn empty_query(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Success,
            message: Some(message.into()),
            results: Some(Vec::new()),
            data: Map::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}
