//! Node wire types
//!
//! DTOs for knowledge base node communication, plus the typed decode of the
//! node's nested search reply.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AgentError, Result};
use crate::schemas::{CallInputs, KbDeployment, KnowledgeItem, QueryHits};

// ============== Envelope Types ==============

/// Signed call envelope sent to the node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbRunInput {
    pub consumer_id: String,
    pub inputs: CallInputs,
    pub deployment: KbDeployment,
    pub signature: String,
}

/// Reply from the node for one executed envelope
///
/// `results` rows arrive JSON-encoded; any other top-level reply fields
/// (`id`, ...) are collected in `extra` and surfaced by the reshape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbRunOutput {
    pub status: String,
    #[serde(default)]
    pub results: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outer shape of one search result row
#[derive(Debug, Clone, Deserialize)]
struct SearchRows {
    results: Vec<String>,
}

impl KbRunOutput {
    /// Older nodes report `completed`, newer ones `success`; both count.
    pub fn is_success(&self) -> bool {
        matches!(self.status.as_str(), "completed" | "success")
    }

    /// Decode the nested search reply into knowledge hits.
    ///
    /// The node encodes search results as a JSON row whose `results` entries
    /// are themselves JSON-encoded hit payloads. Each level is decoded
    /// against its declared shape and fails loudly on mismatch.
    pub fn knowledge_hits(&self) -> Result<Vec<KnowledgeItem>> {
        let row = self
            .results
            .first()
            .ok_or_else(|| AgentError::decode("reply carried no result rows"))?;
        let rows: SearchRows = serde_json::from_str(row)
            .map_err(|e| AgentError::decode(format!("malformed search reply row: {}", e)))?;
        let payload = rows
            .results
            .first()
            .ok_or_else(|| AgentError::decode("search reply row carried no hit payload"))?;
        let hits: QueryHits = serde_json::from_str(payload)
            .map_err(|e| AgentError::decode(format!("malformed search hit payload: {}", e)))?;
        Ok(hits.data)
    }
}

// ============== Node Auxiliary Types ==============

/// Acknowledgement for a deployment create/validate call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeAck {
    #[serde(default)]
    pub status: Option<String>,
}

/// Error body the node attaches to non-success HTTP statuses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeErrorReply {
    pub error: String,
    #[serde(default)]
    pub details: Option<String>,
}
