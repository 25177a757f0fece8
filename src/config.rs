//! Configuration module
//!
//! Locates the knowledge base node and the process signing identity. Both
//! are opaque to the dispatch layer; they only exist so the CLI can build
//! envelopes and the facade knows where to send them.

use std::path::Path;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::signing::ConsumerCredential;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub node: NodeConfig,

    #[serde(default)]
    pub identity: IdentityConfig,
}

/// Knowledge base node settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node URL (e.g., "http://localhost:7001")
    #[serde(default = "default_node_url")]
    pub url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Name of the knowledge base sub-deployment CLI envelopes target
    #[serde(default = "default_kb_deployment")]
    pub kb_deployment: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            url: default_node_url(),
            timeout_secs: default_timeout_secs(),
            kb_deployment: default_kb_deployment(),
        }
    }
}

fn default_node_url() -> String {
    "http://localhost:7001".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_kb_deployment() -> String {
    "market_kb".to_string()
}

/// Consumer identity used to sign outbound envelopes
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdentityConfig {
    #[serde(default)]
    pub consumer_id: String,

    /// Base64-encoded Ed25519 seed
    #[serde(default)]
    pub private_key: Option<String>,
}

impl Config {
    /// Load config from `KB_AGENT_CONFIG` or the platform config directory.
    ///
    /// A missing file yields defaults.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var("KB_AGENT_CONFIG") {
            return Self::load_from(Path::new(&path));
        }

        let Some(dirs) = ProjectDirs::from("", "", "kb-agent") else {
            return Ok(Self::default());
        };
        let path = dirs.config_dir().join("config.toml");
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AgentError::config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&raw).map_err(|e| {
            AgentError::config(format!("cannot parse config {}: {}", path.display(), e))
        })
    }

    /// The process signing credential.
    ///
    /// `KB_AGENT_PRIVATE_KEY` takes precedence over the config file.
    pub fn credential(&self) -> Result<ConsumerCredential> {
        if let Ok(key) = std::env::var("KB_AGENT_PRIVATE_KEY") {
            return ConsumerCredential::from_base64(&key);
        }
        let key = self.identity.private_key.as_deref().ok_or_else(|| {
            AgentError::config(
                "no signing key configured. Set identity.private_key or KB_AGENT_PRIVATE_KEY.",
            )
        })?;
        ConsumerCredential::from_base64(key)
    }
}
