//! kb-agent - Knowledge Base Agent
//!
//! A thin agent that fronts a remote knowledge base deployment: it validates
//! typed store/query/clear requests, wraps them in signed call envelopes,
//! forwards them to the knowledge base node, and normalizes every outcome
//! into a single result shape.
//!
//! # Architecture
//!
//! - **Schemas**: typed inbound envelope and operation payloads
//! - **Dispatcher**: [`KnowledgeBaseAgent`] - validate, sign, invoke, reshape
//! - **Facade**: [`KbClient`] - HTTP binding to one node
//! - **Entry point**: [`run`] - routes a raw request and never leaks a fault
//!
//! The agent owns no storage, embedding, or ranking logic; those belong to
//! the node it calls.

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod kb;
pub mod schemas;
pub mod signing;

pub use agent::{run, run_with_backend, run_with_config, KnowledgeBaseAgent, Operation};
pub use config::Config;
pub use error::{AgentError, Result};
pub use kb::{KbBackend, KbClient, KbRunInput, KbRunOutput};
pub use schemas::{
    AgentRunInput, KbDeployment, KnowledgeItem, QueryPayload, ResultStatus, StorePayload,
    UniformResult,
};
pub use signing::ConsumerCredential;
