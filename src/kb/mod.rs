//! Knowledge base node module
//!
//! Wire types and the HTTP facade for the remote knowledge base node.

mod client;
pub mod types;

pub use client::{KbBackend, KbClient};
pub use types::{KbRunInput, KbRunOutput};
