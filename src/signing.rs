//! Consumer identity signing
//!
//! Every envelope sent to the node carries the consumer id and an Ed25519
//! signature over it. The credential is an explicitly constructed value
//! threaded into the agent, never process-global state, so tests can inject
//! a fixed seed.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH};

use crate::error::{AgentError, Result};

/// Signing credential for one consumer identity
#[derive(Clone)]
pub struct ConsumerCredential {
    key: SigningKey,
}

impl std::fmt::Debug for ConsumerCredential {
    // never print key material
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerCredential").finish_non_exhaustive()
    }
}

impl ConsumerCredential {
    pub fn from_seed(seed: [u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            key: SigningKey::from_bytes(&seed),
        }
    }

    /// Load a credential from a base64-encoded Ed25519 seed
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| AgentError::signing(format!("signing key is not valid base64: {}", e)))?;
        let seed: [u8; SECRET_KEY_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
            AgentError::signing(format!(
                "signing key must be {} bytes, got {}",
                SECRET_KEY_LENGTH,
                bytes.len()
            ))
        })?;
        Ok(Self::from_seed(seed))
    }

    /// Sign a consumer id, returning the base64 signature for the envelope
    pub fn sign_consumer_id(&self, consumer_id: &str) -> String {
        BASE64.encode(self.key.sign(consumer_id.as_bytes()).to_bytes())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }
}

/// Check a base64 envelope signature against a consumer id
pub fn verify_consumer_id(consumer_id: &str, signature: &str, key: &VerifyingKey) -> Result<()> {
    let bytes = BASE64
        .decode(signature)
        .map_err(|e| AgentError::signing(format!("signature is not valid base64: {}", e)))?;
    let signature = Signature::from_slice(&bytes)
        .map_err(|e| AgentError::signing(format!("malformed signature: {}", e)))?;
    key.verify(consumer_id.as_bytes(), &signature)
        .map_err(|_| AgentError::signing("signature does not match consumer id"))
}
