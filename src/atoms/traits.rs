// ── Oracle Atoms: Collaborator Traits ──────────────────────────────────────
// The generation backend is the only external service the engine calls.
// Implementations live in engine/providers/; tests supply scripted ones.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One generation call: system framing, user content and the sampling
/// temperature the chaos meter picked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub system_context: String,
    pub user_context: String,
    pub temperature: f64,
}

/// Generated text plus the token cost pair recorded on the interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("rate limited by provider: {message}")]
    RateLimited { message: String, retry_after_secs: Option<u64> },

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("no reply within {0}s")]
    Timeout(u64),

    #[error("provider returned no text")]
    EmptyResponse,
}

#[async_trait]
pub trait Generator: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError>;
}
