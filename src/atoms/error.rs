// ── Oracle Atoms: Error Types ──────────────────────────────────────────────
// Single canonical error enum for the engine, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by domain (I/O, DB, Provider, Config…).
//   • The `#[from]` attribute wires std/external error conversions automatically.
//   • Admission rejections are NOT errors — see `types::Rejection`.
//   • No variant carries secret material (API keys) in its message.

use crate::atoms::traits::ProviderError;
use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    /// Filesystem or OS-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML config file could not be parsed.
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP / network failure (reqwest layer).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// SQLite / rusqlite database failure. Fatal to the in-flight request.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Generation backend failure (non-secret detail only).
    #[error("Provider error: {provider}: {message}")]
    Provider { provider: String, message: String },

    /// Engine configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller lacks the rights for an administrative operation.
    #[error("Auth error: {0}")]
    Auth(String),

    /// Catch-all for errors that do not yet have a dedicated variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenience constructors ───────────────────────────────────────────────

impl EngineError {
    /// Create a provider error with name and message.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider { provider: provider.into(), message: message.into() }
    }

    /// Short in-character text the transport shows when a request fails.
    /// Never includes the underlying error detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            EngineError::Auth(_) => "🚫 Only the Dungeon Keeper may pull that lever.",
            EngineError::Provider { .. } | EngineError::Network(_) => {
                "🛑 The Oracle coughed on a dust mote. Try again shortly."
            }
            _ => "🕯️ The archives are sealed for a moment. Try again shortly.",
        }
    }
}

impl From<ProviderError> for EngineError {
    fn from(e: ProviderError) -> Self {
        EngineError::provider("generator", e.to_string())
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All engine operations should return this type.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_converts_with_detail() {
        let err: EngineError = ProviderError::Timeout(30).into();
        let text = err.to_string();
        assert!(text.starts_with("Provider error: generator:"));
        assert!(text.contains("30"));
    }

    #[test]
    fn user_message_hides_detail() {
        let err = EngineError::Config("api_key=sk-secret".into());
        assert!(!err.user_message().contains("sk-secret"));
    }

    #[test]
    fn auth_has_distinct_user_message() {
        let auth = EngineError::Auth("nope".into());
        let other = EngineError::Other("x".into());
        assert_ne!(auth.user_message(), other.user_message());
    }
}
