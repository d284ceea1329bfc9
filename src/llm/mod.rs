// LLM boundary - the single seam between the engine and provider backends
//
// The engine never talks to a provider directly; it goes through `LlmClient`,
// which callers implement over whatever transport they have. Calls are
// synchronous from the engine's perspective.

use thiserror::Error;

use crate::models::{MessageRole, Provider};

/// Why a provider call failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Network error calling {provider}: {detail}")]
    Network { provider: Provider, detail: String },

    #[error("Authentication failed for {provider}")]
    Auth { provider: Provider },

    #[error("Rate limited by {provider}")]
    RateLimited { provider: Provider },

    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: Provider },
}

impl ProviderError {
    /// Whether retrying the same call later could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Network { .. } | ProviderError::RateLimited { .. }
        )
    }
}

/// One chat turn sent to a provider
#[derive(Debug, Clone, PartialEq)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub content: String,
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Tuning knobs for one call
#[derive(Debug, Clone, PartialEq)]
pub struct CallOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

/// Raw provider reply
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub content: String,
    /// Concrete model identifier the backend used, when it reports one
    pub model: Option<String>,
}

/// Provider-call abstraction the engine depends on
pub trait LlmClient {
    fn call(
        &self,
        provider: Provider,
        messages: &[LlmMessage],
        options: &CallOptions,
    ) -> Result<LlmResponse, ProviderError>;
}
