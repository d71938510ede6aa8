//! Agent error types.
//!
//! Remote calls and configuration surface errors through [`AgentError`].
//! None of them reach callers of the orchestrator: generation falls back to
//! local synthesis and enhancement falls back to the input prompt.

use promptflow_intent::IntentError;

/// Unified error type for the agent crate.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    // -- LLM errors ----------------------------------------------------------
    /// An HTTP request to the model endpoint failed or returned a non-2xx
    /// status.
    #[error("llm request failed: {reason}")]
    LlmRequestFailed { reason: String },

    /// The model response could not be parsed into the expected format.
    #[error("llm response parse error: {reason}")]
    LlmParseFailed { reason: String },

    /// The API key is missing for a provider that requires one.
    #[error("missing api key for provider: {provider}")]
    MissingApiKey { provider: String },

    // -- Configuration errors ------------------------------------------------
    /// Configuration validation or loading failed.
    #[error("config error: {reason}")]
    ConfigError { reason: String },

    // -- Serialization -------------------------------------------------------
    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the agent crate.
pub type Result<T> = std::result::Result<T, AgentError>;

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        Self::LlmRequestFailed {
            reason: err.to_string(),
        }
    }
}

impl From<AgentError> for IntentError {
    fn from(err: AgentError) -> Self {
        IntentError::SynthesisFailed {
            synthesizer: "remote",
            reason: err.to_string(),
        }
    }
}
