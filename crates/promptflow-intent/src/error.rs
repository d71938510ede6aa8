//! Synthesis error types.
//!
//! The local synthesizer never fails; these variants describe failures of
//! other [`crate::Synthesizer`] implementations so the orchestrator can log
//! them before falling back.

/// Unified error type for workflow synthesis.
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    // -- Synthesis errors ----------------------------------------------------
    /// A synthesizer could not produce a workflow.
    #[error("{synthesizer} synthesis failed: {reason}")]
    SynthesisFailed {
        synthesizer: &'static str,
        reason: String,
    },

    /// A synthesizer did not answer within its time budget.
    #[error("{synthesizer} synthesis timed out after {timeout_ms} ms")]
    TimedOut {
        synthesizer: &'static str,
        timeout_ms: u64,
    },

    /// A synthesized document did not have the workflow shape.
    #[error("malformed workflow document: {reason}")]
    MalformedWorkflow { reason: String },

    // -- Serialization -------------------------------------------------------
    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the intent crate.
pub type Result<T> = std::result::Result<T, IntentError>;
