//! Prompt enhancement.
//!
//! With a remote endpoint configured the model rewrites the prompt into a
//! more detailed automation description; a failed or empty reply yields the
//! original prompt. Without one, a fixed best-practice suggestion is
//! appended locally. Enhancement never fails and never returns an empty
//! string.

use tracing::{debug, warn};

use crate::config::{DEFAULT_ENHANCE_MAX_TOKENS, RemoteSettings};
use crate::error::Result;
use crate::llm::{ChatRequest, LlmClient};

/// Suggestions appended by local enhancement.
pub const LOCAL_SUGGESTIONS: [&str; 5] = [
    "Include proper error handling and validation",
    "Add logging for debugging purposes",
    "Consider rate limiting for API calls",
    "Include authentication where necessary",
    "Add data validation and sanitization",
];

const CONSULTANT_PROMPT: &str = "\
You are an n8n automation consultant. Rewrite the user's automation request into a \
detailed, production-ready specification.

Rules:
1. Preserve the original intent; never change what the user wants.
2. Name the trigger, each processing step and the data flowing between them.
3. Name the specific services involved (e.g. Gmail, Slack, Stripe, Google Sheets, \
Airtable, HubSpot, GitHub, Notion, Trello).
4. Add data validation, error handling, retries and rate limiting where they matter.
5. Mention authentication and permission requirements.
6. Mention logging, monitoring or notifications on failure.

Reply with the rewritten specification only, as plain text.";

/// Local, deterministic enhancement: the same prompt always gets the same
/// suggestion.
pub fn enhance_locally(prompt: &str) -> String {
    let hash = prompt
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
    // Lossless: the modulus is below `usize::MAX` on every target.
    let suggestion = LOCAL_SUGGESTIONS[(hash % LOCAL_SUGGESTIONS.len() as u64) as usize];
    format!("{prompt}\n\nAdditional considerations: {suggestion}")
}

/// Rewrites prompts, remotely when possible.
#[derive(Debug, Clone, Default)]
pub struct PromptEnhancer {
    remote: Option<RemoteEnhancer>,
}

#[derive(Debug, Clone)]
struct RemoteEnhancer {
    client: LlmClient,
    temperature: f32,
    max_tokens: u32,
}

impl PromptEnhancer {
    /// Local-only enhancer.
    pub fn local() -> Self {
        Self::default()
    }

    /// Enhancer backed by `client`.
    pub fn remote(client: LlmClient, temperature: f32) -> Self {
        Self {
            remote: Some(RemoteEnhancer {
                client,
                temperature,
                max_tokens: DEFAULT_ENHANCE_MAX_TOKENS,
            }),
        }
    }

    /// Remote when `settings` is present, local otherwise.
    pub fn from_settings(settings: Option<&RemoteSettings>) -> Result<Self> {
        match settings {
            Some(s) => Ok(Self {
                remote: Some(RemoteEnhancer {
                    client: s.client()?,
                    temperature: s.temperature,
                    max_tokens: s.enhance_max_tokens,
                }),
            }),
            None => Ok(Self::local()),
        }
    }

    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Enhance `prompt`. Always returns a non-empty string.
    pub async fn enhance(&self, prompt: &str) -> String {
        let Some(remote) = &self.remote else {
            return enhance_locally(prompt);
        };

        let request = ChatRequest::new(
            CONSULTANT_PROMPT,
            format!(
                "Transform this automation request into a comprehensive, \
                 production-ready specification: \"{prompt}\""
            ),
        )
        .with_temperature(remote.temperature)
        .with_max_tokens(remote.max_tokens);

        match remote.client.chat(&request).await {
            Ok(response) if !response.content.trim().is_empty() => {
                debug!(chars = response.content.len(), "prompt enhanced remotely");
                response.content.trim().to_owned()
            }
            Ok(_) => {
                warn!("remote enhancement returned an empty reply, keeping original prompt");
                non_empty_or_local(prompt)
            }
            Err(err) => {
                warn!(%err, "remote enhancement failed, keeping original prompt");
                non_empty_or_local(prompt)
            }
        }
    }
}

fn non_empty_or_local(prompt: &str) -> String {
    if prompt.trim().is_empty() {
        enhance_locally(prompt)
    } else {
        prompt.to_owned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
