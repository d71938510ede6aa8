//! Remote model configuration.
//!
//! The provider is chosen from the environment: `OPENROUTER_API_KEY` wins
//! over `OPENAI_API_KEY`; with neither set there is no remote path. Model,
//! endpoint and sampling settings can be overridden from the `[remote]`
//! section of the configuration file.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::llm::{LlmClient, LlmClientConfig};

pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_ENHANCE_MAX_TOKENS: u32 = 1500;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A supported hosted endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteProvider {
    OpenRouter,
    OpenAi,
}

impl RemoteProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenRouter => "openrouter",
            Self::OpenAi => "openai",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::OpenAi => "https://api.openai.com/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenRouter => "anthropic/claude-3.5-sonnet",
            Self::OpenAi => "gpt-4o",
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::OpenRouter => OPENROUTER_API_KEY_ENV,
            Self::OpenAi => OPENAI_API_KEY_ENV,
        }
    }
}

impl std::fmt::Display for RemoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional file-level overrides. Secrets are never read from here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteOverrides {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved remote settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSettings {
    pub provider: RemoteProvider,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub enhance_max_tokens: u32,
    /// Budget for a whole remote call, enforced by the orchestrator.
    pub timeout: Duration,
}

impl RemoteSettings {
    /// Resolve from the process environment.
    pub fn from_env(overrides: &RemoteOverrides) -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), overrides)
    }

    /// Resolve using `lookup` for environment access. Blank values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F, overrides: &RemoteOverrides) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key_for = |provider: RemoteProvider| {
            lookup(provider.api_key_env())
                .map(|k| k.trim().to_owned())
                .filter(|k| !k.is_empty())
                .map(|k| (provider, k))
        };

        let Some((provider, api_key)) =
            key_for(RemoteProvider::OpenRouter).or_else(|| key_for(RemoteProvider::OpenAi))
        else {
            debug!("no remote API key configured");
            return None;
        };

        Some(Self {
            provider,
            api_key,
            base_url: overrides
                .base_url
                .clone()
                .unwrap_or_else(|| provider.default_base_url().to_owned()),
            model: overrides
                .model
                .clone()
                .unwrap_or_else(|| provider.default_model().to_owned()),
            temperature: overrides.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: overrides.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            enhance_max_tokens: DEFAULT_ENHANCE_MAX_TOKENS,
            timeout: Duration::from_secs(overrides.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        })
    }

    /// Build an HTTP client for these settings.
    pub fn client(&self) -> Result<LlmClient> {
        let mut config = LlmClientConfig::new(
            self.provider.as_str(),
            self.api_key.clone(),
            self.base_url.clone(),
            self.model.clone(),
        );
        config.max_tokens = self.max_tokens;
        // The orchestrator's timeout is the binding one; keep the transport
        // limit just above it.
        config.timeout = self.timeout + Duration::from_secs(5);
        LlmClient::new(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn no_keys_means_no_remote() {
        assert!(RemoteSettings::from_lookup(env(&[]), &RemoteOverrides::default()).is_none());
        assert!(
            RemoteSettings::from_lookup(env(&[(OPENAI_API_KEY_ENV, "  ")]), &RemoteOverrides::default())
                .is_none()
        );
    }

    #[test]
    fn openrouter_wins_over_openai() {
        let settings = RemoteSettings::from_lookup(
            env(&[(OPENAI_API_KEY_ENV, "sk-openai"), (OPENROUTER_API_KEY_ENV, "sk-or")]),
            &RemoteOverrides::default(),
        )
        .unwrap();
        assert_eq!(settings.provider, RemoteProvider::OpenRouter);
        assert_eq!(settings.api_key, "sk-or");
        assert_eq!(settings.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(settings.model, "anthropic/claude-3.5-sonnet");
    }

    #[test]
    fn openai_defaults() {
        let settings = RemoteSettings::from_lookup(
            env(&[(OPENAI_API_KEY_ENV, "sk-openai")]),
            &RemoteOverrides::default(),
        )
        .unwrap();
        assert_eq!(settings.provider, RemoteProvider::OpenAi);
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.enhance_max_tokens, 1500);
    }

    #[test]
    fn overrides_apply() {
        let overrides = RemoteOverrides {
            model: Some("gpt-4o-mini".into()),
            base_url: Some("http://127.0.0.1:9999/v1".into()),
            temperature: Some(0.2),
            max_tokens: Some(2000),
            timeout_secs: Some(5),
        };
        let settings =
            RemoteSettings::from_lookup(env(&[(OPENAI_API_KEY_ENV, "k")]), &overrides).unwrap();
        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.base_url, "http://127.0.0.1:9999/v1");
        assert_eq!(settings.max_tokens, 2000);
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.client().unwrap().default_model(), "gpt-4o-mini");
    }
}
