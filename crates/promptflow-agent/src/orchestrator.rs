//! Workflow generation orchestrator.
//!
//! Picks the synthesis path, applies the fallback policy and persists the
//! result:
//!
//! 1. With a remote synthesizer configured, optionally enhance the prompt,
//!    then ask the remote side. Both steps share one time budget.
//! 2. On any remote failure (transport, status, parse, timeout) discard it
//!    entirely and run local synthesis on the original prompt.
//! 3. With a user id and a repository, store the result under the original
//!    prompt and copy the assigned id onto it. Storage failures are logged
//!    and otherwise ignored.

use std::sync::Arc;
use std::time::Duration;

use promptflow_catalog::ServiceCatalog;
use promptflow_intent::{LocalSynthesizer, SynthesisRequest, Synthesizer, WorkflowResult};
use promptflow_store::{NewWorkflow, WorkflowRepository};
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_TIMEOUT_SECS, RemoteSettings};
use crate::enhancer::PromptEnhancer;
use crate::error::Result;
use crate::remote::RemoteSynthesizer;

/// Which synthesizer produced a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisSource {
    Remote,
    Local,
}

impl SynthesisSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
        }
    }
}

/// A generated workflow plus how it came to be.
#[derive(Debug, Clone)]
pub struct Generation {
    pub workflow: WorkflowResult,
    pub source: SynthesisSource,
    /// The prompt actually sent to the remote synthesizer, when enhanced.
    pub enhanced_prompt: Option<String>,
}

/// Entry point for workflow generation and prompt enhancement.
pub struct WorkflowOrchestrator {
    local: LocalSynthesizer,
    remote: Option<Arc<dyn Synthesizer>>,
    remote_timeout: Duration,
    enhancer: PromptEnhancer,
    repository: Option<Arc<dyn WorkflowRepository>>,
}

impl std::fmt::Debug for WorkflowOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowOrchestrator")
            .field("remote", &self.remote.as_ref().map(|r| r.name()))
            .field("remote_timeout", &self.remote_timeout)
            .field("enhancer_remote", &self.enhancer.is_remote())
            .field("repository", &self.repository.as_ref().map(|r| r.backend()))
            .finish()
    }
}

impl WorkflowOrchestrator {
    /// Local-only orchestrator without persistence.
    pub fn new(catalog: Arc<ServiceCatalog>) -> Self {
        Self {
            local: LocalSynthesizer::new(catalog),
            remote: None,
            remote_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            enhancer: PromptEnhancer::local(),
            repository: None,
        }
    }

    /// Orchestrator wired from resolved remote settings (or none).
    pub fn from_settings(
        catalog: Arc<ServiceCatalog>,
        settings: Option<&RemoteSettings>,
    ) -> Result<Self> {
        let mut orchestrator = Self::new(Arc::clone(&catalog));
        if let Some(settings) = settings {
            let remote = RemoteSynthesizer::from_settings(settings, catalog)?;
            orchestrator = orchestrator
                .with_remote(Arc::new(remote))
                .with_remote_timeout(settings.timeout)
                .with_enhancer(PromptEnhancer::from_settings(Some(settings))?);
            info!(
                provider = %settings.provider,
                model = %settings.model,
                "remote synthesis enabled"
            );
        }
        Ok(orchestrator)
    }

    pub fn with_remote(mut self, remote: Arc<dyn Synthesizer>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn with_enhancer(mut self, enhancer: PromptEnhancer) -> Self {
        self.enhancer = enhancer;
        self
    }

    pub fn with_repository(mut self, repository: Arc<dyn WorkflowRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn remote_configured(&self) -> bool {
        self.remote.is_some()
    }

    pub fn catalog(&self) -> &Arc<ServiceCatalog> {
        self.local.catalog()
    }

    /// Generate a workflow. Never fails.
    pub async fn generate(&self, request: &SynthesisRequest, user_id: Option<i64>) -> WorkflowResult {
        self.generate_detailed(request, user_id).await.workflow
    }

    /// Like [`WorkflowOrchestrator::generate`], also reporting the path
    /// taken.
    pub async fn generate_detailed(
        &self,
        request: &SynthesisRequest,
        user_id: Option<i64>,
    ) -> Generation {
        let mut generation = match self.try_remote(request).await {
            Some(generation) => generation,
            None => Generation {
                workflow: self.local.synthesize_prompt(&request.prompt),
                source: SynthesisSource::Local,
                enhanced_prompt: None,
            },
        };

        info!(
            source = generation.source.as_str(),
            nodes = generation.workflow.node_count,
            trigger = %generation.workflow.trigger_type,
            "workflow generated"
        );

        if let Some(user_id) = user_id {
            generation.workflow.id = self.persist(&generation.workflow, &request.prompt, user_id).await;
        }

        generation
    }

    /// Enhance a prompt. Never fails and never returns an empty string.
    pub async fn enhance_prompt(&self, prompt: &str) -> String {
        self.enhancer.enhance(prompt).await
    }

    /// Enhancement and remote synthesis share one `remote_timeout` budget.
    async fn try_remote(&self, request: &SynthesisRequest) -> Option<Generation> {
        let remote = self.remote.as_ref()?;

        let attempt = async {
            let enhanced_prompt = if request.enhance_prompt {
                Some(self.enhancer.enhance(&request.prompt).await)
            } else {
                None
            };
            let remote_request = match &enhanced_prompt {
                Some(prompt) => SynthesisRequest {
                    prompt: prompt.clone(),
                    ..request.clone()
                },
                None => request.clone(),
            };
            remote
                .synthesize(&remote_request)
                .await
                .map(|workflow| (workflow, enhanced_prompt))
        };

        match tokio::time::timeout(self.remote_timeout, attempt).await {
            Ok(Ok((workflow, enhanced_prompt))) => Some(Generation {
                workflow,
                source: SynthesisSource::Remote,
                enhanced_prompt,
            }),
            Ok(Err(err)) => {
                warn!(synthesizer = remote.name(), %err, "remote synthesis failed, falling back to local");
                None
            }
            Err(_) => {
                warn!(
                    synthesizer = remote.name(),
                    timeout_ms = self.remote_timeout.as_millis() as u64,
                    enhance = request.enhance_prompt,
                    "remote synthesis timed out, falling back to local"
                );
                None
            }
        }
    }

    /// Store `workflow` for `user_id`; the assigned id, or `None` when
    /// there is no repository or storing failed.
    async fn persist(&self, workflow: &WorkflowResult, prompt: &str, user_id: i64) -> Option<i64> {
        let repository = self.repository.as_ref()?;

        let workflow_json = match serde_json::to_value(&workflow.workflow_json) {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, "could not serialize workflow for storage");
                return None;
            }
        };

        let new = NewWorkflow {
            user_id,
            name: workflow.name.clone(),
            description: workflow.description.clone(),
            prompt: prompt.to_owned(),
            workflow_json,
            node_count: i64::try_from(workflow.node_count).unwrap_or(i64::MAX),
            trigger_type: workflow.trigger_type.to_string(),
            estimated_setup_time: workflow.estimated_setup_time.clone(),
            setup_instructions: workflow.setup_instructions.clone(),
            is_public: false,
        };

        match repository.create(new).await {
            Ok(stored) => {
                debug!(workflow_id = stored.id, user_id, "workflow persisted");
                Some(stored.id)
            }
            Err(err) => {
                warn!(%err, user_id, backend = repository.backend(), "failed to store workflow");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
