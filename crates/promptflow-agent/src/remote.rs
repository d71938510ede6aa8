//! Model-backed workflow synthesis.
//!
//! The catalog listing and the request flags go into the system prompt, the
//! user's prompt is sent as-is, and the reply is parsed as one workflow
//! document. Any transport, status or parse failure is returned as an error;
//! falling back is the orchestrator's job.

use std::sync::Arc;

use async_trait::async_trait;
use promptflow_catalog::ServiceCatalog;
use promptflow_intent::{IntentError, SynthesisRequest, Synthesizer, WorkflowResult};
use tracing::{debug, info};

use crate::config::RemoteSettings;
use crate::error::{AgentError, Result};
use crate::llm::{ChatRequest, LlmClient, strip_code_fences};

/// Synthesizer that asks a hosted model for the workflow.
#[derive(Debug, Clone)]
pub struct RemoteSynthesizer {
    client: LlmClient,
    catalog: Arc<ServiceCatalog>,
    temperature: f32,
}

impl RemoteSynthesizer {
    pub fn new(client: LlmClient, catalog: Arc<ServiceCatalog>, temperature: f32) -> Self {
        Self {
            client,
            catalog,
            temperature,
        }
    }

    pub fn from_settings(settings: &RemoteSettings, catalog: Arc<ServiceCatalog>) -> Result<Self> {
        Ok(Self::new(settings.client()?, catalog, settings.temperature))
    }

    /// Instructions sent as the system message.
    pub fn system_prompt(&self, request: &SynthesisRequest) -> String {
        let mut requirements = vec![
            "Use only node types from the list above, plus n8n-nodes-base.manualTrigger, \
             n8n-nodes-base.webhook, n8n-nodes-base.scheduleTrigger, \
             n8n-nodes-base.httpRequest, n8n-nodes-base.emailSend, n8n-nodes-base.set \
             and n8n-nodes-base.if."
                .to_owned(),
            "Give every node a realistic parameters object.".to_owned(),
            "Key connections by the source node's name.".to_owned(),
            "Lay nodes out starting at [250, 300], 200px apart horizontally.".to_owned(),
        ];
        if request.include_auth {
            requirements.push(
                "Include authentication setup with credential configuration for every service."
                    .to_owned(),
            );
        }
        if request.include_error_handling {
            requirements.push(
                "Add error handling nodes, retry logic and fallback paths.".to_owned(),
            );
        }
        requirements.push("Write concrete, numbered setup instructions.".to_owned());
        requirements.push("Estimate setup time from the number of nodes and services.".to_owned());

        let requirements = requirements
            .iter()
            .map(|r| format!("- {r}"))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You generate production-ready n8n workflows from plain-language descriptions.\n\n\
             SUPPORTED SERVICES AND NODE TYPES:\n{listing}\n\n\
             REQUIREMENTS:\n{requirements}\n\n\
             Reply with one JSON object of exactly this shape:\n\
             {{\n  \"name\": string,\n  \"description\": string,\n  \"nodeCount\": number,\n  \
             \"estimatedSetupTime\": string,\n  \"triggerType\": string,\n  \"nodes\": [node],\n  \
             \"connections\": object,\n  \"setupInstructions\": [string],\n  \
             \"workflowJson\": {{\"name\": string, \"active\": true, \"nodes\": [node], \"connections\": object}}\n}}",
            listing = self.catalog.prompt_listing(),
        )
    }

    async fn request_workflow(&self, request: &SynthesisRequest) -> Result<WorkflowResult> {
        let chat = ChatRequest::new(self.system_prompt(request), request.prompt.clone())
            .with_temperature(self.temperature)
            .json_mode();

        let response = self.client.chat(&chat).await?;
        debug!(
            model = response.model.as_deref().unwrap_or(self.client.default_model()),
            chars = response.content.len(),
            "remote synthesis reply received"
        );

        parse_workflow_reply(&response.content)
    }
}

/// Parse a model reply into a workflow. Code fences are tolerated; the
/// shape is checked, the content is not.
pub fn parse_workflow_reply(content: &str) -> Result<WorkflowResult> {
    let body = strip_code_fences(content);
    if body.is_empty() {
        return Err(AgentError::LlmParseFailed {
            reason: "empty reply".into(),
        });
    }

    let document: serde_json::Value =
        serde_json::from_str(body).map_err(|e| AgentError::LlmParseFailed {
            reason: format!("reply is not JSON: {e}"),
        })?;

    WorkflowResult::from_document(document).map_err(|e| AgentError::LlmParseFailed {
        reason: e.to_string(),
    })
}

#[async_trait]
impl Synthesizer for RemoteSynthesizer {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> std::result::Result<WorkflowResult, IntentError> {
        let result = self.request_workflow(request).await?;
        info!(
            provider = self.client.provider(),
            nodes = result.node_count,
            "remote synthesis succeeded"
        );
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
