//! Synthesis strategy interface and the deterministic local implementation.
//!
//! A [`Synthesizer`] turns a [`SynthesisRequest`] into a [`WorkflowResult`].
//! The [`LocalSynthesizer`] always succeeds: it detects services in the
//! prompt, selects an [`Archetype`], builds the graph and derives the
//! metadata. Remote implementations live elsewhere and may fail.

use std::sync::Arc;

use async_trait::async_trait;
use promptflow_catalog::ServiceCatalog;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::archetype::Archetype;
use crate::error::Result;
use crate::metadata;
use crate::workflow::WorkflowResult;

/// Everything a synthesizer needs to build one workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    pub prompt: String,
    #[serde(default)]
    pub include_auth: bool,
    #[serde(default)]
    pub include_error_handling: bool,
    #[serde(default)]
    pub enhance_prompt: bool,
}

impl SynthesisRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_auth(mut self, include_auth: bool) -> Self {
        self.include_auth = include_auth;
        self
    }

    pub fn with_error_handling(mut self, include_error_handling: bool) -> Self {
        self.include_error_handling = include_error_handling;
        self
    }

    pub fn with_enhancement(mut self, enhance_prompt: bool) -> Self {
        self.enhance_prompt = enhance_prompt;
        self
    }
}

/// A strategy that produces a workflow from a natural-language request.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &'static str;

    /// Produce a workflow for `request`.
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<WorkflowResult>;
}

// ---------------------------------------------------------------------------
// LocalSynthesizer
// ---------------------------------------------------------------------------

/// Rule-based synthesizer backed by the service catalog.
///
/// Output depends only on the prompt text and the catalog contents; node ids
/// are the one exception and are fresh on every call.
#[derive(Debug, Clone)]
pub struct LocalSynthesizer {
    catalog: Arc<ServiceCatalog>,
}

impl LocalSynthesizer {
    pub fn new(catalog: Arc<ServiceCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<ServiceCatalog> {
        &self.catalog
    }

    /// Synchronous, infallible synthesis.
    ///
    /// The auth and error-handling flags do not change local output.
    pub fn synthesize_prompt(&self, prompt: &str) -> WorkflowResult {
        let detected = self.catalog.detect(prompt);
        let archetype = Archetype::select(prompt);
        let graph = archetype.build(&self.catalog, &detected);

        debug!(
            archetype = %archetype,
            services = detected.len(),
            nodes = graph.nodes.len(),
            "local synthesis"
        );

        let name = metadata::workflow_name(prompt);
        let description = metadata::workflow_description(prompt, &detected);
        let setup_time = metadata::estimated_setup_time(graph.nodes.len(), detected.len());
        let instructions = metadata::setup_instructions(&graph.nodes, &detected);

        WorkflowResult::assemble(
            name,
            description,
            graph.trigger,
            graph.nodes,
            graph.connections,
            setup_time,
            instructions,
        )
    }
}

#[async_trait]
impl Synthesizer for LocalSynthesizer {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<WorkflowResult> {
        Ok(self.synthesize_prompt(&request.prompt))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use promptflow_catalog::{ServiceDefinition, SetupComplexity, is_core_node_type};
    use serde_json::json;

    use super::*;
    use crate::workflow::TriggerKind;

    fn builtin() -> LocalSynthesizer {
        LocalSynthesizer::new(Arc::new(ServiceCatalog::builtin().unwrap()))
    }

    fn names(result: &WorkflowResult) -> Vec<&str> {
        result.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn email_prompt_yields_webhook_to_email() {
        let result = builtin().synthesize_prompt("Send me an email when someone submits my contact form");
        assert_eq!(names(&result), vec!["Webhook", "Email Send"]);
        assert_eq!(result.trigger_type, TriggerKind::Webhook);
        assert_eq!(
            serde_json::to_value(&result.connections).unwrap(),
            json!({"Webhook": {"main": [[{"node": "Email Send", "type": "main", "index": 0}]]}})
        );
        assert!(result.setup_instructions.iter().any(|s| s.contains("SMTP")));
        assert!(result.setup_instructions.iter().any(|s| s.contains("webhook URL")));
    }

    #[test]
    fn slack_prompt_yields_webhook_to_slack() {
        let result = builtin().synthesize_prompt("Notify my team in Slack every time we get a new signup");
        assert_eq!(names(&result), vec!["Webhook", "Slack"]);
        assert_eq!(result.trigger_type, TriggerKind::Webhook);
        assert_eq!(result.nodes[1].parameters["channel"], "#general");
        assert!(result.description.ends_with("(Uses: Slack)"));
        assert!(
            result
                .setup_instructions
                .contains(&"3. Configure Slack credentials in n8n settings".to_owned())
        );
    }

    #[test]
    fn daily_prompt_yields_schedule_to_http() {
        let result = builtin().synthesize_prompt("Run a daily report at 9am");
        assert_eq!(names(&result), vec!["Schedule Trigger", "HTTP Request"]);
        assert_eq!(result.trigger_type, TriggerKind::Schedule);
        assert_eq!(
            result.nodes[0].parameters["rule"]["interval"][0]["expression"],
            "0 9 * * *"
        );
    }

    #[test]
    fn unmatched_prompt_is_a_lone_manual_trigger() {
        let result = builtin().synthesize_prompt("Automate my workflow");
        assert_eq!(names(&result), vec!["Manual Trigger"]);
        assert_eq!(result.trigger_type, TriggerKind::Manual);
        assert!(result.connections.is_empty());
        assert_eq!(serde_json::to_value(&result.connections).unwrap(), json!({}));
        assert_eq!(result.name, "Automate My Workflow");
        assert_eq!(result.estimated_setup_time, "7 minutes");
    }

    #[test]
    fn generic_prompt_chains_first_two_detected_services() {
        let result = builtin().synthesize_prompt("Add new Stripe customers to HubSpot and Airtable");
        assert_eq!(names(&result), vec!["Manual Trigger", "Stripe", "Airtable"]);
        assert_eq!(result.nodes[1].node_type, "n8n-nodes-base.stripe");
        assert_eq!(result.nodes[2].position, json!([650, 300]));
        assert_eq!(result.connections.targets("Stripe")[0].node, "Airtable");
        // All three services still count towards setup time and credentials.
        assert_eq!(result.estimated_setup_time, "20 minutes");
        assert!(result.description.contains("HubSpot"));
    }

    #[test]
    fn output_is_deterministic_apart_from_ids() {
        let synth = builtin();
        let prompt = "Create a new Trello card from a GitHub issue";
        let mut a = serde_json::to_value(synth.synthesize_prompt(prompt)).unwrap();
        let mut b = serde_json::to_value(synth.synthesize_prompt(prompt)).unwrap();
        for doc in [&mut a, &mut b] {
            for node in doc["nodes"].as_array_mut().unwrap() {
                node["id"] = json!("");
            }
            for node in doc["workflowJson"]["nodes"].as_array_mut().unwrap() {
                node["id"] = json!("");
            }
        }
        assert_eq!(a, b);
    }

    fn acme_catalog() -> ServiceCatalog {
        ServiceCatalog::new(vec![ServiceDefinition {
            name: "Acme".into(),
            node_types: vec!["n8n-nodes-base.acme".into()],
            category: "Testing".into(),
            description: "Fake service".into(),
            auth_required: false,
            use_cases: vec![],
            complexity: SetupComplexity::Low,
        }])
        .unwrap()
    }

    fn assert_invariants(synth: &LocalSynthesizer) {
        let prompts = [
            "Send me an email when someone submits my contact form",
            "Notify my team in Slack every time we get a new signup",
            "Post a slack message when acme orders",
            "Run a daily report at 9am",
            "Automate my workflow",
            "Create a new Trello card from a GitHub issue",
            "Add new Stripe customers to HubSpot and Airtable",
            "",
            "héllo wörld ünïcode",
        ];
        let catalog = synth.catalog().clone();
        for prompt in prompts {
            let result = synth.synthesize_prompt(prompt);
            assert_eq!(result.node_count, result.nodes.len(), "{prompt}");
            assert!(result.check_graph().is_ok(), "{prompt}");
            assert_eq!(result.workflow_json.nodes, result.nodes);
            assert!(result.workflow_json.active);
            for node in &result.nodes {
                let known = is_core_node_type(&node.node_type)
                    || catalog
                        .services()
                        .iter()
                        .any(|s| s.node_types.contains(&node.node_type));
                assert!(known, "unexpected node type {} for {prompt:?}", node.node_type);
            }
        }
    }

    #[test]
    fn invariants_hold_across_prompts() {
        assert_invariants(&builtin());
    }

    #[test]
    fn invariants_hold_with_a_fabricated_catalog() {
        assert_invariants(&LocalSynthesizer::new(Arc::new(acme_catalog())));
        assert_invariants(&LocalSynthesizer::new(Arc::new(
            ServiceCatalog::new(Vec::new()).unwrap(),
        )));
    }

    #[test]
    fn works_with_a_fabricated_catalog() {
        let synth = LocalSynthesizer::new(Arc::new(acme_catalog()));
        let result = synth.synthesize_prompt("Push orders into acme");
        assert_eq!(names(&result), vec!["Manual Trigger", "Acme"]);
        assert!(!result.setup_instructions.iter().any(|s| s.contains("credentials")));

        let slack = synth.synthesize_prompt("Post a slack message when acme orders");
        assert_eq!(names(&slack), vec!["Webhook", "Slack"]);
        assert_eq!(slack.nodes[1].node_type, promptflow_catalog::node_types::HTTP_REQUEST);
    }

    #[tokio::test]
    async fn trait_object_delegates_to_local_synthesis() {
        let synth: Arc<dyn Synthesizer> = Arc::new(builtin());
        let request = SynthesisRequest::new("Run a daily report at 9am")
            .with_auth(true)
            .with_error_handling(true);
        let result = synth.synthesize(&request).await.unwrap();
        assert_eq!(synth.name(), "local");
        assert_eq!(result.trigger_type, TriggerKind::Schedule);
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let request: SynthesisRequest =
            serde_json::from_value(json!({"prompt": "Automate my workflow"})).unwrap();
        assert!(!request.include_auth);
        assert!(!request.enhance_prompt);
    }
}
