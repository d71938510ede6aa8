//! Archetype dispatch: the fixed workflow patterns the local synthesizer
//! can emit.
//!
//! Selection walks [`ARCHETYPE_RULES`] in order and takes the first rule
//! whose keywords occur in the lowercased prompt; [`Archetype::Generic`] is
//! the default when none match. Building an archetype is a separate,
//! exhaustive `match`, so rule order and graph shape can each be tested on
//! their own.

use promptflow_catalog::{ServiceCatalog, ServiceDefinition};
use promptflow_catalog::node_types::{
    EMAIL_SEND, HTTP_REQUEST, MANUAL_TRIGGER, SCHEDULE_TRIGGER, WEBHOOK,
};
use serde_json::json;

use crate::workflow::{Connections, TriggerKind, WorkflowNode};

/// Layout origin of the first node.
const ORIGIN: [i64; 2] = [250, 300];
/// Horizontal distance between consecutive nodes.
const STEP_X: i64 = 200;
/// Daily at 09:00.
pub const DAILY_CRON: &str = "0 9 * * *";
/// Catalog entry the Slack archetype posts through.
const SLACK_SERVICE: &str = "Slack";
/// How many detected services the generic archetype chains after its
/// trigger.
const GENERIC_MAX_SERVICES: usize = 2;

/// A named trigger+action pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Archetype {
    /// Webhook → email send.
    Email,
    /// Webhook → Slack post.
    Slack,
    /// Daily schedule → HTTP request.
    Scheduled,
    /// Manual trigger → up to two detected services.
    Generic,
}

/// A selection rule: the archetype fires when any keyword occurs in the
/// lowercased prompt.
#[derive(Debug)]
pub struct ArchetypeRule {
    pub archetype: Archetype,
    pub keywords: &'static [&'static str],
}

impl ArchetypeRule {
    fn matches(&self, lowered_prompt: &str) -> bool {
        self.keywords.iter().any(|k| lowered_prompt.contains(k))
    }
}

/// Rules in priority order; first match wins.
pub const ARCHETYPE_RULES: &[ArchetypeRule] = &[
    ArchetypeRule {
        archetype: Archetype::Email,
        keywords: &["email", "mail", "notification"],
    },
    ArchetypeRule {
        archetype: Archetype::Slack,
        keywords: &["slack"],
    },
    ArchetypeRule {
        archetype: Archetype::Scheduled,
        keywords: &["schedule", "daily", "hourly"],
    },
];

/// The nodes, connections and trigger an archetype produced.
#[derive(Debug, Clone)]
pub struct Graph {
    pub trigger: TriggerKind,
    pub nodes: Vec<WorkflowNode>,
    pub connections: Connections,
}

impl Graph {
    /// Lay `nodes` out left to right and chain them linearly.
    fn chain(trigger: TriggerKind, specs: Vec<(String, String, serde_json::Value)>) -> Self {
        let nodes: Vec<WorkflowNode> = specs
            .into_iter()
            .zip(0_i64..)
            .map(|((name, node_type, parameters), i)| {
                WorkflowNode::new(name, node_type, [ORIGIN[0] + i * STEP_X, ORIGIN[1]], parameters)
            })
            .collect();

        let mut connections = Connections::new();
        for pair in nodes.windows(2) {
            connections.link(&pair[0].name, &pair[1].name);
        }

        Self {
            trigger,
            nodes,
            connections,
        }
    }
}

impl Archetype {
    /// Pick the archetype for a prompt. Never fails; falls through to
    /// [`Archetype::Generic`].
    pub fn select(prompt: &str) -> Self {
        let lowered = prompt.to_lowercase();
        ARCHETYPE_RULES
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.archetype)
            .unwrap_or(Self::Generic)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Slack => "slack",
            Self::Scheduled => "scheduled",
            Self::Generic => "generic",
        }
    }

    /// Emit this archetype's graph. Only [`Archetype::Generic`] uses the
    /// detected services; node types come from `catalog` or the core set.
    pub fn build(self, catalog: &ServiceCatalog, detected: &[&ServiceDefinition]) -> Graph {
        match self {
            Self::Email => Graph::chain(
                TriggerKind::Webhook,
                vec![
                    (
                        "Webhook".into(),
                        WEBHOOK.into(),
                        json!({
                            "httpMethod": "POST",
                            "path": "webhook",
                            "responseMode": "onReceived",
                            "responseData": "allEntries"
                        }),
                    ),
                    (
                        "Email Send".into(),
                        EMAIL_SEND.into(),
                        json!({
                            "fromEmail": "noreply@example.com",
                            "toEmail": "user@example.com",
                            "subject": "New Form Submission",
                            "message": "A new form has been submitted."
                        }),
                    ),
                ],
            ),
            Self::Slack => Graph::chain(
                TriggerKind::Webhook,
                vec![
                    (
                        "Webhook".into(),
                        WEBHOOK.into(),
                        json!({"httpMethod": "POST", "path": "webhook"}),
                    ),
                    slack_step(catalog),
                ],
            ),
            Self::Scheduled => Graph::chain(
                TriggerKind::Schedule,
                vec![
                    (
                        "Schedule Trigger".into(),
                        SCHEDULE_TRIGGER.into(),
                        json!({
                            "rule": {
                                "interval": [
                                    {"field": "cronExpression", "expression": DAILY_CRON}
                                ]
                            }
                        }),
                    ),
                    (
                        "HTTP Request".into(),
                        HTTP_REQUEST.into(),
                        json!({"method": "GET", "url": "https://api.example.com/data"}),
                    ),
                ],
            ),
            Self::Generic => {
                let mut specs = vec![("Manual Trigger".into(), MANUAL_TRIGGER.into(), json!({}))];
                specs.extend(
                    detected
                        .iter()
                        .filter_map(|s| {
                            s.default_node_type()
                                .map(|t| (s.name.clone(), t.to_owned(), json!({})))
                        })
                        .take(GENERIC_MAX_SERVICES),
                );
                Graph::chain(TriggerKind::Manual, specs)
            }
        }
    }
}

/// The Slack node, or a plain HTTP post to an incoming webhook when the
/// catalog has no Slack service.
fn slack_step(catalog: &ServiceCatalog) -> (String, String, serde_json::Value) {
    match catalog
        .lookup_by_name(SLACK_SERVICE)
        .and_then(ServiceDefinition::default_node_type)
    {
        Some(node_type) => (
            SLACK_SERVICE.into(),
            node_type.to_owned(),
            json!({
                "operation": "postMessage",
                "channel": "#general",
                "text": "New notification from workflow"
            }),
        ),
        None => (
            SLACK_SERVICE.into(),
            HTTP_REQUEST.into(),
            json!({
                "method": "POST",
                "url": "https://hooks.slack.com/services/YOUR/WEBHOOK/URL",
                "sendBody": true,
                "bodyParameters": {
                    "parameters": [{"name": "text", "value": "New notification from workflow"}]
                }
            }),
        ),
    }
}

impl std::fmt::Display for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
