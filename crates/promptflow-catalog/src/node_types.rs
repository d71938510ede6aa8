//! Core node-type vocabulary.
//!
//! Generated workflows may only use node types that either belong to a
//! catalog service or appear in [`CORE_NODE_TYPES`].

use serde::Serialize;

use crate::catalog::{DEFAULT_POPULAR_LIMIT, ServiceCatalog};

pub const MANUAL_TRIGGER: &str = "n8n-nodes-base.manualTrigger";
pub const WEBHOOK: &str = "n8n-nodes-base.webhook";
pub const SCHEDULE_TRIGGER: &str = "n8n-nodes-base.scheduleTrigger";
pub const HTTP_REQUEST: &str = "n8n-nodes-base.httpRequest";
pub const EMAIL_SEND: &str = "n8n-nodes-base.emailSend";
pub const SET: &str = "n8n-nodes-base.set";
pub const IF: &str = "n8n-nodes-base.if";

/// A node type with display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeTypeInfo {
    /// Display name.
    pub name: String,
    /// Dotted node type identifier.
    #[serde(rename = "type")]
    pub node_type: String,
    pub category: String,
    pub description: String,
}

/// Built-in node types: `(type, display name, category, description)`.
pub const CORE_NODE_TYPES: &[(&str, &str, &str, &str)] = &[
    (
        MANUAL_TRIGGER,
        "Manual Trigger",
        "Trigger",
        "Starts the workflow when run by hand",
    ),
    (
        WEBHOOK,
        "Webhook",
        "Trigger",
        "Starts the workflow on an incoming HTTP request",
    ),
    (
        SCHEDULE_TRIGGER,
        "Schedule Trigger",
        "Trigger",
        "Starts the workflow on a cron schedule",
    ),
    (
        HTTP_REQUEST,
        "HTTP Request",
        "Core",
        "Calls any HTTP API",
    ),
    (
        EMAIL_SEND,
        "Email Send",
        "Core",
        "Sends an email over SMTP",
    ),
    (SET, "Set", "Core", "Sets or transforms item fields"),
    (IF, "IF", "Core", "Routes items by a condition"),
];

/// Whether `node_type` is one of the built-in core types.
pub fn is_core_node_type(node_type: &str) -> bool {
    CORE_NODE_TYPES.iter().any(|(t, ..)| *t == node_type)
}

/// Core node types followed by the canonical node type of every popular
/// service.
pub fn popular_node_types(catalog: &ServiceCatalog) -> Vec<NodeTypeInfo> {
    let core = CORE_NODE_TYPES
        .iter()
        .map(|(node_type, name, category, description)| NodeTypeInfo {
            name: (*name).to_owned(),
            node_type: (*node_type).to_owned(),
            category: (*category).to_owned(),
            description: (*description).to_owned(),
        });

    let services = catalog
        .list_popular(DEFAULT_POPULAR_LIMIT)
        .into_iter()
        .filter_map(|service| {
            service.default_node_type().map(|node_type| NodeTypeInfo {
                name: service.name.clone(),
                node_type: node_type.to_owned(),
                category: service.category.clone(),
                description: service.description.clone(),
            })
        });

    core.chain(services).collect()
}
