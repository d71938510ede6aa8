//! Workflow data model: nodes, connections, and the generation result.
//!
//! The JSON shapes produced here are the import format of the workflow
//! engine: nodes carry a dotted `type`, connections are keyed by the source
//! node's display name, and each source maps port names (normally `"main"`)
//! to a list of outputs, each output being a list of targets.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{IntentError, Result};

/// The port name used for ordinary data flow.
pub const MAIN_PORT: &str = "main";

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// How a generated workflow is started; reflects the first node's role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// Run by hand from the editor.
    #[default]
    Manual,
    /// Started by an incoming HTTP request.
    Webhook,
    /// Started on a timer.
    Schedule,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "Manual",
            Self::Webhook => "Webhook",
            Self::Schedule => "Schedule",
        }
    }

    /// Map a free-form trigger label onto a kind.
    ///
    /// Labels mentioning webhooks map to `Webhook`, labels mentioning
    /// schedules, cron or intervals map to `Schedule`, everything else is
    /// `Manual`.
    pub fn from_label(label: &str) -> Self {
        let lowered = label.to_lowercase();
        if lowered.contains("webhook") {
            Self::Webhook
        } else if ["schedule", "cron", "interval"]
            .iter()
            .any(|k| lowered.contains(k))
        {
            Self::Schedule
        } else {
            Self::Manual
        }
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TriggerKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TriggerKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn origin_position() -> Value {
    Value::from(vec![0, 0])
}

/// One step in a generated workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// Opaque identifier, unique within the workflow.
    #[serde(default)]
    pub id: String,

    /// Display label; connections refer to nodes by this name.
    pub name: String,

    /// Dotted node type identifier (e.g. `n8n-nodes-base.slack`).
    #[serde(rename = "type")]
    pub node_type: String,

    /// Editor layout coordinate, normally `[x, y]`. Cosmetic only, so
    /// whatever a parsed document carried is kept unchanged.
    #[serde(default = "origin_position")]
    pub position: Value,

    /// Type-specific configuration bag.
    #[serde(default = "empty_object")]
    pub parameters: Value,

    /// Any further keys the document carried (e.g. `typeVersion`,
    /// `credentials`), kept so re-export is lossless.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowNode {
    /// Create a node with a fresh opaque id.
    pub fn new(
        name: impl Into<String>,
        node_type: impl Into<String>,
        position: [i64; 2],
        parameters: Value,
    ) -> Self {
        Self {
            id: Uuid::now_v7().simple().to_string(),
            name: name.into(),
            node_type: node_type.into(),
            position: Value::from(position.to_vec()),
            parameters,
            extra: Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

/// A downstream endpoint of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTarget {
    /// Display name of the target node.
    pub node: String,
    /// Port on the target node.
    #[serde(rename = "type", default = "main_port")]
    pub port: String,
    /// Input index on the target port.
    #[serde(default)]
    pub index: u32,
}

fn main_port() -> String {
    MAIN_PORT.to_owned()
}

/// Outputs of one source node: port name → outputs → targets.
pub type NodeOutputs = BTreeMap<String, Vec<Vec<ConnectionTarget>>>;

/// Directed connection map keyed by source node display name.
///
/// The shape allows fan-out (several targets per output), several outputs per
/// port, and merges (several sources naming the same target).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Connections(BTreeMap<String, NodeOutputs>);

impl Connections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect `from`'s first main output to `to`'s first main input.
    pub fn link(&mut self, from: &str, to: &str) {
        self.link_output(from, MAIN_PORT, 0, to, 0);
    }

    /// Connect output `output` of `from`'s `port` to input `input` of `to`.
    ///
    /// Missing intermediate outputs are created empty.
    pub fn link_output(&mut self, from: &str, port: &str, output: usize, to: &str, input: u32) {
        let outputs = self
            .0
            .entry(from.to_owned())
            .or_default()
            .entry(port.to_owned())
            .or_default();
        if outputs.len() <= output {
            outputs.resize_with(output + 1, Vec::new);
        }
        outputs[output].push(ConnectionTarget {
            node: to.to_owned(),
            port: port.to_owned(),
            index: input,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of source nodes with at least one entry.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Every `(source, target)` edge, in source-name order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &ConnectionTarget)> {
        self.0.iter().flat_map(|(source, ports)| {
            ports
                .values()
                .flatten()
                .flatten()
                .map(move |target| (source.as_str(), target))
        })
    }

    /// Targets reachable in one hop from `source`.
    pub fn targets<'a>(&'a self, source: &str) -> Vec<&'a ConnectionTarget> {
        self.0
            .get(source)
            .map(|ports| ports.values().flatten().flatten().collect())
            .unwrap_or_default()
    }

    /// Names referenced by the map (as source or target) that no node in
    /// `nodes` carries. Sorted and de-duplicated.
    pub fn dangling_names(&self, nodes: &[WorkflowNode]) -> Vec<String> {
        let known: std::collections::HashSet<&str> =
            nodes.iter().map(|n| n.name.as_str()).collect();
        let mut missing: Vec<String> = self
            .0
            .keys()
            .map(String::as_str)
            .chain(self.edges().map(|(_, t)| t.node.as_str()))
            .filter(|name| !known.contains(name))
            .map(str::to_owned)
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// The portable import document: `{name, active, nodes, connections}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowJson {
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub connections: Connections,
}

fn default_active() -> bool {
    true
}

/// The unit returned by every synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResult {
    /// Identifier assigned by persistence, when stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
    pub node_count: usize,
    pub estimated_setup_time: String,
    pub trigger_type: TriggerKind,
    pub nodes: Vec<WorkflowNode>,
    pub connections: Connections,
    pub setup_instructions: Vec<String>,
    pub workflow_json: WorkflowJson,
}

impl WorkflowResult {
    /// Assemble a result, deriving `node_count` and `workflow_json` from the
    /// graph so they cannot disagree with it.
    pub fn assemble(
        name: String,
        description: String,
        trigger_type: TriggerKind,
        nodes: Vec<WorkflowNode>,
        connections: Connections,
        estimated_setup_time: String,
        setup_instructions: Vec<String>,
    ) -> Self {
        let workflow_json = WorkflowJson {
            name: name.clone(),
            active: true,
            nodes: nodes.clone(),
            connections: connections.clone(),
        };
        Self {
            id: None,
            name,
            description,
            node_count: nodes.len(),
            estimated_setup_time,
            trigger_type,
            nodes,
            connections,
            setup_instructions,
            workflow_json,
        }
    }

    /// Parse a workflow document produced elsewhere (e.g. by a model).
    ///
    /// Only the JSON shape is checked. A missing `nodeCount` or
    /// `workflowJson` is derived from the document's own nodes and
    /// connections; nothing else is validated or rewritten.
    pub fn from_document(document: Value) -> Result<Self> {
        if !document.is_object() {
            return Err(IntentError::MalformedWorkflow {
                reason: "expected a JSON object".into(),
            });
        }
        let doc: WorkflowDocument = serde_json::from_value(document)?;

        let workflow_json = doc.workflow_json.unwrap_or_else(|| WorkflowJson {
            name: doc.name.clone(),
            active: true,
            nodes: doc.nodes.clone(),
            connections: doc.connections.clone(),
        });

        Ok(Self {
            id: None,
            node_count: doc.node_count.unwrap_or(doc.nodes.len()),
            name: doc.name,
            description: doc.description,
            estimated_setup_time: doc.estimated_setup_time,
            trigger_type: doc.trigger_type,
            nodes: doc.nodes,
            connections: doc.connections,
            setup_instructions: doc.setup_instructions,
            workflow_json,
        })
    }

    /// Check the graph invariants: `node_count` matches the node list and
    /// every connection endpoint names an existing node.
    pub fn check_graph(&self) -> Result<()> {
        if self.node_count != self.nodes.len() {
            return Err(IntentError::MalformedWorkflow {
                reason: format!(
                    "nodeCount is {} but there are {} nodes",
                    self.node_count,
                    self.nodes.len()
                ),
            });
        }
        let dangling = self.connections.dangling_names(&self.nodes);
        if !dangling.is_empty() {
            return Err(IntentError::MalformedWorkflow {
                reason: format!("connections reference unknown nodes: {}", dangling.join(", ")),
            });
        }
        Ok(())
    }
}

/// Lenient wire shape used by [`WorkflowResult::from_document`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkflowDocument {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    node_count: Option<usize>,
    #[serde(default)]
    estimated_setup_time: String,
    #[serde(default)]
    trigger_type: TriggerKind,
    #[serde(default)]
    nodes: Vec<WorkflowNode>,
    #[serde(default)]
    connections: Connections,
    #[serde(default)]
    setup_instructions: Vec<String>,
    #[serde(default)]
    workflow_json: Option<WorkflowJson>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
