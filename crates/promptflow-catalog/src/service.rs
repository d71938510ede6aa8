//! Service definitions: one entry per integration target.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How much effort connecting a service typically takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetupComplexity {
    Low,
    Medium,
    High,
}

impl SetupComplexity {
    /// Lowercase label as used in the catalog data.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for SetupComplexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single integration target known to the catalog.
///
/// Serialized with camelCase keys so API consumers see the same shape the
/// workflow editor uses (`nodeTypes`, `authRequired`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    /// Unique, human-readable name (e.g. "Google Sheets").
    pub name: String,

    /// Node type identifiers; the first one is the canonical default.
    #[serde(alias = "node_types")]
    pub node_types: Vec<String>,

    /// Domain tag (e.g. "Communication", "CRM").
    pub category: String,

    /// Short description of what the integration offers.
    pub description: String,

    /// Whether credentials must be configured before use.
    #[serde(alias = "auth_required")]
    pub auth_required: bool,

    /// Free-text phrases describing typical uses; also used as detection
    /// keywords.
    #[serde(rename = "commonUseCases", alias = "use_cases")]
    pub use_cases: Vec<String>,

    /// Typical setup effort.
    #[serde(rename = "setupComplexity", alias = "complexity")]
    pub complexity: SetupComplexity,
}

impl ServiceDefinition {
    /// The canonical node type (first entry of `node_types`).
    pub fn default_node_type(&self) -> Option<&str> {
        self.node_types.first().map(String::as_str)
    }

    /// Lowercased detection keywords: the name, the last dotted segment of
    /// every node type, and every use-case phrase. Empty keywords are skipped.
    pub fn keywords(&self) -> Vec<String> {
        let mut keywords = Vec::with_capacity(1 + self.node_types.len() + self.use_cases.len());
        keywords.push(self.name.to_lowercase());
        keywords.extend(
            self.node_types
                .iter()
                .map(|t| t.rsplit('.').next().unwrap_or(t).to_lowercase()),
        );
        keywords.extend(self.use_cases.iter().map(|u| u.to_lowercase()));
        keywords.retain(|k| !k.is_empty());
        keywords
    }

    /// Whether any of name, description or use cases contains `lowered_query`.
    ///
    /// `lowered_query` must already be lowercase.
    pub(crate) fn matches_query(&self, lowered_query: &str) -> bool {
        self.name.to_lowercase().contains(lowered_query)
            || self.description.to_lowercase().contains(lowered_query)
            || self
                .use_cases
                .iter()
                .any(|u| u.to_lowercase().contains(lowered_query))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
