//! The service catalog registry.
//!
//! [`ServiceCatalog`] is built once at startup (from the embedded data file
//! or from an explicit list) and is read-only afterwards, so it can be shared
//! behind an `Arc` across every request.
//!
//! Keyword detection compiles every service keyword into a single
//! [`aho_corasick`] automaton at construction time; a prompt is scanned once
//! regardless of catalog size.

use std::collections::{BTreeSet, HashMap, HashSet};

use aho_corasick::AhoCorasick;
use serde::Deserialize;
use tracing::debug;

use crate::error::{CatalogError, Result};
use crate::service::{ServiceDefinition, SetupComplexity};

/// Built-in catalog data.
const BUILTIN_CATALOG: &str = include_str!("../data/services.toml");

/// Default number of entries returned by [`ServiceCatalog::list_popular`]
/// when the caller has no preference.
pub const DEFAULT_POPULAR_LIMIT: usize = 10;

/// On-disk layout of a catalog data file.
#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    service: Vec<ServiceDefinition>,
}

// ---------------------------------------------------------------------------
// ServiceCatalog
// ---------------------------------------------------------------------------

/// Immutable registry of known integration targets.
///
/// Not `Clone`: the compiled keyword automaton is shared by wrapping the
/// catalog in an `Arc`.
#[derive(Debug)]
pub struct ServiceCatalog {
    services: Vec<ServiceDefinition>,
    /// Automaton over the de-duplicated keyword set (`None` when empty).
    matcher: Option<AhoCorasick>,
    /// For each automaton pattern, the indices of the services owning it.
    keyword_owners: Vec<Vec<usize>>,
}

impl ServiceCatalog {
    /// Build a catalog from an ordered list of services.
    ///
    /// Fails if two services share a name (case-insensitively) or a service
    /// has no node types.
    pub fn new(services: Vec<ServiceDefinition>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(services.len());
        for service in &services {
            if service.name.trim().is_empty() {
                return Err(CatalogError::InvalidService {
                    name: service.name.clone(),
                    reason: "name must not be empty".into(),
                });
            }
            if service.node_types.is_empty() {
                return Err(CatalogError::InvalidService {
                    name: service.name.clone(),
                    reason: "at least one node type is required".into(),
                });
            }
            if !seen.insert(service.name.to_lowercase()) {
                return Err(CatalogError::DuplicateService {
                    name: service.name.clone(),
                });
            }
        }

        let (matcher, keyword_owners) = build_matcher(&services)?;

        debug!(
            services = services.len(),
            keywords = keyword_owners.len(),
            "service catalog built"
        );

        Ok(Self {
            services,
            matcher,
            keyword_owners,
        })
    }

    /// Parse a catalog from TOML text made of `[[service]]` tables.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(text)?;
        Self::new(file.service)
    }

    /// Load the built-in catalog shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    /// All services, in catalog order.
    pub fn services(&self) -> &[ServiceDefinition] {
        &self.services
    }

    /// Number of services in the catalog.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether the catalog has no services.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// Case-insensitive exact match on the service name.
    pub fn lookup_by_name(&self, name: &str) -> Option<&ServiceDefinition> {
        let lowered = name.to_lowercase();
        self.services
            .iter()
            .find(|s| s.name.to_lowercase() == lowered)
    }

    /// Services whose category equals `category` (case-insensitive), in
    /// catalog order.
    pub fn list_by_category(&self, category: &str) -> Vec<&ServiceDefinition> {
        let lowered = category.to_lowercase();
        self.services
            .iter()
            .filter(|s| s.category.to_lowercase() == lowered)
            .collect()
    }

    /// Sorted, de-duplicated category names.
    pub fn categories(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self.services.iter().map(|s| s.category.as_str()).collect();
        set.into_iter().collect()
    }

    /// Up to `limit` quick-setup services, in catalog order.
    ///
    /// "Popular" means [`SetupComplexity::Low`]; there is no usage ranking.
    pub fn list_popular(&self, limit: usize) -> Vec<&ServiceDefinition> {
        self.services
            .iter()
            .filter(|s| s.complexity == SetupComplexity::Low)
            .take(limit)
            .collect()
    }

    /// Case-insensitive substring search over name, description and use
    /// cases.
    pub fn search(&self, query: &str) -> Vec<&ServiceDefinition> {
        let lowered = query.to_lowercase();
        self.services
            .iter()
            .filter(|s| s.matches_query(&lowered))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Detection
    // -----------------------------------------------------------------------

    /// Services mentioned by a free-text prompt, in catalog order.
    ///
    /// A service is detected when any of its [`ServiceDefinition::keywords`]
    /// occurs as a substring of the lowercased prompt.
    pub fn detect(&self, prompt: &str) -> Vec<&ServiceDefinition> {
        let Some(matcher) = &self.matcher else {
            return Vec::new();
        };

        let lowered = prompt.to_lowercase();
        let mut hits = vec![false; self.services.len()];
        for m in matcher.find_overlapping_iter(&lowered) {
            for &owner in &self.keyword_owners[m.pattern().as_usize()] {
                hits[owner] = true;
            }
        }

        let detected: Vec<&ServiceDefinition> = self
            .services
            .iter()
            .zip(hits)
            .filter_map(|(service, hit)| hit.then_some(service))
            .collect();

        debug!(detected = detected.len(), "services detected in prompt");
        detected
    }

    /// One line per service, for inclusion in a model prompt:
    /// `- Name (type, type) - Category [Auth Required]`.
    pub fn prompt_listing(&self) -> String {
        self.services
            .iter()
            .map(|s| {
                format!(
                    "- {} ({}) - {}{}",
                    s.name,
                    s.node_types.join(", "),
                    s.category,
                    if s.auth_required {
                        " [Auth Required]"
                    } else {
                        ""
                    }
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Compile the de-duplicated keyword set of `services` into one automaton.
fn build_matcher(services: &[ServiceDefinition]) -> Result<(Option<AhoCorasick>, Vec<Vec<usize>>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut patterns: Vec<String> = Vec::new();
    let mut owners: Vec<Vec<usize>> = Vec::new();

    for (service_idx, service) in services.iter().enumerate() {
        for keyword in service.keywords() {
            let slot = *index.entry(keyword.clone()).or_insert_with(|| {
                patterns.push(keyword);
                owners.push(Vec::new());
                patterns.len() - 1
            });
            if !owners[slot].contains(&service_idx) {
                owners[slot].push(service_idx);
            }
        }
    }

    if patterns.is_empty() {
        return Ok((None, owners));
    }

    let matcher = AhoCorasick::new(&patterns).map_err(|e| CatalogError::MatcherBuildFailed {
        reason: e.to_string(),
    })?;

    Ok((Some(matcher), owners))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn service(name: &str, category: &str, complexity: SetupComplexity) -> ServiceDefinition {
        ServiceDefinition {
            name: name.into(),
            node_types: vec![format!("n8n-nodes-base.{}", name.to_lowercase().replace(' ', ""))],
            category: category.into(),
            description: format!("{name} integration"),
            auth_required: true,
            use_cases: vec![format!("{name} sync")],
            complexity,
        }
    }

    fn small_catalog() -> ServiceCatalog {
        ServiceCatalog::new(vec![
            service("Slack", "Communication", SetupComplexity::Low),
            service("Jira", "Productivity", SetupComplexity::High),
            service("Discord", "Communication", SetupComplexity::Medium),
            service("Trello", "Productivity", SetupComplexity::Low),
        ])
        .unwrap()
    }

    #[test]
    fn builtin_catalog_loads() {
        let catalog = ServiceCatalog::builtin().unwrap();
        assert_eq!(catalog.len(), 100);
        assert!(catalog.services().iter().all(|s| s.auth_required));
        assert!(catalog.services().iter().all(|s| !s.node_types.is_empty()));
    }

    #[test]
    fn builtin_categories_are_sorted_and_unique() {
        let catalog = ServiceCatalog::builtin().unwrap();
        let categories = catalog.categories();
        assert_eq!(categories.len(), 20);
        let mut sorted = categories.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(categories, sorted);
        assert!(categories.contains(&"Time Tracking"));
    }

    #[test]
    fn builtin_popular_services_are_low_complexity() {
        let catalog = ServiceCatalog::builtin().unwrap();
        let names: Vec<&str> = catalog
            .list_popular(DEFAULT_POPULAR_LIMIT)
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "Slack",
                "Telegram",
                "SendGrid",
                "Mailgun",
                "Trello",
                "Todoist",
                "Google Sheets",
                "Calendly",
                "Typeform",
                "Toggl",
            ]
        );
    }

    #[test]
    fn popular_returns_fewer_than_limit_when_short() {
        let catalog = small_catalog();
        let popular = catalog.list_popular(3);
        assert_eq!(popular.len(), 2);
        assert_eq!(popular[0].name, "Slack");
        assert_eq!(popular[1].name, "Trello");
    }

    #[test]
    fn popular_zero_limit_is_empty() {
        assert!(small_catalog().list_popular(0).is_empty());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let catalog = small_catalog();
        assert_eq!(catalog.lookup_by_name("sLaCk").map(|s| s.name.as_str()), Some("Slack"));
        assert!(catalog.lookup_by_name("Slac").is_none());
    }

    #[test]
    fn list_by_category_preserves_order() {
        let catalog = small_catalog();
        let names: Vec<&str> = catalog
            .list_by_category("communication")
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["Slack", "Discord"]);
        assert!(catalog.list_by_category("Unknown").is_empty());
    }

    #[test]
    fn search_matches_name_description_or_use_case() {
        let catalog = small_catalog();
        assert_eq!(catalog.search("JIRA").len(), 1);
        assert_eq!(catalog.search("integration").len(), 4);
        assert_eq!(catalog.search("trello sync")[0].name, "Trello");
        assert!(catalog.search("salesforce").is_empty());
    }

    #[test]
    fn detect_returns_catalog_order() {
        let catalog = small_catalog();
        let detected: Vec<&str> = catalog
            .detect("Post Trello updates to SLACK")
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(detected, vec!["Slack", "Trello"]);
    }

    #[test]
    fn detect_shared_keyword_marks_every_owner() {
        let mut a = service("Toggl", "Time Tracking", SetupComplexity::Low);
        let mut b = service("Harvest", "Time Tracking", SetupComplexity::Medium);
        a.use_cases = vec!["Time tracking".into()];
        b.use_cases = vec!["Time tracking".into()];
        let catalog = ServiceCatalog::new(vec![a, b]).unwrap();
        assert_eq!(catalog.detect("improve our time tracking").len(), 2);
    }

    #[test]
    fn detect_builtin_scenarios() {
        let catalog = ServiceCatalog::builtin().unwrap();
        assert!(catalog.detect("Automate my workflow").is_empty());
        let names: Vec<&str> = catalog
            .detect("Add new Stripe customers to HubSpot and Airtable")
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["Stripe", "Airtable", "HubSpot"]);
    }

    #[test]
    fn detect_on_empty_catalog_is_empty() {
        let catalog = ServiceCatalog::new(Vec::new()).unwrap();
        assert!(catalog.is_empty());
        assert!(catalog.detect("slack").is_empty());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let result = ServiceCatalog::new(vec![
            service("Slack", "Communication", SetupComplexity::Low),
            service("SLACK", "Communication", SetupComplexity::Low),
        ]);
        assert!(matches!(result, Err(CatalogError::DuplicateService { .. })));
    }

    #[test]
    fn service_without_node_types_is_rejected() {
        let mut s = service("Slack", "Communication", SetupComplexity::Low);
        s.node_types.clear();
        assert!(matches!(
            ServiceCatalog::new(vec![s]),
            Err(CatalogError::InvalidService { .. })
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let result = ServiceCatalog::from_toml_str("[[service]]\nname = 3");
        assert!(matches!(result, Err(CatalogError::ParseFailed { .. })));
    }

    #[test]
    fn prompt_listing_format() {
        let catalog = ServiceCatalog::builtin().unwrap();
        let listing = catalog.prompt_listing();
        assert_eq!(listing.lines().count(), 100);
        assert!(listing.contains(
            "- Slack (n8n-nodes-base.slack, n8n-nodes-base.slackV2) - Communication [Auth Required]"
        ));
    }
}
