//! Service catalog for PromptFlow.
//!
//! This crate provides:
//!
//! - **Service definitions**: integration targets with their node types,
//!   category, auth requirement, use cases and setup complexity, via
//!   [`service::ServiceDefinition`].
//! - **Catalog registry**: an immutable, explicitly constructed lookup
//!   structure with name/category/popularity/search queries and keyword
//!   detection over free text, via [`catalog::ServiceCatalog`].
//! - **Node-type vocabulary**: the core node types every generated workflow
//!   may use, via [`node_types`].
//! - **Example prompts** for the UI, via [`examples`].

pub mod catalog;
pub mod error;
pub mod examples;
pub mod node_types;
pub mod service;

pub use catalog::{DEFAULT_POPULAR_LIMIT, ServiceCatalog};
pub use error::{CatalogError, Result};
pub use examples::{ExamplePrompt, example_prompts};
pub use node_types::{NodeTypeInfo, is_core_node_type, popular_node_types};
pub use service::{ServiceDefinition, SetupComplexity};
