//! Shared helper functions used across CLI subcommands.
//!
//! Includes tracing initialization, component wiring and catalog output
//! formatting.

use std::sync::Arc;

use anyhow::{Context, Result};
use promptflow_agent::{RemoteSettings, WorkflowOrchestrator};
use promptflow_catalog::{ServiceCatalog, ServiceDefinition};
use promptflow_store::{Database, MemoryWorkflowStore, UserStore, WorkflowRepository, WorkflowStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, DatabaseConfig};

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with the given default log level.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub fn load_catalog() -> Result<Arc<ServiceCatalog>> {
    let catalog = ServiceCatalog::builtin().context("failed to load the built-in service catalog")?;
    Ok(Arc::new(catalog))
}

/// Remote settings from the environment, unless `local_only`.
pub fn remote_settings(config: &AppConfig, local_only: bool) -> Option<RemoteSettings> {
    if local_only {
        return None;
    }
    RemoteSettings::from_env(&config.remote)
}

pub fn build_orchestrator(
    catalog: Arc<ServiceCatalog>,
    config: &AppConfig,
    local_only: bool,
) -> Result<WorkflowOrchestrator> {
    let settings = remote_settings(config, local_only);
    WorkflowOrchestrator::from_settings(catalog, settings.as_ref())
        .context("failed to configure the remote model client")
}

/// Open the user and workflow stores.
///
/// On disk both live in one SQLite file. In memory, users get a private
/// in-memory SQLite database and workflows a [`MemoryWorkflowStore`].
pub async fn open_storage(database: &DatabaseConfig) -> Result<(UserStore, Arc<dyn WorkflowRepository>)> {
    if database.in_memory {
        let db = Database::in_memory_migrated()
            .await
            .context("failed to open in-memory database")?;
        info!("using in-memory storage; nothing will be persisted");
        return Ok((UserStore::new(db), Arc::new(MemoryWorkflowStore::new())));
    }

    let db = Database::open_and_migrate(database.path.clone())
        .await
        .with_context(|| format!("failed to open database at {}", database.path.display()))?;
    info!(path = %database.path.display(), "database ready");
    Ok((UserStore::new(db.clone()), Arc::new(WorkflowStore::new(db))))
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One line per service: `Name  [Category]  description`.
pub fn format_service_rows(services: &[&ServiceDefinition]) -> String {
    let width = services.iter().map(|s| s.name.len()).max().unwrap_or(0);
    services
        .iter()
        .map(|s| format!("{:<width$}  [{}]  {}", s.name, s.category, s.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Multi-line detail view of one service.
pub fn format_service_detail(service: &ServiceDefinition) -> String {
    let mut out = format!(
        "{}\n  category:    {}\n  description: {}\n  node types:  {}\n  auth:        {}\n  complexity:  {}",
        service.name,
        service.category,
        service.description,
        service.node_types.join(", "),
        if service.auth_required { "required" } else { "none" },
        service.complexity,
    );
    if !service.use_cases.is_empty() {
        out.push_str("\n  use cases:");
        for use_case in &service.use_cases {
            out.push_str(&format!("\n    - {use_case}"));
        }
    }
    out
}
