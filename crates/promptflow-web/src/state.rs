//! Shared application state for the web server.
//!
//! [`AppState`] is wrapped in an `Arc` and shared across all request
//! handlers. The orchestrator and the handlers see the same workflow
//! repository, so generated workflows show up in the caller's library.

use std::sync::Arc;

use promptflow_agent::WorkflowOrchestrator;
use promptflow_catalog::ServiceCatalog;
use promptflow_store::{UserStore, WorkflowRepository};

use crate::WebConfig;
use crate::auth::TokenSigner;

/// Shared state accessible from every Axum handler.
pub struct AppState {
    /// Web server configuration.
    pub config: WebConfig,

    /// The service catalog, shared with the orchestrator.
    pub catalog: Arc<ServiceCatalog>,

    /// Generation and prompt enhancement.
    pub orchestrator: WorkflowOrchestrator,

    /// Account storage.
    pub users: UserStore,

    /// Stored workflows.
    pub workflows: Arc<dyn WorkflowRepository>,

    /// Bearer token issuing and verification.
    pub tokens: TokenSigner,
}

impl AppState {
    /// Assemble the state, attaching `workflows` to the orchestrator so
    /// signed-in generations are stored.
    pub fn new(
        config: WebConfig,
        orchestrator: WorkflowOrchestrator,
        users: UserStore,
        workflows: Arc<dyn WorkflowRepository>,
        tokens: TokenSigner,
    ) -> Self {
        let catalog = Arc::clone(orchestrator.catalog());
        let orchestrator = orchestrator.with_repository(Arc::clone(&workflows));
        Self {
            config,
            catalog,
            orchestrator,
            users,
            workflows,
            tokens,
        }
    }
}
