//! Main web server setup and startup.
//!
//! [`WebServer`] composes the Axum router, registers all routes, and starts
//! the HTTP listener.

use std::sync::Arc;

use axum::Router;
use axum::http::Method;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use crate::api;
use crate::state::AppState;

/// The PromptFlow API server.
pub struct WebServer {
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Return the `host:port` string this server will bind to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.state.config.bind_addr, self.state.config.port)
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Build the Axum router with all routes registered.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers(Any);

        Router::new()
            // Accounts.
            .route("/api/auth/register", post(api::register))
            .route("/api/auth/login", post(api::login))
            .route("/api/auth/me", get(api::me))
            // Generation.
            .route("/api/workflows/generate", post(api::generate))
            .route("/api/workflows/enhance-prompt", post(api::enhance_prompt))
            // Stored workflows. Static segments win over `{id}`.
            .route("/api/workflows/my-workflows", get(api::my_workflows))
            .route("/api/workflows/public", get(api::public_workflows))
            .route(
                "/api/workflows/{id}",
                get(api::get_workflow)
                    .patch(api::update_workflow)
                    .delete(api::delete_workflow),
            )
            // Catalog.
            .route("/api/examples", get(api::examples))
            .route("/api/node-types", get(api::node_types))
            .route("/api/services", get(api::services))
            .route("/api/services/categories", get(api::categories))
            .route("/api/services/popular", get(api::popular_services))
            .route("/api/services/search", get(api::search_services))
            .route("/api/services/{category}", get(api::services_by_category))
            .route("/api/status", get(api::status))
            .layer(cors)
            .with_state(Arc::clone(&self.state))
    }

    /// Start the server and block until it is shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound.
    pub async fn start(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.addr();
        let router = self.router();

        tracing::info!(
            addr = %addr,
            services = self.state.catalog.len(),
            remote = self.state.orchestrator.remote_configured(),
            storage = self.state.workflows.backend(),
            "starting web server"
        );

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
