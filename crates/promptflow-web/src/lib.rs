//! HTTP API for PromptFlow.
//!
//! This crate exposes workflow generation, the service catalog and the
//! per-user workflow library over a JSON REST API:
//!
//! - `/api/auth/*` for registration, login and the current user.
//! - `/api/workflows/*` for generation, prompt enhancement and stored
//!   workflows.
//! - `/api/services/*`, `/api/examples` and `/api/node-types` for catalog
//!   browsing.
//! - `/api/status` for a health summary.
//!
//! Errors are always `{"message": "..."}` with a meaningful status code.

pub mod api;
pub mod auth;
pub mod error;
pub mod server;
pub mod state;

pub use auth::{AuthUser, MaybeAuthUser, TokenSigner};
pub use error::{ApiError, ApiResult};
pub use server::WebServer;
pub use state::AppState;

/// Web server configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// The address to bind the HTTP server to.
    pub bind_addr: String,
    /// The port to listen on.
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 3000,
        }
    }
}
