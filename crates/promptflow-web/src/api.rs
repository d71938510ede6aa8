//! REST API route handlers.
//!
//! Provides endpoints for authentication, workflow generation and storage,
//! catalog browsing and system status.

use std::sync::{Arc, LazyLock};

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use promptflow_catalog::{DEFAULT_POPULAR_LIMIT, example_prompts, popular_node_types};
use promptflow_intent::{SynthesisRequest, WorkflowResult};
use promptflow_store::{StoreError, StoredWorkflow, User, WorkflowUpdate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::auth::{AuthUser, MaybeAuthUser};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

type SharedState = State<Arc<AppState>>;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const MIN_PROMPT_CHARS: usize = 10;
const MIN_PASSWORD_CHARS: usize = 6;
const MIN_NAME_CHARS: usize = 2;

static EMAIL: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(EMAIL_PATTERN).ok());

fn is_valid_email(email: &str) -> bool {
    EMAIL.as_ref().is_some_and(|re| re.is_match(email))
}

fn validate_credentials(email: &str, password: &str) -> ApiResult<()> {
    if !is_valid_email(email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::bad_request("Password must be at least 6 characters"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Public view of an account.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: i64,
    pub email: String,
    pub name: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}

fn session(state: &AppState, user: User) -> ApiResult<Json<Value>> {
    let token = state
        .tokens
        .issue(user.id)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(json!({ "user": UserView::from(user), "token": token })))
}

/// POST /api/auth/register
pub async fn register(
    State(state): SharedState,
    body: Result<Json<RegisterBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    validate_credentials(&body.email, &body.password)?;
    if body.name.chars().count() < MIN_NAME_CHARS {
        return Err(ApiError::bad_request("Name must be at least 2 characters"));
    }

    if state.users.get_by_email(&body.email).await?.is_some() {
        return Err(ApiError::bad_request("User already exists"));
    }

    let user = match state.users.create(&body.email, &body.name, &body.password).await {
        Ok(user) => user,
        Err(StoreError::AlreadyExists { .. }) => {
            return Err(ApiError::bad_request("User already exists"));
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!(user_id = user.id, "user registered");
    session(&state, user)
}

/// POST /api/auth/login
pub async fn login(
    State(state): SharedState,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    validate_credentials(&body.email, &body.password)?;

    let user = state
        .users
        .authenticate(&body.email, &body.password)
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid credentials"))?;

    tracing::debug!(user_id = user.id, "user logged in");
    session(&state, user)
}

/// GET /api/auth/me
pub async fn me(State(state): SharedState, AuthUser(user_id): AuthUser) -> ApiResult<Json<UserView>> {
    let user = state
        .users
        .get(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(user.into()))
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// POST /api/workflows/generate
pub async fn generate(
    State(state): SharedState,
    MaybeAuthUser(user_id): MaybeAuthUser,
    body: Result<Json<SynthesisRequest>, JsonRejection>,
) -> ApiResult<Json<WorkflowResult>> {
    let Json(request) = body?;
    if request.prompt.chars().count() < MIN_PROMPT_CHARS {
        return Err(ApiError::bad_request("Prompt must be at least 10 characters"));
    }

    let workflow = state.orchestrator.generate(&request, user_id).await;
    Ok(Json(workflow))
}

#[derive(Debug, Deserialize)]
pub struct EnhanceBody {
    #[serde(default)]
    pub prompt: Option<String>,
}

/// POST /api/workflows/enhance-prompt
pub async fn enhance_prompt(
    State(state): SharedState,
    body: Result<Json<EnhanceBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    let prompt = body
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Prompt is required"))?;

    let enhanced = state.orchestrator.enhance_prompt(&prompt).await;
    Ok(Json(json!({ "enhancedPrompt": enhanced })))
}

// ---------------------------------------------------------------------------
// Stored workflows
// ---------------------------------------------------------------------------

fn parse_workflow_id(raw: &str) -> ApiResult<i64> {
    raw.parse()
        .map_err(|_| ApiError::bad_request("Invalid workflow id"))
}

async fn owned_workflow(state: &AppState, raw_id: &str, user_id: i64) -> ApiResult<StoredWorkflow> {
    let id = parse_workflow_id(raw_id)?;
    let workflow = state
        .workflows
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Workflow not found".into()))?;
    if workflow.user_id != user_id {
        return Err(ApiError::Forbidden("You do not own this workflow".into()));
    }
    Ok(workflow)
}

/// GET /api/workflows/my-workflows
pub async fn my_workflows(
    State(state): SharedState,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<StoredWorkflow>>> {
    Ok(Json(state.workflows.list_by_user(user_id).await?))
}

/// GET /api/workflows/public
pub async fn public_workflows(State(state): SharedState) -> ApiResult<Json<Vec<StoredWorkflow>>> {
    Ok(Json(state.workflows.list_public().await?))
}

/// GET /api/workflows/{id}
pub async fn get_workflow(
    State(state): SharedState,
    Path(id): Path<String>,
) -> ApiResult<Json<StoredWorkflow>> {
    let id = parse_workflow_id(&id)?;
    state
        .workflows
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Workflow not found".into()))
}

/// PATCH /api/workflows/{id}
pub async fn update_workflow(
    State(state): SharedState,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    body: Result<Json<WorkflowUpdate>, JsonRejection>,
) -> ApiResult<Json<StoredWorkflow>> {
    let workflow = owned_workflow(&state, &id, user_id).await?;
    let Json(update) = body?;
    if update.is_empty() {
        return Ok(Json(workflow));
    }
    let updated = state.workflows.update(workflow.id, update).await?;
    tracing::info!(workflow_id = updated.id, user_id, "workflow updated");
    Ok(Json(updated))
}

/// DELETE /api/workflows/{id}
pub async fn delete_workflow(
    State(state): SharedState,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let workflow = owned_workflow(&state, &id, user_id).await?;
    state.workflows.delete(workflow.id).await?;
    tracing::info!(workflow_id = workflow.id, user_id, "workflow deleted");
    Ok((StatusCode::OK, Json(json!({ "deleted": true }))))
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// GET /api/examples
pub async fn examples() -> impl IntoResponse {
    Json(example_prompts())
}

/// GET /api/node-types
pub async fn node_types(State(state): SharedState) -> impl IntoResponse {
    Json(popular_node_types(&state.catalog))
}

/// GET /api/services
pub async fn services(State(state): SharedState) -> impl IntoResponse {
    Json(json!(state.catalog.services()))
}

/// GET /api/services/categories
pub async fn categories(State(state): SharedState) -> impl IntoResponse {
    Json(json!(state.catalog.categories()))
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<usize>,
}

/// GET /api/services/popular?limit=N
pub async fn popular_services(
    State(state): SharedState,
    query: Result<Query<PopularQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_POPULAR_LIMIT);
    Ok(Json(json!(state.catalog.list_popular(limit))))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /api/services/search?q=...
pub async fn search_services(
    State(state): SharedState,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    Ok(Json(json!(state.catalog.search(&query.q))))
}

/// GET /api/services/{category}
pub async fn services_by_category(
    State(state): SharedState,
    Path(category): Path<String>,
) -> impl IntoResponse {
    Json(json!(state.catalog.list_by_category(&category)))
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

/// Response payload for the `/api/status` endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub services: usize,
    pub remote_configured: bool,
    pub storage: &'static str,
}

pub async fn status(State(state): SharedState) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        services: state.catalog.len(),
        remote_configured: state.orchestrator.remote_configured(),
        storage: state.workflows.backend(),
    })
}
