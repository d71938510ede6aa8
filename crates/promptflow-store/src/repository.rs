//! The workflow persistence interface and its record types.
//!
//! Records hold the generated workflow as plain JSON so this crate stays
//! independent of the workflow model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreResult;

/// A workflow about to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkflow {
    pub user_id: i64,
    pub name: String,
    pub description: String,
    /// The prompt as the user typed it (before any enhancement).
    pub prompt: String,
    /// The portable import document.
    pub workflow_json: Value,
    pub node_count: i64,
    pub trigger_type: String,
    pub estimated_setup_time: String,
    pub setup_instructions: Vec<String>,
    pub is_public: bool,
}

/// A stored workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredWorkflow {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub prompt: String,
    pub workflow_json: Value,
    pub node_count: i64,
    pub trigger_type: String,
    pub estimated_setup_time: String,
    pub setup_instructions: Vec<String>,
    pub is_public: bool,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds.
    pub updated_at: i64,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

impl WorkflowUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.is_public.is_none()
    }

    pub(crate) fn apply_to(&self, workflow: &mut StoredWorkflow, now: i64) {
        if let Some(name) = &self.name {
            workflow.name = name.clone();
        }
        if let Some(description) = &self.description {
            workflow.description = description.clone();
        }
        if let Some(is_public) = self.is_public {
            workflow.is_public = is_public;
        }
        workflow.updated_at = now;
    }
}

/// Storage for generated workflows.
///
/// Listings are newest first (ties broken by descending id). `update` and
/// `delete` fail with [`crate::StoreError::NotFound`] for unknown ids.
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Short backend label for logs and status output.
    fn backend(&self) -> &'static str;

    async fn create(&self, workflow: NewWorkflow) -> StoreResult<StoredWorkflow>;

    async fn get(&self, id: i64) -> StoreResult<Option<StoredWorkflow>>;

    async fn list_by_user(&self, user_id: i64) -> StoreResult<Vec<StoredWorkflow>>;

    async fn list_public(&self) -> StoreResult<Vec<StoredWorkflow>>;

    async fn update(&self, id: i64, update: WorkflowUpdate) -> StoreResult<StoredWorkflow>;

    async fn delete(&self, id: i64) -> StoreResult<()>;
}
