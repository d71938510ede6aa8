//! In-process [`WorkflowRepository`] for runs without a database file and
//! for tests.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::repository::{NewWorkflow, StoredWorkflow, WorkflowRepository, WorkflowUpdate};

/// Concurrent map of workflows keyed by id. Ids start at 1 and are never
/// reused. Owners are not checked against any user table.
#[derive(Debug)]
pub struct MemoryWorkflowStore {
    workflows: DashMap<i64, StoredWorkflow>,
    next_id: AtomicI64,
}

impl Default for MemoryWorkflowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self {
            workflows: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }

    fn collect_newest_first<F>(&self, keep: F) -> Vec<StoredWorkflow>
    where
        F: Fn(&StoredWorkflow) -> bool,
    {
        let mut out: Vec<StoredWorkflow> = self
            .workflows
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        out
    }
}

fn not_found(id: i64) -> StoreError {
    StoreError::NotFound {
        entity: "workflow",
        id: id.to_string(),
    }
}

#[async_trait]
impl WorkflowRepository for MemoryWorkflowStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, workflow: NewWorkflow) -> StoreResult<StoredWorkflow> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now().timestamp();
        let stored = StoredWorkflow {
            id,
            user_id: workflow.user_id,
            name: workflow.name,
            description: workflow.description,
            prompt: workflow.prompt,
            workflow_json: workflow.workflow_json,
            node_count: workflow.node_count,
            trigger_type: workflow.trigger_type,
            estimated_setup_time: workflow.estimated_setup_time,
            setup_instructions: workflow.setup_instructions,
            is_public: workflow.is_public,
            created_at: now,
            updated_at: now,
        };
        self.workflows.insert(id, stored.clone());
        debug!(workflow_id = id, "workflow stored in memory");
        Ok(stored)
    }

    async fn get(&self, id: i64) -> StoreResult<Option<StoredWorkflow>> {
        Ok(self.workflows.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_by_user(&self, user_id: i64) -> StoreResult<Vec<StoredWorkflow>> {
        Ok(self.collect_newest_first(|w| w.user_id == user_id))
    }

    async fn list_public(&self) -> StoreResult<Vec<StoredWorkflow>> {
        Ok(self.collect_newest_first(|w| w.is_public))
    }

    async fn update(&self, id: i64, update: WorkflowUpdate) -> StoreResult<StoredWorkflow> {
        let mut entry = self.workflows.get_mut(&id).ok_or_else(|| not_found(id))?;
        update.apply_to(entry.value_mut(), Utc::now().timestamp());
        Ok(entry.value().clone())
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        self.workflows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }
}

// ── tests ────────────────────────────────────────────────────────────
