//! SQLite-backed [`WorkflowRepository`].
//!
//! The import document and the setup instructions are stored as JSON text
//! columns; everything else maps one-to-one onto a column.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::{StoreError, StoreResult, is_constraint_violation};
use crate::repository::{NewWorkflow, StoredWorkflow, WorkflowRepository, WorkflowUpdate};

const WORKFLOW_COLUMNS: &str = "id, user_id, name, description, prompt, workflow_json, \
     node_count, trigger_type, estimated_setup_time, setup_instructions, is_public, \
     created_at, updated_at";

// ═══════════════════════════════════════════════════════════════════════
//  WorkflowStore
// ═══════════════════════════════════════════════════════════════════════

/// Workflow persistence in the `workflows` table.
#[derive(Debug, Clone)]
pub struct WorkflowStore {
    db: Database,
}

impl WorkflowStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn query_list(
        &self,
        sql: String,
        key: Option<i64>,
    ) -> StoreResult<Vec<StoredWorkflow>> {
        self.db
            .execute(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = match key {
                    Some(key) => stmt
                        .query_map(rusqlite::params![key], WorkflowRow::read)?
                        .collect::<Result<Vec<_>, _>>()?,
                    None => stmt
                        .query_map([], WorkflowRow::read)?
                        .collect::<Result<Vec<_>, _>>()?,
                };
                rows.into_iter().map(WorkflowRow::into_stored_workflow).collect()
            })
            .await
    }
}

fn fetch(conn: &rusqlite::Connection, id: i64) -> StoreResult<Option<StoredWorkflow>> {
    let result = conn.query_row(
        &format!("SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE id = ?1"),
        rusqlite::params![id],
        WorkflowRow::read,
    );
    match result {
        Ok(row) => row.into_stored_workflow().map(Some),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(StoreError::Sqlite(e)),
    }
}

fn not_found(id: i64) -> StoreError {
    StoreError::NotFound {
        entity: "workflow",
        id: id.to_string(),
    }
}

#[async_trait]
impl WorkflowRepository for WorkflowStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    #[instrument(skip(self, workflow), fields(user_id = workflow.user_id))]
    async fn create(&self, workflow: NewWorkflow) -> StoreResult<StoredWorkflow> {
        let workflow_json = serde_json::to_string(&workflow.workflow_json)?;
        let instructions = serde_json::to_string(&workflow.setup_instructions)?;
        let now = Utc::now().timestamp();

        let stored = self
            .db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO workflows (user_id, name, description, prompt, workflow_json, \
                     node_count, trigger_type, estimated_setup_time, setup_instructions, \
                     is_public, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                    rusqlite::params![
                        workflow.user_id,
                        workflow.name,
                        workflow.description,
                        workflow.prompt,
                        workflow_json,
                        workflow.node_count,
                        workflow.trigger_type,
                        workflow.estimated_setup_time,
                        instructions,
                        workflow.is_public,
                        now,
                    ],
                )
                .map_err(|e| {
                    if is_constraint_violation(&e) {
                        StoreError::InvalidArgument(format!(
                            "unknown owner for workflow: user {}",
                            workflow.user_id
                        ))
                    } else {
                        StoreError::Sqlite(e)
                    }
                })?;

                Ok(StoredWorkflow {
                    id: conn.last_insert_rowid(),
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
                })
            })
            .await?;

        debug!(workflow_id = stored.id, "workflow stored");
        Ok(stored)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: i64) -> StoreResult<Option<StoredWorkflow>> {
        self.db.execute(move |conn| fetch(conn, id)).await
    }

    #[instrument(skip(self))]
    async fn list_by_user(&self, user_id: i64) -> StoreResult<Vec<StoredWorkflow>> {
        self.query_list(
            format!(
                "SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE user_id = ?1 \
                 ORDER BY created_at DESC, id DESC"
            ),
            Some(user_id),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn list_public(&self) -> StoreResult<Vec<StoredWorkflow>> {
        self.query_list(
            format!(
                "SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE is_public = 1 \
                 ORDER BY created_at DESC, id DESC"
            ),
            None,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn update(&self, id: i64, update: WorkflowUpdate) -> StoreResult<StoredWorkflow> {
        let now = Utc::now().timestamp();
        self.db
            .execute(move |conn| {
                let changed = conn.execute(
                    "UPDATE workflows SET \
                     name = COALESCE(?2, name), \
                     description = COALESCE(?3, description), \
                     is_public = COALESCE(?4, is_public), \
                     updated_at = ?5 \
                     WHERE id = ?1",
                    rusqlite::params![id, update.name, update.description, update.is_public, now],
                )?;
                if changed == 0 {
                    return Err(not_found(id));
                }
                fetch(conn, id)?.ok_or_else(|| not_found(id))
            })
            .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> StoreResult<()> {
        self.db
            .execute(move |conn| {
                let deleted =
                    conn.execute("DELETE FROM workflows WHERE id = ?1", rusqlite::params![id])?;
                if deleted == 0 {
                    return Err(not_found(id));
                }
                Ok(())
            })
            .await
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Internal row mapping
// ═══════════════════════════════════════════════════════════════════════

/// Raw row; JSON columns are decoded in a second, fallible step.
struct WorkflowRow {
    id: i64,
    user_id: i64,
    name: String,
    description: String,
    prompt: String,
    workflow_json: String,
    node_count: i64,
    trigger_type: String,
    estimated_setup_time: String,
    setup_instructions: String,
    is_public: bool,
    created_at: i64,
    updated_at: i64,
}

impl WorkflowRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            prompt: row.get(4)?,
            workflow_json: row.get(5)?,
            node_count: row.get(6)?,
            trigger_type: row.get(7)?,
            estimated_setup_time: row.get(8)?,
            setup_instructions: row.get(9)?,
            is_public: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    fn into_stored_workflow(self) -> StoreResult<StoredWorkflow> {
        Ok(StoredWorkflow {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            prompt: self.prompt,
            workflow_json: serde_json::from_str(&self.workflow_json)?,
            node_count: self.node_count,
            trigger_type: self.trigger_type,
            estimated_setup_time: self.estimated_setup_time,
            setup_instructions: serde_json::from_str(&self.setup_instructions)?,
            is_public: self.is_public,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// ── tests ────────────────────────────────────────────────────────────
