//! Integration tests for the promptflow-store crate.
//!
//! Exercise an on-disk database across reopen, and run the same repository
//! contract against both the SQLite and the in-memory implementations.

use std::sync::Arc;

use promptflow_store::{
    Database, MemoryWorkflowStore, NewWorkflow, StoreError, UserStore, WorkflowRepository,
    WorkflowStore, WorkflowUpdate,
};
use serde_json::json;

fn new_workflow(user_id: i64, name: &str, is_public: bool) -> NewWorkflow {
    NewWorkflow {
        user_id,
        name: name.into(),
        description: "Ping the team (Uses: Slack)".into(),
        prompt: "Notify my team in Slack every time we get a new signup".into(),
        workflow_json: json!({
            "name": name,
            "active": true,
            "nodes": [
                {"id": "1", "name": "Webhook", "type": "n8n-nodes-base.webhook", "position": [250, 300], "parameters": {}},
                {"id": "2", "name": "Slack", "type": "n8n-nodes-base.slack", "position": [450, 300], "parameters": {}}
            ],
            "connections": {"Webhook": {"main": [[{"node": "Slack", "type": "main", "index": 0}]]}}
        }),
        node_count: 2,
        trigger_type: "Webhook".into(),
        estimated_setup_time: "12 minutes".into(),
        setup_instructions: vec!["1. Import this workflow JSON into your n8n instance".into()],
        is_public,
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Database lifecycle
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("promptflow.db");

    let workflow_id = {
        let db = Database::open_and_migrate(path.clone()).await.unwrap();
        let user = UserStore::new(db.clone())
            .create("persist@example.com", "Persist", "secret1")
            .await
            .unwrap();
        WorkflowStore::new(db)
            .create(new_workflow(user.id, "Kept", true))
            .await
            .unwrap()
            .id
    };

    let db = Database::open_and_migrate(path).await.unwrap();
    let users = UserStore::new(db.clone());
    assert!(users.authenticate("PERSIST@example.com", "secret1").await.unwrap().is_some());

    let stored = WorkflowStore::new(db).get(workflow_id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Kept");
    assert_eq!(stored.workflow_json["connections"]["Webhook"]["main"][0][0]["node"], "Slack");
}

#[tokio::test]
async fn reopening_does_not_rerun_migrations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("twice.db");
    let first = Database::open_and_migrate(path.clone()).await.unwrap();
    let v1 = first.schema_version().await.unwrap();
    drop(first);
    let second = Database::open_and_migrate(path).await.unwrap();
    assert_eq!(second.schema_version().await.unwrap(), v1);
}

// ═══════════════════════════════════════════════════════════════════════
//  Repository contract
// ═══════════════════════════════════════════════════════════════════════

async fn exercise_contract(repo: Arc<dyn WorkflowRepository>, owner: i64, other: i64) {
    let a = repo.create(new_workflow(owner, "A", false)).await.unwrap();
    let b = repo.create(new_workflow(other, "B", true)).await.unwrap();
    let c = repo.create(new_workflow(owner, "C", true)).await.unwrap();

    let mine: Vec<i64> = repo.list_by_user(owner).await.unwrap().iter().map(|w| w.id).collect();
    assert_eq!(mine, vec![c.id, a.id], "{}", repo.backend());

    let public: Vec<i64> = repo.list_public().await.unwrap().iter().map(|w| w.id).collect();
    assert_eq!(public, vec![c.id, b.id], "{}", repo.backend());

    let updated = repo
        .update(
            a.id,
            WorkflowUpdate {
                name: Some("A2".into()),
                description: Some("changed".into()),
                is_public: Some(true),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "A2");
    assert!(updated.is_public);
    assert_eq!(updated.node_count, 2);
    assert_eq!(repo.list_public().await.unwrap().len(), 3);

    repo.delete(b.id).await.unwrap();
    assert!(repo.get(b.id).await.unwrap().is_none());
    assert!(matches!(repo.delete(b.id).await, Err(StoreError::NotFound { .. })));
}

#[tokio::test]
async fn sqlite_repository_contract() {
    let db = Database::in_memory_migrated().await.unwrap();
    let users = UserStore::new(db.clone());
    let owner = users.create("owner@example.com", "Owner", "secret1").await.unwrap();
    let other = users.create("other@example.com", "Other", "secret1").await.unwrap();
    exercise_contract(Arc::new(WorkflowStore::new(db)), owner.id, other.id).await;
}

#[tokio::test]
async fn memory_repository_contract() {
    exercise_contract(Arc::new(MemoryWorkflowStore::new()), 1, 2).await;
}
