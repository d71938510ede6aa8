//! Integration tests for the promptflow-agent crate.
//!
//! A local axum server stands in for the chat-completions endpoint so the
//! remote path, the fallback policy and persistence run end to end.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use promptflow_agent::{
    RemoteOverrides, RemoteSettings, SynthesisSource, WorkflowOrchestrator, config,
};
use promptflow_catalog::ServiceCatalog;
use promptflow_intent::{SynthesisRequest, TriggerKind};
use promptflow_store::{Database, MemoryWorkflowStore, WorkflowRepository, WorkflowStore};
use serde_json::{Value, json};

// ═══════════════════════════════════════════════════════════════════════
//  Mock endpoint
// ═══════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy)]
enum Behaviour {
    Workflow,
    FencedWorkflow,
    ServerError,
    Garbage,
    Slow,
    SlowEnhance,
}

#[derive(Clone)]
struct Mock {
    behaviour: Behaviour,
    requests: Arc<Mutex<Vec<Value>>>,
}

fn remote_workflow() -> Value {
    json!({
        "name": "Remote Signup Alerts",
        "description": "Posts new signups to Slack",
        "nodeCount": 2,
        "estimatedSetupTime": "12 minutes",
        "triggerType": "Webhook",
        "nodes": [
            {
                "id": "1",
                "name": "Signup Webhook",
                "type": "n8n-nodes-base.webhook",
                "typeVersion": 1,
                "position": [250, 300],
                "parameters": {"path": "signup"}
            },
            {
                "id": "2",
                "name": "Slack",
                "type": "n8n-nodes-base.slack",
                "typeVersion": 1,
                "position": [450, 300],
                "parameters": {"channel": "#growth"}
            }
        ],
        "connections": {
            "Signup Webhook": {"main": [[{"node": "Slack", "type": "main", "index": 0}]]}
        },
        "setupInstructions": ["1. Create a Slack app", "2. Activate the workflow"],
        "workflowJson": {"name": "Remote Signup Alerts", "active": true, "nodes": [], "connections": {}}
    })
}

fn completion(content: String) -> Value {
    json!({
        "model": "mock-model",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 20}
    })
}

async fn chat_completions(State(mock): State<Mock>, body: axum::Json<Value>) -> impl IntoResponse {
    let body = body.0;
    let json_mode = body.get("response_format").is_some();
    mock.requests.lock().unwrap().push(body);

    // Plain-text requests are enhancement calls.
    if !json_mode {
        if matches!(mock.behaviour, Behaviour::SlowEnhance) {
            tokio::time::sleep(Duration::from_secs(3)).await;
        }
        return (StatusCode::OK, axum::Json(completion("ENHANCED: notify Slack on signup".into())));
    }

    match mock.behaviour {
        Behaviour::Workflow | Behaviour::SlowEnhance => {
            (StatusCode::OK, axum::Json(completion(remote_workflow().to_string())))
        }
        Behaviour::FencedWorkflow => (
            StatusCode::OK,
            axum::Json(completion(format!("```json\n{}\n```", remote_workflow()))),
        ),
        Behaviour::ServerError => (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(json!({"error": {"message": "upstream exploded"}})),
        ),
        Behaviour::Garbage => (
            StatusCode::OK,
            axum::Json(completion("I would suggest using Zapier instead.".into())),
        ),
        Behaviour::Slow => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            (StatusCode::OK, axum::Json(completion(remote_workflow().to_string())))
        }
    }
}

/// Start the mock and return its `/v1` base URL plus the request log.
async fn start_mock(behaviour: Behaviour) -> (String, Arc<Mutex<Vec<Value>>>) {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(Mock {
            behaviour,
            requests: Arc::clone(&requests),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/v1"), requests)
}

fn settings_for(base_url: String) -> RemoteSettings {
    let overrides = RemoteOverrides {
        base_url: Some(base_url),
        model: Some("mock-model".into()),
        ..RemoteOverrides::default()
    };
    RemoteSettings::from_lookup(
        |key| (key == config::OPENAI_API_KEY_ENV).then(|| "sk-test".to_owned()),
        &overrides,
    )
    .unwrap()
}

fn catalog() -> Arc<ServiceCatalog> {
    Arc::new(ServiceCatalog::builtin().unwrap())
}

async fn orchestrator_for(behaviour: Behaviour) -> (WorkflowOrchestrator, Arc<Mutex<Vec<Value>>>) {
    let (base_url, requests) = start_mock(behaviour).await;
    let orchestrator =
        WorkflowOrchestrator::from_settings(catalog(), Some(&settings_for(base_url))).unwrap();
    (orchestrator, requests)
}

const SIGNUP_PROMPT: &str = "Notify my team in Slack every time we get a new signup";

// ═══════════════════════════════════════════════════════════════════════
//  Remote path
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn remote_workflow_is_returned() {
    let (orchestrator, requests) = orchestrator_for(Behaviour::Workflow).await;
    assert!(orchestrator.remote_configured());

    let generation = orchestrator
        .generate_detailed(&SynthesisRequest::new(SIGNUP_PROMPT), None)
        .await;

    assert_eq!(generation.source, SynthesisSource::Remote);
    assert_eq!(generation.workflow.name, "Remote Signup Alerts");
    assert_eq!(generation.workflow.trigger_type, TriggerKind::Webhook);
    assert_eq!(generation.workflow.node_count, 2);

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let sent = &requests[0];
    assert_eq!(sent["model"], "mock-model");
    assert_eq!(sent["response_format"]["type"], "json_object");
    assert_eq!(sent["messages"][1]["content"], SIGNUP_PROMPT);
    assert!(
        sent["messages"][0]["content"]
            .as_str()
            .unwrap()
            .contains("SUPPORTED SERVICES")
    );
}

#[tokio::test]
async fn fenced_reply_is_accepted() {
    let (orchestrator, _) = orchestrator_for(Behaviour::FencedWorkflow).await;
    let generation = orchestrator
        .generate_detailed(&SynthesisRequest::new(SIGNUP_PROMPT), None)
        .await;
    assert_eq!(generation.source, SynthesisSource::Remote);
    assert_eq!(generation.workflow.name, "Remote Signup Alerts");
}

#[tokio::test]
async fn enhanced_prompt_is_sent_to_remote() {
    let (orchestrator, requests) = orchestrator_for(Behaviour::Workflow).await;
    let request = SynthesisRequest::new(SIGNUP_PROMPT).with_enhancement(true);
    let generation = orchestrator.generate_detailed(&request, None).await;

    assert_eq!(generation.source, SynthesisSource::Remote);
    assert_eq!(
        generation.enhanced_prompt.as_deref(),
        Some("ENHANCED: notify Slack on signup")
    );

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].get("response_format").is_none());
    assert_eq!(requests[0]["max_tokens"], 1500);
    assert_eq!(requests[1]["messages"][1]["content"], "ENHANCED: notify Slack on signup");
}

#[tokio::test]
async fn flags_reach_the_system_prompt() {
    let (orchestrator, requests) = orchestrator_for(Behaviour::Workflow).await;
    let request = SynthesisRequest::new(SIGNUP_PROMPT)
        .with_auth(true)
        .with_error_handling(true);
    orchestrator.generate(&request, None).await;

    let requests = requests.lock().unwrap();
    let system = requests[0]["messages"][0]["content"].as_str().unwrap();
    assert!(system.contains("authentication setup"));
    assert!(system.contains("error handling nodes"));
}

// ═══════════════════════════════════════════════════════════════════════
//  Fallback
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn server_error_falls_back_to_local() {
    let (orchestrator, _) = orchestrator_for(Behaviour::ServerError).await;
    let generation = orchestrator
        .generate_detailed(&SynthesisRequest::new(SIGNUP_PROMPT), None)
        .await;

    assert_eq!(generation.source, SynthesisSource::Local);
    let names: Vec<_> = generation.workflow.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, ["Webhook", "Slack"]);
    assert_eq!(generation.workflow.trigger_type, TriggerKind::Webhook);
}

#[tokio::test]
async fn unparseable_reply_falls_back_to_local() {
    let (orchestrator, _) = orchestrator_for(Behaviour::Garbage).await;
    let generation = orchestrator
        .generate_detailed(&SynthesisRequest::new("Run a daily report at 9am"), None)
        .await;
    assert_eq!(generation.source, SynthesisSource::Local);
    assert_eq!(generation.workflow.trigger_type, TriggerKind::Schedule);
}

#[tokio::test]
async fn slow_remote_falls_back_to_local() {
    let (base_url, _) = start_mock(Behaviour::Slow).await;
    let orchestrator = WorkflowOrchestrator::from_settings(catalog(), Some(&settings_for(base_url)))
        .unwrap()
        .with_remote_timeout(Duration::from_millis(200));

    let generation = orchestrator
        .generate_detailed(&SynthesisRequest::new(SIGNUP_PROMPT), None)
        .await;
    assert_eq!(generation.source, SynthesisSource::Local);
}

#[tokio::test]
async fn slow_enhancement_counts_against_the_remote_budget() {
    let (base_url, requests) = start_mock(Behaviour::SlowEnhance).await;
    let orchestrator = WorkflowOrchestrator::from_settings(catalog(), Some(&settings_for(base_url)))
        .unwrap()
        .with_remote_timeout(Duration::from_millis(300));

    let started = std::time::Instant::now();
    let generation = orchestrator
        .generate_detailed(
            &SynthesisRequest::new(SIGNUP_PROMPT).with_enhancement(true),
            None,
        )
        .await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(generation.source, SynthesisSource::Local);
    assert!(generation.enhanced_prompt.is_none());
    // Only the enhancement call was started; the workflow call never went out.
    assert_eq!(requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unreachable_remote_falls_back_to_local() {
    let orchestrator = WorkflowOrchestrator::from_settings(
        catalog(),
        Some(&settings_for("http://127.0.0.1:9/v1".into())),
    )
    .unwrap();

    let request = SynthesisRequest::new(SIGNUP_PROMPT).with_enhancement(true);
    let generation = orchestrator.generate_detailed(&request, None).await;

    assert_eq!(generation.source, SynthesisSource::Local);
    // The local path always works from the original prompt.
    assert_eq!(generation.workflow.nodes.len(), 2);
}

// ═══════════════════════════════════════════════════════════════════════
//  Persistence
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn remote_result_is_persisted_under_original_prompt() {
    let (orchestrator, _) = orchestrator_for(Behaviour::Workflow).await;
    let store = Arc::new(MemoryWorkflowStore::new());
    let orchestrator = orchestrator.with_repository(store.clone());

    let request = SynthesisRequest::new(SIGNUP_PROMPT).with_enhancement(true);
    let result = orchestrator.generate(&request, Some(3)).await;

    let stored = store.get(result.id.unwrap()).await.unwrap().unwrap();
    assert_eq!(stored.user_id, 3);
    assert_eq!(stored.prompt, SIGNUP_PROMPT);
    assert_eq!(stored.name, "Remote Signup Alerts");
    assert_eq!(stored.node_count, 2);
    assert_eq!(stored.trigger_type, "Webhook");
    assert_eq!(stored.estimated_setup_time, "12 minutes");
}

#[tokio::test]
async fn storage_failure_still_returns_workflow() {
    let db = Database::in_memory_migrated().await.unwrap();
    let store = Arc::new(WorkflowStore::new(db));
    let orchestrator = WorkflowOrchestrator::new(catalog()).with_repository(store.clone());

    // No user 99 exists, so the foreign key rejects the insert.
    let result = orchestrator
        .generate(&SynthesisRequest::new(SIGNUP_PROMPT), Some(99))
        .await;

    assert!(result.id.is_none());
    assert_eq!(result.nodes.len(), 2);
    assert!(store.list_by_user(99).await.unwrap().is_empty());
}
