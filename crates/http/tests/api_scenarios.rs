//! End-to-end API scenarios over the real router, Postgres, and a scripted
//! LLM provider.
//! Run with: DATABASE_URL=... cargo test -p quill-http -- --ignored

#![allow(clippy::unwrap_used, reason = "integration test code")]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use quill_agent::{AgentRuntime, TemplateProvider};
use quill_auth::AuthService;
use quill_http::{cors_layer, create_router, AppState};
use quill_llm::mock::{MockProvider, MockReply};
use quill_storage::Store;
use serde_json::{json, Value};
use tower::ServiceExt as _;

async fn test_app(provider: Arc<MockProvider>) -> Router {
    let url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
    let store = Store::connect(&url).await.expect("failed to connect to PostgreSQL");
    let templates = Arc::new(TemplateProvider::new());
    let runtime =
        AgentRuntime::new(store.clone(), provider, templates.clone(), "mock-model".into());
    let state = Arc::new(AppState {
        store,
        auth: AuthService::new("test-secret".into(), 24),
        runtime,
        templates,
    });
    create_router(state, cors_layer(&[]))
}

async fn call(
    app: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

/// Register and log in a fresh user; returns (token, user_id).
async fn login_fresh_user(app: &Router) -> (String, String) {
    let username = unique("user");
    let (status, _) = call(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({"username": username, "password": "1234"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": username, "password": "1234"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (
        body["access_token"].as_str().unwrap().to_owned(),
        body["user_id"].as_str().unwrap().to_owned(),
    )
}

async fn create_session(app: &Router, token: &str) -> String {
    let (status, body) = call(app, "POST", "/sessions", Some(token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    body["session_id"].as_str().unwrap().to_owned()
}

// ── Auth round trip ──────────────────────────────────────────────

#[tokio::test]
#[ignore]
async fn register_login_me_round_trip() {
    let app = test_app(Arc::new(MockProvider::new())).await;
    let username = unique("alice");

    let (status, body) = call(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({"username": username, "password": "pw12"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], json!(username));

    let (status, body) = call(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": username, "password": "pw12"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    let token = body["access_token"].as_str().unwrap().to_owned();

    let (status, body) = call(&app, "GET", "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], json!(username));
}

#[tokio::test]
#[ignore]
async fn duplicate_registration_conflicts() {
    let app = test_app(Arc::new(MockProvider::new())).await;
    let username = unique("dup");
    let body = json!({"username": username, "password": "pw12"});

    let (status, _) = call(&app, "POST", "/auth/register", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, reply) = call(&app, "POST", "/auth/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(reply["code"], "conflict");
}

#[tokio::test]
#[ignore]
async fn wrong_password_is_unauthorized() {
    let app = test_app(Arc::new(MockProvider::new())).await;
    let username = unique("bob");
    call(&app, "POST", "/auth/register", None, Some(json!({"username": username, "password": "pw12"})))
        .await;
    let (status, body) = call(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": username, "password": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");
}

#[tokio::test]
#[ignore]
async fn requests_without_token_are_unauthorized() {
    let app = test_app(Arc::new(MockProvider::new())).await;
    let (status, _) = call(&app, "GET", "/tasks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&app, "GET", "/auth/me", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── Journaling loop ──────────────────────────────────────────────

#[tokio::test]
#[ignore]
async fn journaling_loop_structures_then_saves() {
    let provider = Arc::new(MockProvider::with_replies(vec![
        // Turn 1: structure "I felt sad today".
        MockReply::ToolUse {
            name: "structure_journal".into(),
            input: json!({"text": "I felt sad today"}),
        },
        MockReply::Text(r#"{"Thoughts & Feelings": "I felt sad today"}"#.into()),
        MockReply::Text("That sounds hard. I've added it to your journal draft.".into()),
        // Turn 2: save.
        MockReply::ToolUse { name: "save_journal".into(), input: json!({"confirm": true}) },
        MockReply::Text("Saved your entry.".into()),
    ]));
    let app = test_app(provider).await;
    let (token, _) = login_fresh_user(&app).await;
    let session_id = create_session(&app, &token).await;

    let (status, turn) = call(
        &app,
        "POST",
        &format!("/agent/chat/{session_id}"),
        Some(&token),
        Some(json!({"text": "I felt sad today"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!turn["text"].as_str().unwrap().is_empty());
    assert_eq!(turn["tool_calls"][0]["name"], "structure_journal");
    let draft = turn["updated_draft_data"].as_object().unwrap();
    assert!(draft.values().any(|v| v.as_str().is_some_and(|s| s.contains("sad"))));

    let (status, turn) = call(
        &app,
        "POST",
        &format!("/agent/chat/{session_id}"),
        Some(&token),
        Some(json!({"text": "save it"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(turn["tool_calls"][0]["name"], "save_journal");
    assert!(turn["updated_draft_data"].as_object().unwrap().is_empty());

    let (status, entries) = call(&app, "GET", "/journal-entries", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    let structured = entries[0]["structured_data"].as_object().unwrap();
    assert!(structured.values().any(|v| v.as_str().is_some_and(|s| s.contains("sad"))));
}

// ── Multi-section structuring ────────────────────────────────────

#[tokio::test]
#[ignore]
async fn multi_section_turn_covers_distinct_sections() {
    let text = "I bought AAPL at 150 and felt anxious; market looks bearish";
    let provider = Arc::new(MockProvider::with_replies(vec![
        MockReply::ToolUse { name: "structure_journal".into(), input: json!({"text": text}) },
        MockReply::Text(
            json!({
                "Trading Journal": "I bought AAPL at 150",
                "Thoughts & Feelings": "felt anxious",
                "Market Thoughts": "market looks bearish"
            })
            .to_string(),
        ),
        MockReply::Text("Logged the trade, the mood, and the market view.".into()),
    ]));
    let app = test_app(provider).await;
    let (token, _) = login_fresh_user(&app).await;
    let session_id = create_session(&app, &token).await;

    let (status, turn) = call(
        &app,
        "POST",
        &format!("/agent/chat/{session_id}"),
        Some(&token),
        Some(json!({"text": text})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let draft = turn["updated_draft_data"].as_object().unwrap();
    assert!(draft.len() >= 2);
    assert!(draft["Trading Journal"].as_str().unwrap().contains("AAPL"));
    assert!(draft["Thoughts & Feelings"].as_str().unwrap().contains("anxious"));
    assert!(draft["Market Thoughts"].as_str().unwrap().contains("bearish"));
}

// ── Task reordering ──────────────────────────────────────────────

#[tokio::test]
#[ignore]
async fn reorder_applies_fully_or_not_at_all() {
    let app = test_app(Arc::new(MockProvider::new())).await;
    let (token, _) = login_fresh_user(&app).await;

    let mut ids = Vec::new();
    for title in ["T1", "T2", "T3"] {
        let (status, task) =
            call(&app, "POST", "/tasks", Some(&token), Some(json!({"title": title}))).await;
        assert_eq!(status, StatusCode::OK);
        ids.push(task["id"].as_str().unwrap().to_owned());
    }

    let (status, _) = call(
        &app,
        "POST",
        "/tasks/reorder",
        Some(&token),
        Some(json!({"task_orders": [
            {"task_id": ids[2], "new_priority": 1},
            {"task_id": ids[0], "new_priority": 2},
            {"task_id": ids[1], "new_priority": 3},
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, tasks) = call(&app, "GET", "/tasks", Some(&token), None).await;
    let order: Vec<&str> =
        tasks.as_array().unwrap().iter().map(|t| t["id"].as_str().unwrap()).collect();
    assert_eq!(order, vec![ids[2].as_str(), ids[0].as_str(), ids[1].as_str()]);

    // Omitting T2 must reject with 409 and change nothing.
    let (status, body) = call(
        &app,
        "POST",
        "/tasks/reorder",
        Some(&token),
        Some(json!({"task_orders": [
            {"task_id": ids[2], "new_priority": 1},
            {"task_id": ids[0], "new_priority": 2},
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");

    let (_, tasks) = call(&app, "GET", "/tasks", Some(&token), None).await;
    let after: Vec<&str> =
        tasks.as_array().unwrap().iter().map(|t| t["id"].as_str().unwrap()).collect();
    assert_eq!(after, order, "rejected reorder must not change anything");
}

#[tokio::test]
#[ignore]
async fn completing_task_recompacts_priorities() {
    let app = test_app(Arc::new(MockProvider::new())).await;
    let (token, _) = login_fresh_user(&app).await;

    let mut ids = Vec::new();
    for title in ["A", "B", "C"] {
        let (_, task) =
            call(&app, "POST", "/tasks", Some(&token), Some(json!({"title": title}))).await;
        ids.push(task["id"].as_str().unwrap().to_owned());
    }

    let (status, done) =
        call(&app, "POST", &format!("/tasks/{}/complete", ids[0]), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["is_completed"], json!(true));

    let (_, tasks) = call(&app, "GET", "/tasks", Some(&token), None).await;
    let priorities: Vec<i64> =
        tasks.as_array().unwrap().iter().map(|t| t["priority"].as_i64().unwrap()).collect();
    assert_eq!(priorities, vec![1, 2]);
}

// ── LLM outage ───────────────────────────────────────────────────

#[tokio::test]
#[ignore]
async fn llm_outage_returns_503_and_persists_nothing() {
    let app = test_app(Arc::new(MockProvider::failing())).await;
    let (token, _) = login_fresh_user(&app).await;
    let session_id = create_session(&app, &token).await;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/agent/chat/{session_id}"),
        Some(&token),
        Some(json!({"text": "anything"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "upstream_unavailable");

    let (status, messages) =
        call(&app, "GET", &format!("/sessions/{session_id}/messages"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(messages.as_array().unwrap().is_empty(), "no message survives a failed turn");
}

// ── Cross-user isolation ─────────────────────────────────────────

#[tokio::test]
#[ignore]
async fn cross_user_resources_read_as_missing() {
    let provider = Arc::new(MockProvider::with_replies(vec![
        MockReply::ToolUse {
            name: "structure_journal".into(),
            input: json!({"text": "private thought"}),
        },
        MockReply::Text(r#"{"General Reflection": "private thought"}"#.into()),
        MockReply::Text("Noted.".into()),
        MockReply::ToolUse { name: "save_journal".into(), input: json!({"confirm": true}) },
        MockReply::Text("Saved.".into()),
    ]));
    let app = test_app(provider).await;

    let (token_a, _) = login_fresh_user(&app).await;
    let session_a = create_session(&app, &token_a).await;
    call(
        &app,
        "POST",
        &format!("/agent/chat/{session_a}"),
        Some(&token_a),
        Some(json!({"text": "private thought"})),
    )
    .await;
    call(
        &app,
        "POST",
        &format!("/agent/chat/{session_a}"),
        Some(&token_a),
        Some(json!({"text": "save it"})),
    )
    .await;
    let (_, entries) = call(&app, "GET", "/journal-entries", Some(&token_a), None).await;
    let entry_id = entries.as_array().unwrap()[0]["id"].as_str().unwrap().to_owned();

    let (token_b, _) = login_fresh_user(&app).await;
    let (status, body) =
        call(&app, "GET", &format!("/journal-entries/{entry_id}"), Some(&token_b), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "foreign entry must read as missing, not forbidden");
    assert_eq!(body["code"], "not_found");

    let (status, _) = call(
        &app,
        "POST",
        &format!("/agent/chat/{session_a}"),
        Some(&token_b),
        Some(json!({"text": "hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, entries_b) = call(&app, "GET", "/journal-entries", Some(&token_b), None).await;
    assert!(entries_b.as_array().unwrap().is_empty());
}

// ── Preferences & template ───────────────────────────────────────

#[tokio::test]
#[ignore]
async fn preferences_default_then_update() {
    let app = test_app(Arc::new(MockProvider::new())).await;
    let (token, _) = login_fresh_user(&app).await;

    let (status, prefs) = call(&app, "GET", "/user/preferences", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(prefs["preferred_feedback_style"], "supportive");

    let (status, prefs) = call(
        &app,
        "POST",
        "/user/preferences",
        Some(&token),
        Some(json!({
            "preferred_feedback_style": "direct",
            "long_term_goals": ["ship the boat project"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(prefs["preferred_feedback_style"], "direct");
    assert_eq!(prefs["long_term_goals"][0], "ship the boat project");
}

#[tokio::test]
#[ignore]
async fn template_defaults_then_user_override() {
    let app = test_app(Arc::new(MockProvider::new())).await;
    let (token, _) = login_fresh_user(&app).await;

    let (status, template) = call(&app, "GET", "/user/template", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(template["source"], "default");

    let (status, updated) = call(
        &app,
        "POST",
        "/user/template",
        Some(&token),
        Some(json!({
            "name": "Minimal",
            "sections": [
                {"name": "Notes", "description": "everything", "aliases": [], "examples": []}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["source"], "user");
    assert_eq!(updated["name"], "Minimal");

    let (_, template) = call(&app, "GET", "/user/template", Some(&token), None).await;
    assert_eq!(template["source"], "user");
    assert_eq!(template["sections"].as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore]
async fn health_needs_no_auth() {
    let app = test_app(Arc::new(MockProvider::new())).await;
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}
