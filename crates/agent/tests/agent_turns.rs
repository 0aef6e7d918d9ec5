//! Agent turn integration tests against Postgres with a scripted provider.
//! Run with: DATABASE_URL=... cargo test -p quill-agent -- --ignored

#![allow(clippy::unwrap_used, reason = "integration test code")]

use std::sync::Arc;

use quill_agent::{AgentRuntime, TemplateProvider};
use quill_core::{new_id, ChatSession, User, DEFAULT_CONVERSATION_TYPE};
use quill_llm::mock::{MockProvider, MockReply};
use quill_storage::Store;
use serde_json::json;

async fn create_store() -> Store {
    let url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
    Store::connect(&url).await.expect("failed to connect to PostgreSQL")
}

async fn seed_user_and_session(store: &Store) -> (String, String) {
    let user = User::new(new_id(), format!("user-{}", uuid::Uuid::new_v4()), None, "h".into());
    let session = ChatSession::new(
        new_id(),
        user.id.clone(),
        DEFAULT_CONVERSATION_TYPE.to_owned(),
        json!({}),
    );
    let mut tx = store.begin().await.unwrap();
    tx.create_user(&user).await.unwrap();
    tx.create_chat_session(&session).await.unwrap();
    tx.commit().await.unwrap();
    (user.id, session.id)
}

fn runtime(store: Store, provider: Arc<MockProvider>) -> AgentRuntime {
    AgentRuntime::new(store, provider, Arc::new(TemplateProvider::new()), "mock-model".into())
}

#[tokio::test]
#[ignore]
async fn journaling_turn_structures_text_into_draft() {
    let store = create_store().await;
    let (user_id, session_id) = seed_user_and_session(&store).await;

    // Reply order: the agent's tool_use, the structurer's JSON, the final text.
    let provider = Arc::new(MockProvider::with_replies(vec![
        MockReply::ToolUse {
            name: "structure_journal".into(),
            input: json!({"text": "I felt sad today"}),
        },
        MockReply::Text(r#"{"Thoughts & Feelings": "I felt sad today"}"#.into()),
        MockReply::Text("I'm sorry today was heavy. I've noted it in your journal.".into()),
    ]));
    let runtime = runtime(store.clone(), provider);

    let turn = runtime.chat(&user_id, &session_id, "I felt sad today", None).await.unwrap();

    assert!(!turn.text.is_empty());
    assert_eq!(turn.tool_calls.len(), 1);
    assert_eq!(turn.tool_calls[0].name, "structure_journal");
    let draft = turn.updated_draft_data.unwrap();
    assert!(draft["Thoughts & Feelings"].as_str().unwrap().contains("sad"));

    let mut tx = store.begin().await.unwrap();
    let messages = tx.get_messages_ordered(&session_id).await.unwrap();
    assert_eq!(messages.len(), 2, "user and assistant messages persisted");
    assert_eq!(messages[0].content, "I felt sad today");
}

#[tokio::test]
#[ignore]
async fn save_turn_finalizes_draft_and_clears_it() {
    let store = create_store().await;
    let (user_id, session_id) = seed_user_and_session(&store).await;

    let provider = Arc::new(MockProvider::with_replies(vec![
        MockReply::ToolUse {
            name: "structure_journal".into(),
            input: json!({"text": "bought AAPL at 150"}),
        },
        MockReply::Text(r#"{"Trading Journal": "bought AAPL at 150"}"#.into()),
        MockReply::Text("Logged the trade.".into()),
        MockReply::ToolUse { name: "save_journal".into(), input: json!({"confirm": true}) },
        MockReply::Text("Saved! Your entry is in the journal.".into()),
    ]));
    let runtime = runtime(store.clone(), provider);

    runtime.chat(&user_id, &session_id, "bought AAPL at 150", None).await.unwrap();
    let turn = runtime.chat(&user_id, &session_id, "save it", None).await.unwrap();

    assert_eq!(turn.tool_calls[0].name, "save_journal");
    assert!(turn.metadata.get("journal_entry_id").is_some());
    assert!(turn.updated_draft_data.unwrap().is_empty(), "draft cleared after save");

    let mut tx = store.begin().await.unwrap();
    let entries = tx.list_entries_for_user(&user_id, 10, 0).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].structured_data["Trading Journal"]
        .as_str()
        .unwrap()
        .contains("AAPL"));
    assert!(entries[0].raw_text.contains("bought AAPL at 150"));

    let draft = tx.get_draft(&session_id, &user_id).await.unwrap().unwrap();
    assert!(draft.draft_data.is_empty());
    assert!(draft.is_finalized);
}

#[tokio::test]
#[ignore]
async fn save_without_content_is_rejected_not_failed() {
    let store = create_store().await;
    let (user_id, session_id) = seed_user_and_session(&store).await;

    let provider = Arc::new(MockProvider::with_replies(vec![
        MockReply::ToolUse { name: "save_journal".into(), input: json!({"confirm": true}) },
        MockReply::Text("There's nothing to save yet. What's on your mind?".into()),
    ]));
    let runtime = runtime(store.clone(), provider);

    let turn = runtime.chat(&user_id, &session_id, "save it", None).await.unwrap();
    assert_eq!(turn.tool_calls[0].output["status"], "rejected");
    assert!(turn.metadata.get("journal_entry_id").is_none());

    let mut tx = store.begin().await.unwrap();
    assert!(tx.list_entries_for_user(&user_id, 10, 0).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore]
async fn transport_failure_rolls_back_whole_turn() {
    let store = create_store().await;
    let (user_id, session_id) = seed_user_and_session(&store).await;

    let runtime = runtime(store.clone(), Arc::new(MockProvider::failing()));
    let err = runtime.chat(&user_id, &session_id, "anything", None).await.unwrap_err();
    assert!(matches!(err, quill_agent::AgentError::Llm(_)));

    let mut tx = store.begin().await.unwrap();
    assert_eq!(
        tx.count_messages(&session_id).await.unwrap(),
        0,
        "no orphaned user message after a failed turn"
    );
}

#[tokio::test]
#[ignore]
async fn structuring_failure_surfaces_clarifying_reply() {
    let store = create_store().await;
    let (user_id, session_id) = seed_user_and_session(&store).await;

    let provider = Arc::new(MockProvider::with_replies(vec![
        MockReply::ToolUse { name: "structure_journal".into(), input: json!({"text": "mumble"}) },
        MockReply::Text("this is not json at all".into()),
        MockReply::Text("I couldn't quite place that. Could you say a bit more?".into()),
    ]));
    let runtime = runtime(store.clone(), provider);

    let turn = runtime.chat(&user_id, &session_id, "mumble", None).await.unwrap();
    assert!(turn.tool_calls[0].is_error);
    assert_eq!(turn.tool_calls[0].output["status"], "structuring_failed");
    assert!(!turn.text.is_empty());

    // The draft stays untouched.
    let mut tx = store.begin().await.unwrap();
    let draft = tx.get_draft(&session_id, &user_id).await.unwrap().unwrap();
    assert!(draft.draft_data.is_empty());
}

#[tokio::test]
#[ignore]
async fn cross_user_session_is_not_found() {
    let store = create_store().await;
    let (_owner, session_id) = seed_user_and_session(&store).await;
    let (other, _other_session) = seed_user_and_session(&store).await;

    let runtime = runtime(store.clone(), Arc::new(MockProvider::new()));
    let err = runtime.chat(&other, &session_id, "hello", None).await.unwrap_err();
    assert!(matches!(err, quill_agent::AgentError::NotFound(_)));
}

#[tokio::test]
#[ignore]
async fn tool_budget_exhaustion_sets_overflow() {
    let store = create_store().await;
    let (user_id, session_id) = seed_user_and_session(&store).await;

    // The model asks for list_tasks on every round and never settles.
    let mut replies = Vec::new();
    for _ in 0..16 {
        replies.push(MockReply::ToolUse {
            name: "list_tasks".into(),
            input: json!({"include_completed": false}),
        });
    }
    let runtime = runtime(store.clone(), Arc::new(MockProvider::with_replies(replies)));

    let turn = runtime.chat(&user_id, &session_id, "loop forever", None).await.unwrap();
    assert_eq!(turn.metadata["overflow"], json!(true));
    assert!(!turn.text.is_empty(), "best-effort reply still produced");
    assert_eq!(turn.tool_calls.len(), quill_agent::MAX_TOOL_ROUNDS);
}

#[tokio::test]
#[ignore]
async fn agent_task_tools_mutate_the_task_list() {
    let store = create_store().await;
    let (user_id, session_id) = seed_user_and_session(&store).await;

    let provider = Arc::new(MockProvider::with_replies(vec![
        MockReply::ToolUse {
            name: "create_task".into(),
            input: json!({"title": "call the doctor", "due_date": "2026-08-10"}),
        },
        MockReply::Text("Added it to your list.".into()),
    ]));
    let runtime = runtime(store.clone(), provider);

    let turn = runtime.chat(&user_id, &session_id, "I need to call the doctor", None).await.unwrap();
    assert_eq!(turn.tool_calls[0].output["status"], "created");

    let mut tx = store.begin().await.unwrap();
    let tasks = tx.list_tasks(&user_id, false).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "call the doctor");
    assert_eq!(tasks[0].priority, 1);
    assert_eq!(tasks[0].source_session_id.as_deref(), Some(session_id.as_str()));
}
