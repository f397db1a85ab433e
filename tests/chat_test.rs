//! Chat workflow behavior: history accumulation and grounded dispatch.

mod helpers;

use std::sync::Arc;

use helpers::{test_repo, ScriptedCompletion};
use oneiro::chat::functions::available_functions;
use oneiro::chat::sessions::ChatSessions;
use oneiro::chat::ChatWorkflow;

fn workflow(completion: Arc<ScriptedCompletion>) -> (ChatWorkflow, oneiro::dreams::repo::DreamRepository) {
    let repo = test_repo();
    let sessions = Arc::new(ChatSessions::new(50));
    (
        ChatWorkflow::new(repo.clone(), completion, sessions),
        repo,
    )
}

#[test]
fn chat_returns_reply_and_keeps_per_user_history() {
    let stub = Arc::new(ScriptedCompletion::with_text("an answer"));
    let (chat, _repo) = workflow(stub);

    let reply = chat.chat("tell me about flying dreams", "a@example.com").unwrap();
    assert_eq!(reply, "an answer");

    // A different user's chat is independent
    let reply = chat.chat("", "b@example.com").unwrap();
    assert_eq!(reply, "an answer");
}

#[test]
fn search_chat_with_unknown_function_still_dispatches() {
    let stub = Arc::new(ScriptedCompletion::new(
        vec![Some("unused".into())],
        None,
        Some(serde_json::json!({ "lucidity_plan": "step one" })),
    ));
    let (chat, _repo) = workflow(stub);

    let response = chat
        .search_chat("not_a_known_function", "any prompt", "a@example.com")
        .unwrap();

    let known: Vec<&str> = available_functions().iter().map(|f| f.name).collect();
    assert!(known.contains(&response.function.as_str()));
}

#[test]
fn search_chat_payload_always_has_search_results() {
    let stub = Arc::new(ScriptedCompletion::new(
        vec![Some("unused".into())],
        None,
        Some(serde_json::json!({ "emotions": "calm" })),
    ));
    let (chat, _repo) = workflow(stub);

    // Empty store: still a (empty) search_results list, not a missing key
    let response = chat
        .search_chat("discuss_emotions", "anything at all", "a@example.com")
        .unwrap();
    assert!(response.search_results.is_empty());

    let wire = serde_json::to_value(&response).unwrap();
    assert!(wire.get("search_results").is_some());
    assert_eq!(wire["function"], "discuss_emotions");
    assert_eq!(wire["arguments"]["emotions"], "calm");
}

#[test]
fn search_chat_grounding_is_owner_scoped() {
    let stub = Arc::new(ScriptedCompletion::new(
        vec![Some("unused".into())],
        None,
        Some(serde_json::json!({ "dream_signs": "rain" })),
    ));
    let (chat, repo) = workflow(stub);

    repo.create("Rain castle", "2026-04-01", "a castle built of rain", "a@example.com")
        .unwrap();
    repo.create("Rain castle", "2026-04-01", "a castle built of rain", "b@example.com")
        .unwrap();

    let response = chat
        .search_chat("analyze_dream_signs", "castle built of rain", "a@example.com")
        .unwrap();

    assert!(!response.search_results.is_empty());
    assert!(response
        .search_results
        .iter()
        .all(|d| d.owner_email == "a@example.com"));
}
