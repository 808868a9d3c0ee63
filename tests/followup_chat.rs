// tests/followup_chat.rs
//
// Follow-up questions against a scripted model. The session is owned by the
// test and passed in on every call.

use std::sync::Arc;

use treasury_lens::ai_adapter::{DynChatModel, MockChatModel};
use treasury_lens::followup::{Turn, TEMPERATURE};
use treasury_lens::{FollowUpAssistant, PipelineError, Session};

fn assistant(model: &Arc<MockChatModel>) -> FollowUpAssistant {
    let dyn_model: DynChatModel = model.clone();
    FollowUpAssistant::new(Some(dyn_model))
}

fn session() -> Session {
    Session {
        bullets: vec![
            "**Dollar firms on hawkish Fed** Real yields keep USD bid.".to_string(),
            "**Yen slides past 150** Intervention risk rises.".to_string(),
        ],
        history: Vec::new(),
    }
}

#[tokio::test]
async fn answer_is_trimmed_and_appended_to_history() {
    let model = Arc::new(MockChatModel::repeating(
        "  Watch the BoJ fixing and US 10Y yields.\n",
    ));
    let out = assistant(&model).ask(&session(), "What next for JPY?").await;

    assert!(!out.is_degraded());
    assert_eq!(
        out.value.answer.as_deref(),
        Some("Watch the BoJ fixing and US 10Y yields.")
    );
    assert_eq!(
        out.value.history,
        vec![
            Turn::user("What next for JPY?"),
            Turn::assistant("Watch the BoJ fixing and US 10Y yields."),
        ]
    );
}

#[tokio::test]
async fn conversation_continues_from_returned_history() {
    let model = Arc::new(MockChatModel::scripted(vec![
        Ok("First answer.".to_string()),
        Ok("Second answer.".to_string()),
    ]));
    let bot = assistant(&model);

    let mut s = session();
    let first = bot.ask(&s, "Q1").await;
    s.history = first.value.history;
    let second = bot.ask(&s, "Q2").await;

    assert_eq!(second.value.history.len(), 4);
    assert_eq!(second.value.answer.as_deref(), Some("Second answer."));

    let reqs = model.requests();
    assert_eq!(reqs.len(), 2);
    assert_eq!(reqs[1].temperature, TEMPERATURE);
    let contents: Vec<_> = reqs[1].messages.iter().map(|m| m.content.as_str()).collect();
    assert!(contents[1].starts_with("Summary of recent FX sentiment:\n- **Dollar firms"));
    assert_eq!(&contents[2..], ["Q1", "First answer.", "Q2"]);
}

#[tokio::test]
async fn model_failure_keeps_question_without_answer() {
    let model = Arc::new(MockChatModel::failing(PipelineError::Model(
        "HTTP 401 Unauthorized".into(),
    )));
    let out = assistant(&model).ask(&session(), "Why?").await;

    assert_eq!(out.error.as_ref().map(|e| e.kind()), Some("model"));
    assert_eq!(out.value.answer, None);
    assert_eq!(out.value.history, vec![Turn::user("Why?")]);
}

#[tokio::test]
async fn empty_reply_is_a_parse_error() {
    let model = Arc::new(MockChatModel::repeating("   "));
    let out = assistant(&model).ask(&session(), "Why?").await;
    assert_eq!(out.error.as_ref().map(|e| e.kind()), Some("parse"));
    assert_eq!(out.value.answer, None);
}

#[tokio::test]
async fn missing_model_is_a_configuration_error() {
    let out = FollowUpAssistant::new(None).ask(&session(), "Why?").await;
    assert_eq!(out.error.as_ref().map(|e| e.kind()), Some("configuration"));
    assert_eq!(out.value.history.len(), 1);
}

#[tokio::test]
async fn every_question_reaches_the_model() {
    let model = Arc::new(MockChatModel::repeating("Same."));
    let bot = assistant(&model);
    let _ = bot.ask(&session(), "Q").await;
    let _ = bot.ask(&session(), "Q").await;
    assert_eq!(model.calls(), 2);
}
