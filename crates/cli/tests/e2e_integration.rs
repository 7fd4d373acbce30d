//! End-to-end integration tests for the NoteChat pipeline.
//!
//! These tests exercise the full path from notes + history + user input to a
//! streamed reply, including budgeting, assembly, and cancellation.

use std::sync::Arc;

use notechat_agent::context::{budget_history, manage_article_content, manage_context_messages};
use notechat_agent::{AssemblyInput, ChatSession, ContextAssembler, TokenBudget};
use notechat_core::cancel::CancellationToken;
use notechat_core::error::ProviderError;
use notechat_core::message::{ChatMessage, Role};
use notechat_core::provider::{
    CompletionRequest, CompletionResponse, Provider, StreamChunk, StreamReceiver, Usage,
};
use tokio::sync::mpsc;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that streams scripted replies in sequence.
struct ScriptedProvider {
    replies: std::sync::Mutex<Vec<Vec<String>>>,
    requests: std::sync::Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    fn new(replies: Vec<Vec<&str>>) -> Self {
        Self {
            replies: std::sync::Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.into_iter().map(String::from).collect())
                    .collect(),
            ),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> CompletionRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let model = request.model.clone();
        let mut rx = self.stream(request).await?;
        let mut text = String::new();
        while let Some(chunk) = rx.recv().await {
            if let Some(content) = chunk?.content {
                text.push_str(&content);
            }
        }
        Ok(CompletionResponse {
            message: ChatMessage::assistant(text),
            usage: None,
            model,
        })
    }

    async fn stream(&self, request: CompletionRequest) -> Result<StreamReceiver, ProviderError> {
        let prompt_tokens = request.messages.len() as u32;
        self.requests.lock().unwrap().push(request);
        let deltas = {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Err(ProviderError::from_status(500, "script exhausted"));
            }
            replies.remove(0)
        };

        let (tx, rx) = mpsc::channel(deltas.len() + 1);
        let completion_tokens = deltas.len() as u32;
        for delta in deltas {
            let _ = tx.try_send(Ok(StreamChunk::delta(delta)));
        }
        let _ = tx.try_send(Ok(StreamChunk::done(Some(Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }))));
        Ok(rx)
    }
}

fn long_note() -> String {
    let mut note = String::from("# Kubernetes notes\n\n");
    for i in 0..60 {
        note.push_str(&format!(
            "Section {i}: routine operational detail about clusters and nodes. {}\n\n",
            "More text here. ".repeat(10)
        ));
    }
    note.push_str("## Deployments\n\n- rollout restart\n- rollout status\n- rollback with undo\n");
    note
}

fn conversation(n: usize) -> Vec<ChatMessage> {
    (0..n)
        .map(|i| {
            let text = format!("turn {i}: {}", "discussion ".repeat(20));
            if i % 2 == 0 {
                ChatMessage::user(text)
            } else {
                ChatMessage::assistant(text)
            }
        })
        .collect()
}

// ── Assembly ─────────────────────────────────────────────────────────────

#[test]
fn assembled_request_respects_layer_order() {
    let docs = vec![long_note(), "Short todo list.".to_string()];
    let history = conversation(30);
    let assembler = ContextAssembler::new(TokenBudget {
        total: 4000,
        ..TokenBudget::default()
    });

    let ctx = assembler.assemble(&AssemblyInput {
        system_prompt: "You answer from notes.",
        role_prompt: "Be concise.",
        documents: &docs,
        history: &history,
        user_message: "How do I roll back a deployment?",
    });

    assert_eq!(ctx.messages[0].role(), Role::System);
    assert_eq!(
        ctx.messages[0].content(),
        "You answer from notes.\n\nBe concise."
    );
    let last = ctx.messages.last().unwrap();
    assert_eq!(last.role(), Role::User);
    assert_eq!(last.content(), "How do I roll back a deployment?");

    let history_part: Vec<&ChatMessage> = ctx
        .messages
        .iter()
        .filter(|m| m.content().starts_with("turn "))
        .collect();
    let turns: Vec<usize> = history_part
        .iter()
        .map(|m| {
            m.content()["turn ".len()..]
                .split(':')
                .next()
                .unwrap()
                .parse()
                .unwrap()
        })
        .collect();
    assert!(!turns.is_empty());
    assert!(turns.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(*turns.last().unwrap(), 29);

    assert!(ctx.metadata.articles.tokens_used <= assembler.budget().article_tokens());
    assert!(ctx.metadata.history.strategy.unwrap().recent_tail_size <= 8);
}

#[test]
fn long_note_keeps_query_relevant_section() {
    let docs = vec![long_note()];
    let messages = manage_article_content(&docs, 600, "rollback deployment");
    assert_eq!(messages.len(), 1);
    let content = messages[0].content();
    assert!(content.starts_with("[Long document: showing "));
    assert!(content.contains("## Deployments"));
}

#[test]
fn history_without_room_falls_back_to_latest_turn() {
    let history = conversation(12);
    let out = manage_context_messages(&history, 15, true);
    assert_eq!(out.len(), 1);
    assert!(out[0].content().starts_with("turn 11:"));

    let report = budget_history(&history, 15, true).report;
    assert!(report.fallback_used);
    assert_eq!(report.messages_dropped, 11);
}

#[test]
fn metadata_serializes_for_display() {
    let ctx = ContextAssembler::with_default_budget().assemble(&AssemblyInput {
        system_prompt: "sys",
        role_prompt: "",
        documents: &[],
        history: &conversation(3),
        user_message: "q",
    });
    let json = serde_json::to_value(&ctx.metadata).unwrap();
    assert_eq!(json["budget"], 16000);
    assert_eq!(json["over_budget"], false);
    assert_eq!(json["per_layer"].as_array().unwrap().len(), 4);
}

// ── Chat sessions ────────────────────────────────────────────────────────

#[tokio::test]
async fn multi_turn_chat_with_notes() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        vec!["Use ", "`kubectl rollout undo`."],
        vec!["Yes, ", "it targets ", "the previous revision."],
    ]));
    let session = ChatSession::new(provider.clone(), "mock-model")
        .with_system_prompt("Answer from the notes.")
        .with_assembler(ContextAssembler::new(TokenBudget {
            total: 6000,
            ..TokenBudget::default()
        }));
    let docs = vec![long_note()];
    let cancel = CancellationToken::new();
    let mut history: Vec<ChatMessage> = Vec::new();

    let first = session
        .send(&history, &docs, "How do I roll back?", &cancel, |_| {})
        .await
        .unwrap();
    assert_eq!(first.reply.content(), "Use `kubectl rollout undo`.");
    assert_eq!(first.metadata.articles.documents_total, 1);
    history.push(ChatMessage::user("How do I roll back?"));
    history.push(first.reply);

    let mut streamed = Vec::new();
    let second = session
        .send(&history, &docs, "Previous revision?", &cancel, |d| {
            streamed.push(d.to_string())
        })
        .await
        .unwrap();
    assert_eq!(streamed, vec!["Yes, ", "it targets ", "the previous revision."]);
    assert_eq!(second.usage.unwrap().completion_tokens, 3);
    assert_eq!(provider.calls(), 2);

    let request = provider.last_request();
    assert!(request.stream);
    let n = request.messages.len();
    assert_eq!(request.messages[n - 3], ChatMessage::user("How do I roll back?"));
    assert_eq!(
        request.messages[n - 2],
        ChatMessage::assistant("Use `kubectl rollout undo`.")
    );
    assert_eq!(request.messages[n - 1], ChatMessage::user("Previous revision?"));
}

#[tokio::test]
async fn stop_button_ends_reply_early() {
    let provider = Arc::new(ScriptedProvider::new(vec![vec![
        "alpha ", "beta ", "gamma ", "delta",
    ]]));
    let session = ChatSession::new(provider, "mock-model");
    let cancel = CancellationToken::new();
    let stop = cancel.clone();

    let mut received = 0;
    let turn = session
        .send(&[], &[], "list", &cancel, |_| {
            received += 1;
            if received == 2 {
                stop.cancel();
            }
        })
        .await
        .unwrap();

    assert!(turn.cancelled);
    assert_eq!(received, 2);
    assert_eq!(turn.reply.content(), "alpha beta ");
}

#[tokio::test]
async fn provider_failure_surfaces_error() {
    let provider = Arc::new(ScriptedProvider::new(vec![]));
    let session = ChatSession::new(provider, "mock-model");
    let err = session
        .send(&[], &[], "hello", &CancellationToken::new(), |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::ApiError { status_code: 500, .. }));
    assert!(err.is_transient());
}
