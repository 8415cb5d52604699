//! First-party chat surface: the orchestrator that binds the tool registry
//! to the conversational model and streams the result.
//!
//! Thin by design: authentication happened in middleware, tool semantics
//! live in atelier-tools, pruning in atelier-context. This handler only
//! drives the loop: complete -> run requested tools sequentially -> feed
//! summarized results back -> repeat until the model answers in text.

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthExtractor;
use crate::state::AppState;
use atelier_context::ContextManager;
use atelier_core::ChatMessage;
use atelier_llm::{ChatModel, CompletionRequest, ToolCallRequest};
use atelier_tools::{execute_tool, registry, Locale, ToolContext};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::Stream;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

/// Upper bound on model/tool round-trips within one request. A loop that
/// runs this long is stuck, not working.
const MAX_TOOL_ITERATIONS: usize = 8;

const SYSTEM_PROMPT: &str = "You are the inventory assistant for an artist's studio. \
You can search artworks, editions, locations and history, compute statistics, import \
artworks from URLs, prepare exports, and update editions. Updates are two-phase: \
generate_update_confirmation first, and execute_edition_update only after the user has \
explicitly confirmed the card. Keep answers short and concrete; refer to records by \
title and id.";

// ============================================================================
// REQUEST SHAPE
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Response locale: "zh" or "en" (default "en").
    pub locale: Option<String>,
}

// ============================================================================
// HANDLER
// ============================================================================

/// POST /api/v1/chat - run one conversational turn, streaming events.
///
/// SSE events: `tool` (one per executed tool call), `message` (the final
/// assistant text), `error`.
pub async fn chat(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>>> {
    let model = state
        .chat_model
        .clone()
        .ok_or_else(|| ApiError::service_unavailable("No chat model configured"))?;

    if req.messages.is_empty() {
        return Err(ApiError::missing_field("messages"));
    }

    let locale = Locale::parse(req.locale.as_deref().unwrap_or("en"));
    let ctx = ToolContext::new(state.store.clone(), auth.user_id, locale)
        .with_expansion_model(model.clone(), state.config.expansion_model_id.clone())
        .with_extraction_model(model.clone(), state.config.extraction_model_id.clone());

    let manager = ContextManager::new(state.config.token_budget);
    let (tx, rx) = tokio::sync::mpsc::channel::<Event>(32);

    tokio::spawn(run_tool_loop(model, ctx, manager, req.messages, locale, tx));

    let stream = ReceiverStream::new(rx).map(Ok::<Event, std::convert::Infallible>);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

// ============================================================================
// ORCHESTRATION LOOP
// ============================================================================

/// Drive the model/tool loop, pushing SSE events as they happen. Tool calls
/// within one turn run sequentially; each result is summarized before it
/// re-enters the model's context.
pub(crate) async fn run_tool_loop(
    model: Arc<dyn ChatModel>,
    ctx: ToolContext,
    manager: ContextManager,
    mut messages: Vec<ChatMessage>,
    locale: Locale,
    tx: tokio::sync::mpsc::Sender<Event>,
) {
    let system = match locale {
        Locale::Zh => format!("{} Respond in Chinese.", SYSTEM_PROMPT),
        Locale::En => SYSTEM_PROMPT.to_string(),
    };
    let tools: Vec<_> = registry().iter().map(|d| d.to_decl()).collect();

    for _ in 0..MAX_TOOL_ITERATIONS {
        let fitted = manager.fit(messages.clone());
        let request = CompletionRequest::new(fitted)
            .with_system(system.clone())
            .with_tools(tools.clone());

        let response = match model.complete(&request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(error = %err, "chat completion failed");
                send_event(&tx, "error", json!({ "message": err.to_string() })).await;
                return;
            }
        };

        if response.tool_calls.is_empty() {
            let text = response.text.unwrap_or_default();
            send_event(&tx, "message", json!({ "content": text })).await;
            return;
        }

        // Record the assistant turn (text, if any, plus its tool calls).
        let calls: Vec<ToolCallRequest> = response.tool_calls.clone();
        let mut assistant = ChatMessage::assistant_tool_calls(
            serde_json::to_value(&calls).unwrap_or_default(),
        );
        if let Some(text) = response.text {
            assistant.content = text;
        }
        messages.push(assistant);

        for call in calls {
            let outcome = execute_tool(&ctx, &call.name, call.arguments.clone()).await;
            send_event(
                &tx,
                "tool",
                json!({
                    "name": call.name,
                    "is_error": outcome.is_error(),
                    "summary": outcome.model_text(),
                }),
            )
            .await;
            messages.push(ChatMessage::tool_result(call.id, outcome.model_text()));
        }
    }

    tracing::warn!("tool loop hit iteration cap without a final answer");
    send_event(
        &tx,
        "error",
        json!({ "message": "The assistant could not finish within the tool-call limit." }),
    )
    .await;
}

async fn send_event(tx: &tokio::sync::mpsc::Sender<Event>, kind: &str, payload: serde_json::Value) {
    let event = Event::default()
        .event(kind)
        .json_data(&payload)
        .unwrap_or_default();
    // A dropped receiver means the client went away; nothing to do.
    let _ = tx.send(event).await;
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::{new_entity_id, EditionStatus};
    use atelier_llm::{CompletionResponse, MockChatModel, StopReason};
    use atelier_store::{MemoryStore, Store};
    use chrono::Utc;

    fn tool_call_response(name: &str, arguments: serde_json::Value) -> CompletionResponse {
        CompletionResponse {
            text: None,
            tool_calls: vec![ToolCallRequest {
                id: "call_1".to_string(),
                name: name.to_string(),
                arguments,
            }],
            stop_reason: StopReason::ToolUse,
        }
    }

    async fn collect_events(
        model: Arc<dyn ChatModel>,
        ctx: ToolContext,
        messages: Vec<ChatMessage>,
    ) -> Vec<Event> {
        let (tx, mut rx) = tokio::sync::mpsc::channel(32);
        run_tool_loop(
            model,
            ctx,
            ContextManager::new(8000),
            messages,
            Locale::En,
            tx,
        )
        .await;
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn test_ctx(store: Arc<MemoryStore>, user_id: atelier_core::UserId) -> ToolContext {
        ToolContext::new(store, user_id, Locale::En)
    }

    #[tokio::test]
    async fn test_text_only_turn_emits_one_message_event() {
        let store = Arc::new(MemoryStore::new());
        let model = Arc::new(MockChatModel::new(vec![CompletionResponse::text_only(
            "You have no artworks yet.",
        )]));

        let events = collect_events(
            model,
            test_ctx(store, new_entity_id()),
            vec![ChatMessage::user("what do I have?")],
        )
        .await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_tool_call_turn_executes_and_continues() {
        let store = Arc::new(MemoryStore::new());
        let user_id = new_entity_id();

        let model = Arc::new(MockChatModel::new(vec![
            tool_call_response("search_artworks", json!({"query": "clouds"})),
            CompletionResponse::text_only("Nothing matched clouds."),
        ]));

        let events = collect_events(
            model.clone(),
            test_ctx(store, user_id),
            vec![ChatMessage::user("find cloud works")],
        )
        .await;
        // One tool event plus the final message.
        assert_eq!(events.len(), 2);

        // The second completion saw the tool result in its history.
        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        let last = &requests[1].messages;
        assert!(last
            .iter()
            .any(|m| m.role == atelier_core::MessageRole::Tool));
    }

    #[tokio::test]
    async fn test_write_through_chat_round_trips_confirmation() {
        let store = Arc::new(MemoryStore::new());
        let user_id = new_entity_id();

        // Seed an edition at a gallery.
        let now = Utc::now();
        let artwork = atelier_core::Artwork {
            artwork_id: new_entity_id(),
            user_id,
            title_en: "Cloud Study".to_string(),
            title_zh: String::new(),
            year: None,
            artwork_type: None,
            dimensions: None,
            materials: None,
            duration: None,
            source_url: None,
            thumbnail_url: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        store.create_artwork(&artwork).await.unwrap();
        let edition = atelier_core::Edition {
            edition_id: new_entity_id(),
            artwork_id: artwork.artwork_id,
            edition_number: None,
            status: EditionStatus::AtGallery,
            location_id: None,
            sale_price: None,
            sale_currency: None,
            buyer: None,
            sale_date: None,
            condition: None,
            storage_detail: None,
            consignment_start: None,
            consignment_end: None,
            loan_start: None,
            loan_end: None,
            created_at: now,
            updated_at: now,
        };
        store.create_edition(&edition).await.unwrap();

        let update_args = json!({
            "edition_id": edition.edition_id,
            "updates": {"status": "sold", "sale_price": 5000.0},
            "reason": "gallery sale"
        });
        let model = Arc::new(MockChatModel::new(vec![
            tool_call_response("generate_update_confirmation", update_args.clone()),
            CompletionResponse::text_only("Here is the card; confirm to apply."),
        ]));

        collect_events(
            model,
            test_ctx(store.clone(), user_id),
            vec![ChatMessage::user("mark the cloud edition sold")],
        )
        .await;

        // Phase 1 through the chat loop must not have mutated the edition.
        let stored = store
            .get_edition(edition.edition_id, user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, EditionStatus::AtGallery);
    }

    #[tokio::test]
    async fn test_model_failure_emits_error_event() {
        let store = Arc::new(MemoryStore::new());
        let model = Arc::new(MockChatModel::failing());
        let events = collect_events(
            model,
            test_ctx(store, new_entity_id()),
            vec![ChatMessage::user("hi")],
        )
        .await;
        assert_eq!(events.len(), 1);
    }
}
