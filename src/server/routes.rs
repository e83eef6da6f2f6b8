//! HTTP route handlers for the chatbot.

use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use uuid::Uuid;

use crate::chat::{ChatMessage, ModelInvoker};
use crate::ingest::{AddKnowledgeReport, KnowledgeIngestor, UploadRequest};
use crate::notice::Notices;

use super::state::AppState;

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// Create the router with all routes and the static page.
pub fn create_router(state: Arc<AppState>) -> Router {
    let static_dir = ServeDir::new(&state.config.static_dir);
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/knowledge",
            post(add_knowledge).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/chat", post(chat))
        .route("/api/history/{session_id}", get(history))
        .fallback_service(static_dir)
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "rag-chatbot",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Upload a file and ingest it into the knowledge base.
async fn add_knowledge(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<AddKnowledgeReport>, MultipartError> {
    let upload = read_upload(&mut multipart).await?;

    let ingestor = KnowledgeIngestor::new(
        state.backends.object_store.as_ref(),
        state.backends.ingestion.as_ref(),
        &state.config.target,
        state.config.poll,
    );
    let report = ingestor
        .add_knowledge_until(upload, state.cancellation())
        .await;

    Ok(Json(report))
}

/// Collect the `file` part and the optional `object_name` part.
async fn read_upload(multipart: &mut Multipart) -> Result<Option<UploadRequest>, MultipartError> {
    let mut file = None;
    let mut object_name = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let body = field.bytes().await?;
                // Browsers send an empty part when nothing was picked.
                if !file_name.is_empty() || !body.is_empty() {
                    file = Some(UploadRequest::new(file_name, body.to_vec()));
                }
            }
            "object_name" => {
                let text = field.text().await?;
                if !text.trim().is_empty() {
                    object_name = Some(text);
                }
            }
            _ => {}
        }
    }

    Ok(file.map(|file| match object_name {
        Some(name) => file.with_object_name(name),
        None => file,
    }))
}

/// Chat request.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Conversation to append to.
    pub session_id: Uuid,
    /// The user's message.
    pub message: String,
}

/// Conversation state after an action.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Messages, oldest first.
    pub history: Vec<ChatMessage>,
    /// Errors raised while answering.
    pub notices: Notices,
}

/// Answer a message and return the updated conversation.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let session = state.session(request.session_id);
    let mut conversation = session.lock().await;
    let invoker = ModelInvoker::new(state.backends.knowledge_base.as_ref(), &state.config.target);

    let mut notices = Notices::new();
    match invoker.respond(&conversation, &request.message).await {
        Ok(next) => *conversation = next,
        Err(e) => notices.error(format!("Could not get an answer: {e}")),
    }

    Json(ChatResponse {
        history: conversation.messages().to_vec(),
        notices,
    })
}

/// Current conversation of a session.
async fn history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ChatResponse>, StatusCode> {
    let conversation = state
        .history(session_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(ChatResponse {
        history: conversation.messages().to_vec(),
        notices: Notices::new(),
    }))
}
