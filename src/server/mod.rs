//! HTTP server for the chatbot.
//!
//! Serves the interactive page plus the endpoints it calls:
//! - Add knowledge (upload + ingestion)
//! - Chat
//! - Conversation history

pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppState, Backends};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ChatbotResult;

/// Start the HTTP server on the configured port.
///
/// When `shutdown_signal` completes the server stops accepting connections
/// and every ingestion wait still in flight is cancelled.
///
/// # Errors
/// Returns an error if the port cannot be bound or serving fails.
pub async fn run_server_with_shutdown<F>(state: Arc<AppState>, shutdown_signal: F) -> ChatbotResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app: Router = create_router(Arc::clone(&state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    tracing::info!("RAG chatbot listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal.await;
            state.shutdown();
        })
        .await?;

    Ok(())
}
