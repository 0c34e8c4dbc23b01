//! HTTP interface for the CV assistant.

use crate::rag::RagEngine;
use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of a chat request
#[derive(Debug, Deserialize, Serialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Body of a successful chat reply
#[derive(Debug, Deserialize, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Any failure while answering, reported as a 500 with its message
pub struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "detail": self.0.to_string() })),
        )
            .into_response()
    }
}

async fn chat(
    State(engine): State<Arc<RagEngine>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    match engine.answer(&request.message).await {
        Ok(response) => Ok(Json(ChatResponse { response })),
        Err(e) => {
            error!("Chat request failed: {:#}", e);
            Err(e.into())
        }
    }
}

async fn health(State(engine): State<Arc<RagEngine>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "chunks": engine.chunks().len(),
    }))
}

/// Build the router serving the chat endpoint
pub fn router(engine: Arc<RagEngine>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .with_state(engine)
}

/// Serve the chat endpoint until the process is stopped
pub async fn serve(engine: Arc<RagEngine>, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("CV assistant listening on {}", addr);

    axum::serve(listener, router(engine)).await?;

    Ok(())
}
