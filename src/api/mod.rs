use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::conversation::{Assistant, InboundEvent, Reply};
use crate::models::FavoriteEntry;

#[derive(Debug, Serialize, Deserialize)]
pub struct LocationEvent {
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TextEvent {
    pub user_id: String,
    pub text: String,
}

/// Structured reply plus the text a chat platform would send
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiReply {
    pub reply: Reply,
    pub text: String,
}

impl From<Reply> for ApiReply {
    fn from(reply: Reply) -> Self {
        let text = reply.render_text();
        Self { reply, text }
    }
}

pub fn router(assistant: Arc<Assistant>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events/location", post(post_location))
        .route("/events/text", post(post_text))
        .route("/users/{user_id}/favorites", get(get_favorites))
        .with_state(assistant)
}

async fn health() -> &'static str {
    "ok"
}

async fn post_location(
    State(assistant): State<Arc<Assistant>>,
    Json(payload): Json<LocationEvent>,
) -> Json<ApiReply> {
    let reply = assistant
        .handle(InboundEvent::Location {
            user_id: payload.user_id,
            latitude: payload.latitude,
            longitude: payload.longitude,
        })
        .await;
    Json(reply.into())
}

async fn post_text(
    State(assistant): State<Arc<Assistant>>,
    Json(payload): Json<TextEvent>,
) -> Json<ApiReply> {
    let reply = assistant
        .handle(InboundEvent::Text {
            user_id: payload.user_id,
            text: payload.text,
        })
        .await;
    Json(reply.into())
}

async fn get_favorites(
    State(assistant): State<Arc<Assistant>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<FavoriteEntry>>, StatusCode> {
    assistant.favorites(&user_id).await.map(Json).map_err(|e| {
        error!("Failed to list favorites for {}: {}", user_id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
