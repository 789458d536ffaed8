//! HTTP read surface.
//!
//! Every handler reads exactly one snapshot from [`LiveState`].

use crate::state::LiveState;
use axum::extract::State;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the router serving the live state.
pub fn router(state: Arc<LiveState>) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/status", get(status))
        .route("/updates", get(updates))
        .route("/commits", get(commits))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn liveness() -> &'static str {
    "online"
}

async fn status(State(state): State<Arc<LiveState>>) -> Response {
    Json(&*state.status()).into_response()
}

async fn updates(State(state): State<Arc<LiveState>>) -> Response {
    match &*state.update() {
        Some(update) => Json(update).into_response(),
        // Same keys as a real update, with nothing in them.
        None => Json(json!({
            "id": "",
            "guildId": "",
            "channelId": "",
            "createdTimestamp": 0,
            "editedTimestamp": 0,
            "authorId": "",
            "authorName": "",
            "authorImage": "",
            "content": "",
            "cleanContent": "",
            "image": "",
        }))
        .into_response(),
    }
}

async fn commits(State(state): State<Arc<LiveState>>) -> Response {
    Json(&*state.commits()).into_response()
}
