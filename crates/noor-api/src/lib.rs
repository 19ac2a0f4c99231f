pub mod annotations;
pub mod assets;
pub mod broadcasts;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod host;
pub mod middleware;
pub mod participant;
pub mod questions;
pub mod state;
pub mod tokens;
mod views;

#[cfg(test)]
mod tests;

use axum::{
    Json, Router, middleware as axum_middleware,
    routing::{get, post},
};

pub use error::ApiError;
pub use state::{AppState, AppStateInner, Settings};

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// All REST routes plus the WebSocket gateway.
pub fn router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/api/host/generate-token", post(tokens::generate_session_tokens))
        .layer(axum_middleware::from_fn_with_state(state.clone(), middleware::require_admin));

    let host_routes = Router::new()
        .route("/api/host/validate", post(host::validate_host))
        .route("/api/host/session/start", post(host::start_session))
        .route("/api/host/session/end", post(host::end_session))
        .route("/api/host/revoke-tokens", post(host::revoke_tokens))
        .route("/api/host/share-asset", post(assets::share_asset))
        .route("/api/host/delete-asset", post(assets::delete_asset))
        .route("/api/host/broadcast", post(broadcasts::broadcast_content))
        .route("/api/host/questions/{host_token}", get(questions::list_for_host))
        .route("/api/host/question-status", post(questions::set_status))
        .route("/api/host/answer", post(questions::answer))
        .route("/api/host/annotations", post(annotations::add_annotation))
        .route("/api/host/delete-annotation", post(annotations::delete_annotation));

    let participant_routes = Router::new()
        .route("/api/participant/validate-session", post(participant::validate_session))
        .route("/api/participant/register", post(participant::register))
        .route("/api/participant/participants/{token}", get(participant::list_participants))
        .route("/api/participant/questions", post(questions::submit_question))
        .route("/api/participant/questions/{token}", get(questions::list_for_participant))
        .route("/api/participant/vote", post(questions::vote))
        .route("/api/participant/assets/{token}", get(assets::list_assets));

    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/api/contentbroadcast/session/{id}", get(broadcasts::list_session_broadcasts))
        .route("/api/annotations/{token}", get(annotations::list_annotations))
        .route("/gateway", get(gateway::ws_upgrade));

    Router::new()
        .merge(admin_routes)
        .merge(host_routes)
        .merge(participant_routes)
        .merge(public_routes)
        .with_state(state)
}
