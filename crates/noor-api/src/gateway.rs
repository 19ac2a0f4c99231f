use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::debug;

use noor_gateway::connection;

use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::state::AppState;
use crate::tokens::authorize;

#[derive(Deserialize)]
pub struct GatewayQuery {
    token: String,
}

/// GET /gateway?token=: the token picks the session group and role.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<GatewayQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize(&state, &query.token, None).await?;
    let session_id = auth.session.id;
    let role = auth.grant.role;
    let dispatcher = state.dispatcher.clone();
    debug!("Gateway upgrade for session {} as {}", session_id, role.as_str());

    Ok(ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, session_id, role)))
}
