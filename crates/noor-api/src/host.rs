use axum::{Json, extract::State, response::IntoResponse};
use tracing::info;

use noor_types::api::{HostTokenRequest, RevokeTokensResponse};
use noor_types::events::SessionEvent;
use noor_types::models::Role;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::{AppState, run_db};
use crate::tokens::{authorize, authorize_mutation};
use crate::views;

/// POST /api/host/validate: session details for the host control panel.
pub async fn validate_host(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<HostTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize(&state, &req.host_token, Some(Role::Host)).await?;
    let sid = auth.session.id;
    let count = run_db(&state, move |db| db.count_participants(sid)).await?;
    Ok(Json(views::session_info(&auth.session, Role::Host, count)))
}

/// POST /api/host/session/start
pub async fn start_session(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<HostTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize_mutation(&state, &req.host_token, Role::Host).await?;
    let sid = auth.session.id;

    let (started, session, count) = run_db(&state, move |db| {
        let started = db.mark_session_started(sid)?;
        let session = db.get_session(sid)?;
        Ok((started, session, db.count_participants(sid)?))
    })
    .await?;
    let session = session.ok_or(ApiError::NotFound("session"))?;

    // Starting twice is a no-op; only the first start is announced
    if started {
        info!("Session {} started", sid);
        state.dispatcher.publish(
            sid,
            &SessionEvent::SessionStarted {
                session_id: sid,
                timestamp: chrono::Utc::now(),
            },
        );
    }

    Ok(Json(views::session_info(&session, Role::Host, count)))
}

/// POST /api/host/session/end
pub async fn end_session(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<HostTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize_mutation(&state, &req.host_token, Role::Host).await?;
    let sid = auth.session.id;

    let (ended, session, count) = run_db(&state, move |db| {
        let ended = db.mark_session_ended(sid)?;
        let session = db.get_session(sid)?;
        Ok((ended, session, db.count_participants(sid)?))
    })
    .await?;
    let session = session.ok_or(ApiError::NotFound("session"))?;

    if ended {
        info!("Session {} ended", sid);
        state.dispatcher.publish(
            sid,
            &SessionEvent::SessionEnded {
                session_id: sid,
                timestamp: chrono::Utc::now(),
            },
        );
    }

    Ok(Json(views::session_info(&session, Role::Host, count)))
}

/// POST /api/host/revoke-tokens: deactivate every token of the session,
/// including the one used for this call.
pub async fn revoke_tokens(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<HostTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize(&state, &req.host_token, Some(Role::Host)).await?;
    let sid = auth.session.id;

    let revoked = run_db(&state, move |db| db.revoke_session_tokens(sid)).await?;
    info!("Revoked {} tokens of session {}", revoked, sid);

    Ok(Json(RevokeTokensResponse { revoked }))
}
