use axum::{
    Json,
    extract::State,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use noor_db::UserProfile;
use noor_types::api::{ParticipantResponse, RegisterRequest, RegisterResponse, TokenRequest};
use noor_types::events::SessionEvent;
use noor_types::models::{Role, resolve_display_name};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::{AppState, run_db};
use crate::tokens::{authorize, authorize_mutation};
use crate::views;

const MAX_NAME_CHARS: usize = 100;
const MAX_PROFILE_FIELD_CHARS: usize = 200;

/// POST /api/participant/validate-session
pub async fn validate_session(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize(&state, &req.token, Some(Role::Participant)).await?;
    let sid = auth.session.id;
    let count = run_db(&state, move |db| db.count_participants(sid)).await?;
    Ok(Json(views::session_info(&auth.session, Role::Participant, count)))
}

fn optional_field(value: Option<String>, field: &str) -> Result<Option<String>, ApiError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if v.chars().count() > MAX_PROFILE_FIELD_CHARS => {
            Err(ApiError::bad_request(format!("{} is too long", field)))
        }
        Some(v) if v.is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// POST /api/participant/register: first join or rejoin with a known `userId`.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize_mutation(&state, &req.token, Role::Participant).await?;
    let sid = auth.session.id;

    let name = req.name.trim().to_string();
    if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
        return Err(ApiError::bad_request("name must be 1-100 characters"));
    }
    let email = optional_field(req.email, "email")?;
    let country = optional_field(req.country, "country")?;
    let city = optional_field(req.city, "city")?;

    let user_id = req.user_id.unwrap_or_else(Uuid::new_v4);
    let uid = user_id.to_string();
    let stored_name = name.clone();

    let newly_registered = run_db(&state, move |db| {
        let profile = UserProfile {
            name: &stored_name,
            email: email.as_deref(),
            country: country.as_deref(),
            city: city.as_deref(),
        };
        db.upsert_user(&uid, &profile)?;
        db.register_participant(sid, &uid)
    })
    .await?;

    let display_name = resolve_display_name(Some(&name));

    if newly_registered {
        info!("{} ({}) registered in session {}", display_name, user_id, sid);
        state.dispatcher.publish(
            sid,
            &SessionEvent::ParticipantJoined {
                user_id,
                user_name: display_name.clone(),
            },
        );
    }

    Ok(Json(RegisterResponse {
        user_id,
        session_id: sid,
        display_name,
        rejoined: !newly_registered,
    }))
}

/// GET /api/participant/participants/{token}: roster for any token of the session.
pub async fn list_participants(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize(&state, &token, None).await?;
    let sid = auth.session.id;

    let rows = run_db(&state, move |db| db.list_participants(sid)).await?;
    let participants: Vec<ParticipantResponse> = rows.into_iter().map(views::participant).collect();

    Ok(Json(participants))
}
