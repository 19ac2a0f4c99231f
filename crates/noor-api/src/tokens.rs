use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use rand::Rng;
use tracing::{info, warn};

use noor_db::models::SessionRow;
use noor_db::{NewSession, ProvisionedSession};
use noor_types::api::{GenerateTokenRequest, GenerateTokenResponse};
use noor_types::models::Role;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::{AppState, run_db};
use crate::views;

pub const TOKEN_LEN: usize = 8;

/// Uppercase alphanumerics without the look-alikes 0/O and 1/I.
const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const MAX_TITLE_CHARS: usize = 200;
const MAX_TTL_HOURS: u32 = 24 * 30;

/// What a valid token grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenGrant {
    pub session_id: i64,
    pub role: Role,
}

/// A validated token together with the session it belongs to.
#[derive(Debug, Clone)]
pub struct Authorized {
    pub grant: TokenGrant,
    pub session: SessionRow,
}

pub fn generate_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LEN)
        .map(|_| TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// Upper-case and shape-check a token from the wire. Anything that could not
/// have been issued is rejected without a DB round trip.
pub fn normalize_token(raw: &str) -> Option<String> {
    let token = raw.trim().to_ascii_uppercase();
    let well_formed = token.len() == TOKEN_LEN && token.bytes().all(|b| TOKEN_ALPHABET.contains(&b));
    well_formed.then_some(token)
}

/// Validate a token (bumping its access counter) and load its session.
/// With `role` set, a token of the other role is rejected as invalid.
pub async fn authorize(state: &AppState, raw_token: &str, role: Option<Role>) -> Result<Authorized, ApiError> {
    let token = normalize_token(raw_token).ok_or(ApiError::InvalidToken)?;

    let (token_row, session) = run_db(state, move |db| {
        let Some(token_row) = db.validate_token(&token)? else {
            return Ok(None);
        };
        let session = db.get_session(token_row.session_id)?;
        Ok(Some((token_row, session)))
    })
    .await?
    .ok_or(ApiError::InvalidToken)?;

    let granted: Role = token_row.role.parse().map_err(|e| {
        warn!("Corrupt role on token for session {}: {}", token_row.session_id, e);
        ApiError::InvalidToken
    })?;

    if role.is_some_and(|wanted| wanted != granted) {
        return Err(ApiError::InvalidToken);
    }

    let session = session.ok_or(ApiError::NotFound("session"))?;

    Ok(Authorized {
        grant: TokenGrant {
            session_id: session.id,
            role: granted,
        },
        session,
    })
}

/// [`authorize`] plus the session-active check every mutation needs.
pub async fn authorize_mutation(state: &AppState, raw_token: &str, role: Role) -> Result<Authorized, ApiError> {
    let auth = authorize(state, raw_token, Some(role)).await?;
    if !auth.session.is_active {
        return Err(ApiError::SessionInactive);
    }
    Ok(auth)
}

/// POST /api/host/generate-token: create (or reuse by `externalId`) a
/// session and hand out its host and participant tokens.
pub async fn generate_session_tokens(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<GenerateTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = req.title.trim().to_string();
    if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
        return Err(ApiError::bad_request("title must be 1-200 characters"));
    }

    let ttl_hours = match req.ttl_hours {
        Some(0) => return Err(ApiError::bad_request("ttlHours must be positive")),
        Some(h) if h > MAX_TTL_HOURS => {
            return Err(ApiError::bad_request("ttlHours must be at most 720"));
        }
        Some(h) => i64::from(h),
        None => state.settings.token_ttl_hours,
    };

    let external_id = req.external_id;
    let group_id = req.group_id;
    let description = req.description;

    let ProvisionedSession {
        session,
        host_token,
        user_token,
        reused,
    } = run_db(&state, move |db| {
        let new = NewSession {
            external_id,
            group_id,
            title: &title,
            description: description.as_deref(),
            ttl_hours,
        };
        db.provision_session(&new, generate_token)
    })
    .await?;

    info!(
        "{} session {} (external {:?}), tokens issued",
        if reused { "Reused" } else { "Created" },
        session.id,
        session.external_id
    );

    let status = if reused { StatusCode::OK } else { StatusCode::CREATED };
    Ok((
        status,
        Json(GenerateTokenResponse {
            session_id: session.id,
            host_token,
            user_token,
            expires_at: views::timestamp(&session.expires_at, "session expires_at"),
        }),
    ))
}
