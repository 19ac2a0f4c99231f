use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

/// Require `Authorization: Bearer <admin key>`.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    if !bool::from(key.as_bytes().ct_eq(state.settings.admin_key.as_bytes())) {
        warn!("Rejected admin request with wrong key");
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(req).await)
}
