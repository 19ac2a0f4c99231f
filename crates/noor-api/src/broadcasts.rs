use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use scraper::Html;
use tracing::info;

use noor_types::api::{BroadcastRequest, ContentBroadcastResponse};
use noor_types::events::SessionEvent;
use noor_types::models::{ContentType, Role};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::{AppState, run_db};
use crate::tokens::authorize_mutation;
use crate::views;

/// 64 KiB cap on broadcast and asset bodies
pub const MAX_CONTENT_BYTES: usize = 64 * 1024;

/// Elements removed wholesale from host HTML, contents included.
const STRIPPED_ELEMENTS: &[&str] = &["script", "style"];

/// Remove `<script>` and `<style>` elements from host HTML.
///
/// The input is parsed as an HTML fragment, so the result is what a browser
/// would build from it, re-serialized without those elements. An unterminated
/// element swallows the rest of the input, as it does in a browser.
pub fn strip_unsafe_elements(html: &str) -> String {
    let mut fragment = Html::parse_fragment(html);

    let doomed: Vec<_> = fragment
        .tree
        .root()
        .descendants()
        .filter(|node| {
            node.value()
                .as_element()
                .is_some_and(|el| STRIPPED_ELEMENTS.contains(&el.name()))
        })
        .map(|node| node.id())
        .collect();

    for id in doomed {
        if let Some(mut node) = fragment.tree.get_mut(id) {
            node.detach();
        }
    }

    fragment.root_element().inner_html()
}

/// Shared size check for host-authored content.
pub(crate) fn check_content_size(content: &str) -> Result<(), ApiError> {
    if content.len() > MAX_CONTENT_BYTES {
        return Err(ApiError::bad_request(format!(
            "content is {} bytes, the limit is {}",
            content.len(),
            MAX_CONTENT_BYTES
        )));
    }
    Ok(())
}

/// POST /api/host/broadcast: persist, then notify the session group.
pub async fn broadcast_content(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<BroadcastRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize_mutation(&state, &req.host_token, Role::Host).await?;
    let sid = auth.session.id;

    check_content_size(&req.content)?;
    let content = match req.content_type {
        ContentType::Html => strip_unsafe_elements(&req.content),
        ContentType::Text => req.content,
    };
    if content.trim().is_empty() {
        return Err(ApiError::bad_request("content is empty"));
    }

    let content_type = req.content_type;
    let row = run_db(&state, move |db| db.insert_broadcast(sid, content_type, &content)).await?;
    let broadcast = views::broadcast(row);

    info!(
        "Broadcast {} ({} bytes, {}) stored for session {}",
        broadcast.id,
        broadcast.content.len(),
        content_type.as_str(),
        sid
    );

    state.dispatcher.publish(
        sid,
        &SessionEvent::ContentBroadcast {
            broadcast_id: broadcast.id,
            content_type: broadcast.content_type,
            content: broadcast.content.clone(),
            timestamp: broadcast.created_at,
        },
    );

    Ok((StatusCode::CREATED, Json(broadcast)))
}

/// GET /api/contentbroadcast/session/{id}: what a (re)loading canvas fetches.
pub async fn list_session_broadcasts(
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = run_db(&state, move |db| {
        if db.get_session(session_id)?.is_none() {
            return Ok(None);
        }
        db.list_broadcasts(session_id).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("session"))?;

    let broadcasts: Vec<ContentBroadcastResponse> = rows.into_iter().map(views::broadcast).collect();
    Ok(Json(broadcasts))
}
