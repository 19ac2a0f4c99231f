use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use noor_db::NewSharedAsset;
use noor_types::api::{DeleteAssetRequest, ShareAssetRequest, SharedAssetResponse};
use noor_types::events::SessionEvent;
use noor_types::models::Role;

use crate::broadcasts::{check_content_size, strip_unsafe_elements};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::{AppState, run_db};
use crate::tokens::{authorize, authorize_mutation};
use crate::views;

const MAX_ASSET_TYPE_CHARS: usize = 64;
const MAX_SELECTOR_CHARS: usize = 512;

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// POST /api/host/share-asset
///
/// Either shape is accepted: inline `testContent`, or a `selector` (plus
/// optional `metadata`) pointing at content the canvas already has. Fields of
/// both shapes may be combined.
pub async fn share_asset(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ShareAssetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize_mutation(&state, &req.host_token, Role::Host).await?;
    let sid = auth.session.id;

    let asset_type = req.asset_type.trim().to_string();
    if asset_type.is_empty() || asset_type.chars().count() > MAX_ASSET_TYPE_CHARS {
        return Err(ApiError::bad_request("assetType must be 1-64 characters"));
    }

    let content = non_blank(req.test_content);
    let selector = non_blank(req.selector);
    if content.is_none() && selector.is_none() {
        return Err(ApiError::bad_request("either testContent or selector is required"));
    }
    if selector.as_ref().is_some_and(|s| s.chars().count() > MAX_SELECTOR_CHARS) {
        return Err(ApiError::bad_request("selector is too long"));
    }
    if let Some(c) = &content {
        check_content_size(c)?;
    }
    let content = content.map(|c| strip_unsafe_elements(&c));

    let metadata = match req.metadata {
        None | Some(serde_json::Value::Null) => None,
        Some(value) => {
            let raw = serde_json::to_string(&value).map_err(|e| ApiError::bad_request(e.to_string()))?;
            check_content_size(&raw)?;
            Some(raw)
        }
    };

    let share_id = Uuid::new_v4();
    let row = run_db(&state, move |db| {
        let share = share_id.to_string();
        db.insert_shared_asset(&NewSharedAsset {
            share_id: &share,
            session_id: sid,
            asset_type: &asset_type,
            selector: selector.as_deref(),
            content: content.as_deref(),
            metadata: metadata.as_deref(),
        })
    })
    .await?;
    let asset = views::shared_asset(row);

    info!("Asset {} ({}) shared in session {}", asset.share_id, asset.asset_type, sid);

    state.dispatcher.publish(
        sid,
        &SessionEvent::AssetShared {
            share_id: asset.share_id,
            asset_type: asset.asset_type.clone(),
            selector: asset.selector.clone(),
            test_content: asset.test_content.clone(),
            metadata: asset.metadata.clone(),
            timestamp: asset.created_at,
        },
    );

    Ok((StatusCode::CREATED, Json(asset)))
}

/// POST /api/host/delete-asset: soft delete.
pub async fn delete_asset(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<DeleteAssetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize_mutation(&state, &req.host_token, Role::Host).await?;
    let sid = auth.session.id;
    let share_id = req.share_id;

    let deleted = run_db(&state, move |db| db.soft_delete_asset(sid, &share_id.to_string())).await?;
    if !deleted {
        return Err(ApiError::NotFound("asset"));
    }

    state
        .dispatcher
        .publish(sid, &SessionEvent::AssetDeleted { share_id });

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/participant/assets/{token}: current assets, for canvas reloads.
pub async fn list_assets(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize(&state, &token, None).await?;
    let sid = auth.session.id;

    let rows = run_db(&state, move |db| db.list_shared_assets(sid)).await?;
    let assets: Vec<SharedAssetResponse> = rows.into_iter().map(views::shared_asset).collect();
    Ok(Json(assets))
}
