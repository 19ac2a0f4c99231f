use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use noor_types::api::{AnnotationRequest, AnnotationResponse, DeleteAnnotationRequest};
use noor_types::events::SessionEvent;
use noor_types::models::Role;

use crate::broadcasts::check_content_size;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::{AppState, run_db};
use crate::tokens::{authorize, authorize_mutation};
use crate::views;

/// POST /api/host/annotations
pub async fn add_annotation(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AnnotationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize_mutation(&state, &req.host_token, Role::Host).await?;
    let sid = auth.session.id;

    if req.data.is_null() {
        return Err(ApiError::bad_request("annotation data is required"));
    }
    let raw = serde_json::to_string(&req.data).map_err(|e| ApiError::bad_request(e.to_string()))?;
    check_content_size(&raw)?;

    let row = run_db(&state, move |db| db.insert_annotation(sid, Role::Host.as_str(), &raw)).await?;
    let annotation = views::annotation(row);

    state.dispatcher.publish(
        sid,
        &SessionEvent::AnnotationAdded {
            annotation_id: annotation.id,
            data: annotation.data.clone(),
        },
    );

    Ok((StatusCode::CREATED, Json(annotation)))
}

/// POST /api/host/delete-annotation: soft delete.
pub async fn delete_annotation(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<DeleteAnnotationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize_mutation(&state, &req.host_token, Role::Host).await?;
    let sid = auth.session.id;
    let annotation_id = req.annotation_id;

    let deleted = run_db(&state, move |db| db.soft_delete_annotation(sid, annotation_id)).await?;
    if !deleted {
        return Err(ApiError::NotFound("annotation"));
    }

    state
        .dispatcher
        .publish(sid, &SessionEvent::AnnotationDeleted { annotation_id });

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/annotations/{token}
pub async fn list_annotations(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = authorize(&state, &token, None).await?;
    let sid = auth.session.id;

    let rows = run_db(&state, move |db| db.list_annotations(sid)).await?;
    let annotations: Vec<AnnotationResponse> = rows.into_iter().map(views::annotation).collect();
    Ok(Json(annotations))
}
