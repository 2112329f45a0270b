use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info, warn};

use denuncias_db::StoreError;
use denuncias_db::models::{ComplaintRow, NewComplaint};
use denuncias_types::api::{Claims, ComplaintResponse, CreateComplaintRequest, MessageResponse};

use crate::error::ApiError;
use crate::{AppState, run_blocking};

fn to_response(row: ComplaintRow) -> ComplaintResponse {
    ComplaintResponse {
        id: row.id,
        email: row.email,
        description: row.description,
        location: row.location,
        photo: row.photo,
        created_at: row.created_at,
    }
}

fn not_found(e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound => ApiError::NotFound("Complaint not found"),
        other => other.into(),
    }
}

/// POST /api/complaints — store the photo, then the record that points at it.
pub async fn create_complaint(
    State(state): State<AppState>,
    payload: Result<Json<CreateComplaintRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let email = req.email.as_deref().unwrap_or_default().trim().to_string();
    let description = req.description.as_deref().unwrap_or_default().trim().to_string();
    let location = req
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string);
    let photo = req.photo.unwrap_or_default();

    if email.is_empty() || description.is_empty() || photo.trim().is_empty() {
        return Err(ApiError::Validation(
            "email, description and photo are required".into(),
        ));
    }

    let filename = state.images.store(&photo).await?;

    let db = state.clone();
    let photo_ref = filename.clone();
    let inserted = run_blocking(move || {
        let row = db.db.create_complaint(&NewComplaint {
            email: &email,
            description: &description,
            location: location.as_deref(),
            photo: &photo_ref,
        })?;
        Ok(row)
    })
    .await;

    let row = match inserted {
        Ok(row) => row,
        Err(e) => {
            // No record references the photo, so it must not outlive this request
            if let Err(cleanup) = state.images.remove(&filename).await {
                error!("Failed to remove orphaned image {}: {}", filename, cleanup);
            }
            return Err(e);
        }
    };

    Ok((StatusCode::CREATED, Json(to_response(row))))
}

/// GET /api/complaints — newest first, unpaginated.
pub async fn list_complaints(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = run_blocking(move || Ok(db.db.list_complaints()?)).await?;

    let complaints: Vec<ComplaintResponse> = rows.into_iter().map(to_response).collect();
    Ok(Json(complaints))
}

pub async fn get_complaint(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;

    let db = state.clone();
    let row = run_blocking(move || db.db.get_complaint(id).map_err(not_found)).await?;

    Ok(Json(to_response(row)))
}

/// DELETE /api/complaints/{id} — the record goes first; photo removal is
/// best-effort and never undoes the delete.
pub async fn delete_complaint(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;

    let db = state.clone();
    let row = run_blocking(move || db.db.delete_complaint(id).map_err(not_found)).await?;

    if let Err(e) = state.images.remove(&row.photo).await {
        warn!("Complaint {} deleted but image {} was not removed: {}", id, row.photo, e);
    }

    info!("Complaint {} deleted by {}", id, claims.email);
    Ok(Json(MessageResponse {
        message: format!("Complaint {} deleted", id),
    }))
}
