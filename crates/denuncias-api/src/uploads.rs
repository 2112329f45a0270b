use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};

use crate::AppState;
use crate::error::ApiError;
use crate::storage::content_type_for;

/// GET /uploads/{filename} — the name is client-supplied, so the store
/// refuses anything that would resolve outside its directory.
pub async fn serve_upload(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.images.retrieve(&filename).await?;

    Ok(([(header::CONTENT_TYPE, content_type_for(&filename))], bytes))
}
