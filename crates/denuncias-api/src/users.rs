use axum::{Extension, Json, extract::State, response::IntoResponse};

use denuncias_types::api::{Claims, UserResponse};

use crate::auth::user_response;
use crate::error::ApiError;
use crate::{AppState, run_blocking};

/// GET /api/users — ids and emails only.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = run_blocking(move || Ok(db.db.list_users()?)).await?;

    let users = rows
        .iter()
        .map(user_response)
        .collect::<Result<Vec<UserResponse>, _>>()?;

    Ok(Json(users))
}
