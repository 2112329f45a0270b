use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;
use crate::error::ApiError;

/// Validate the bearer token and expose its `Claims` as a request extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = state.tokens.validate_header(req.headers())?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
