use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use denuncias_db::{Database, models::UserRow};
use denuncias_types::api::{
    LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UserResponse,
    ValidateTokenResponse,
};

use crate::error::ApiError;
use crate::password::{hash_password, verify_password};
use crate::token::TokenError;
use crate::{AppState, run_blocking};

/// Register a user: validates, hashes the password, persists.
pub fn create_user(db: &Database, email: &str, password: &str) -> Result<UserRow, ApiError> {
    let email = email.trim();
    let password = password.trim();
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::Validation("email and password are required".into()));
    }

    let password_hash = hash_password(password)?;
    let user = db.create_user(&Uuid::new_v4().to_string(), email, &password_hash)?;
    Ok(user)
}

/// Look up `email` and check `password` against its stored hash.
/// Unknown email and wrong password are indistinguishable to the caller.
pub fn check_credentials(db: &Database, email: &str, password: &str) -> Result<UserRow, ApiError> {
    let user = db
        .get_user_by_email(email.trim())?
        .ok_or(ApiError::CredentialMismatch)?;

    if !verify_password(password.trim(), &user.password)? {
        return Err(ApiError::CredentialMismatch);
    }
    Ok(user)
}

pub(crate) fn user_response(row: &UserRow) -> Result<UserResponse, ApiError> {
    let id = row
        .id
        .parse::<Uuid>()
        .map_err(|e| anyhow::anyhow!("Corrupt user id '{}': {}", row.id, e))?;
    Ok(UserResponse {
        id,
        email: row.email.clone(),
    })
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let email = req.email.unwrap_or_default();
    let password = req.password.unwrap_or_default();

    let db = state.clone();
    let user = run_blocking(move || create_user(&db.db, &email, &password)).await?;

    info!("Registered user {}", user.email);
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created".to_string(),
            user: user_response(&user)?,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let (Some(email), Some(password)) = (req.email, req.password) else {
        return Err(ApiError::Validation("email and password are required".into()));
    };
    if email.trim().is_empty() || password.trim().is_empty() {
        return Err(ApiError::Validation("email and password are required".into()));
    }

    let db = state.clone();
    let attempted = email.clone();
    let user = run_blocking(move || check_credentials(&db.db, &email, &password))
        .await
        .inspect_err(|e| {
            if matches!(e, ApiError::CredentialMismatch) {
                warn!("Failed login for {}", attempted);
            }
        })?;

    let user = user_response(&user)?;
    let token = state.tokens.issue(user.id, &user.email)?;

    info!("User {} logged in", user.email);
    Ok(Json(LoginResponse { token, user }))
}

/// POST /validate-token — checks the bearer token itself so the failure
/// kind (missing, expired, invalid) reaches the client.
pub async fn validate_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = state.tokens.validate_header(&headers)?;

    let db = state.clone();
    let user_id = claims.sub.to_string();
    let user = run_blocking(move || Ok(db.db.get_user_by_id(&user_id)?))
        .await?
        .ok_or(ApiError::Unauthorized(TokenError::Invalid))?;

    Ok(Json(ValidateTokenResponse {
        valid: true,
        user: user_response(&user)?,
    }))
}
