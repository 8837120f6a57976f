//! Authentication endpoints.
//!
//! `POST /api/auth/login`: Unprotected: email + password → session token
//! `GET /api/auth/me`: Protected: the caller as seen by the token
//! `POST /api/auth/logout`: Protected: stateless, the client drops its token

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use super::{non_blank, MessageResponse};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::crypto::verify_password;
use crate::db;
use crate::models::User;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
}

/// `POST /api/auth/login`
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (Some(email), Some(password)) = (non_blank(request.email), request.password) else {
        return Err(ApiError::BadRequest("Email and password are required".into()));
    };
    if password.is_empty() {
        return Err(ApiError::BadRequest("Email and password are required".into()));
    }

    let conn = ctx.core.open_db()?;
    let Some((user, hash)) = db::get_user_credentials(&conn, &email)? else {
        tracing::warn!(email, "Login for unknown account");
        return Err(ApiError::InvalidCredentials);
    };
    if !verify_password(&password, &hash)? {
        tracing::warn!(email, "Login with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = ctx.core.tokens().issue(&user)?;
    tracing::info!(email, role = %user.role, "Login succeeded");

    Ok(Json(LoginResponse {
        user,
        token,
        expires_in: ctx.core.tokens().ttl_secs(),
    }))
}

/// `GET /api/auth/me`
pub async fn me(Extension(caller): Extension<UserContext>) -> Json<MeResponse> {
    Json(MeResponse { user: caller.user })
}

/// `POST /api/auth/logout`
pub async fn logout(Extension(caller): Extension<UserContext>) -> Json<MessageResponse> {
    tracing::info!(email = %caller.user.email, "Logout");
    Json(MessageResponse {
        message: "Logged out successfully",
    })
}
