use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AdminAuth;
use crate::auth::jwt::JwtKeys;
use crate::auth::password::verify_password;
use crate::auth::session::{
    Session, delete_session, get_session, get_session_by_refresh, now_epoch, store_session,
};
use crate::error::AppError;
use crate::server::AppState;

// ---------- POST /auth/login ----------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub session_id: String,
    pub access_token: String,
    pub access_expires_at: u64,
    pub refresh_token: String,
    pub refresh_expires_at: u64,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (admin_email, password_hash, access_expiry, refresh_expiry) = {
        let config = state.config.read().await;
        (
            config.auth.admin_email.clone(),
            config.auth.admin_password_hash.clone(),
            config.auth.access_token_expiry,
            config.auth.refresh_token_expiry,
        )
    };

    let admin_email =
        admin_email.ok_or_else(|| AppError::Authentication("admin account not configured".into()))?;
    let password_hash = password_hash
        .ok_or_else(|| AppError::Authentication("admin account not configured".into()))?;

    // Single admin role: the configured account is the only principal
    if !req.email.eq_ignore_ascii_case(&admin_email)
        || !verify_password(&req.password, &password_hash)
    {
        warn!(email = %req.email, "login rejected: bad credentials");
        return Err(AppError::Authentication("invalid email or password".into()));
    }

    let session = Session {
        session_id: Uuid::new_v4().to_string(),
        email: admin_email,
        created_at: now_epoch(),
        refresh_token: Uuid::new_v4().to_string(),
        refresh_expires_at: now_epoch() + refresh_expiry,
    };
    store_session(&state.sessions_ks, &session).await?;

    let claims = JwtKeys::new_claims(
        session.email.clone(),
        session.session_id.clone(),
        access_expiry,
    );
    let access_expires_at = claims.exp;
    let access_token = state.jwt_keys.encode(&claims)?;

    info!(email = %session.email, session_id = %session.session_id, "login successful");

    Ok(Json(LoginResponse {
        session_id: session.session_id,
        access_token,
        access_expires_at,
        refresh_token: session.refresh_token,
        refresh_expires_at: session.refresh_expires_at,
    }))
}

// ---------- POST /auth/refresh ----------

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub session_id: String,
    pub access_token: String,
    pub access_expires_at: u64,
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AppError> {
    let session_id = get_session_by_refresh(&state.sessions_ks, &req.refresh_token)
        .await?
        .ok_or_else(|| AppError::Authentication("refresh token not found".into()))?;

    let session = get_session(&state.sessions_ks, &session_id)
        .await?
        .ok_or_else(|| AppError::Authentication("session not found".into()))?;

    if now_epoch() > session.refresh_expires_at {
        return Err(AppError::Authentication("refresh token expired".into()));
    }

    let access_expiry = state.config.read().await.auth.access_token_expiry;

    let claims = JwtKeys::new_claims(
        session.email.clone(),
        session.session_id.clone(),
        access_expiry,
    );
    let access_expires_at = claims.exp;
    let access_token = state.jwt_keys.encode(&claims)?;

    info!(email = %session.email, session_id = %session.session_id, "token refreshed");

    Ok(Json(RefreshResponse {
        session_id: session.session_id,
        access_token,
        access_expires_at,
    }))
}

// ---------- POST /auth/logout ----------

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub signed_out: bool,
}

pub async fn logout(
    auth: AdminAuth,
    State(state): State<AppState>,
) -> Result<Json<LogoutResponse>, AppError> {
    delete_session(&state.sessions_ks, &auth.session_id).await?;
    info!(email = %auth.email, session_id = %auth.session_id, "signed out");
    Ok(Json(LogoutResponse { signed_out: true }))
}
