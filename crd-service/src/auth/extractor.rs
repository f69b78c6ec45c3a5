use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use tracing::warn;

use crate::auth::session::get_session;
use crate::error::AppError;
use crate::server::AppState;

/// Extracted from a valid JWT Bearer token on protected routes.
///
/// Add this as a handler parameter to require an authenticated admin:
/// ```ignore
/// async fn handler(_auth: AdminAuth, ...) { }
/// ```
#[derive(Debug, Clone)]
pub struct AdminAuth {
    pub email: String,
    pub session_id: String,
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Extract Bearer token from Authorization header
        let TypedHeader(auth) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    warn!("auth rejected: missing or invalid Authorization header");
                    AppError::Unauthorized("missing or invalid Authorization header".into())
                })?;

        let claims = state.jwt_keys.decode(auth.token())?;

        // The token is only as alive as its session; sign-out revokes it
        let session = get_session(&state.sessions_ks, &claims.session_id)
            .await?
            .ok_or_else(|| {
                warn!(session_id = %claims.session_id, "auth rejected: session not found");
                AppError::Unauthorized("session not found".into())
            })?;

        Ok(AdminAuth {
            email: session.email,
            session_id: session.session_id,
        })
    }
}
