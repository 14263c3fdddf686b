use std::net::SocketAddr;

use async_trait::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::http::{header, request::Parts};
use axum_extra::extract::CookieJar;

use crate::api::errors::ApiError;
use crate::core::security::{self, Claims, TokenKind};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{AdminUser, Student, UserSession};
use crate::repositories;
use crate::services::hemis_oauth::OAuthClient;
use crate::services::user_sessions;

/// The logged-in student together with the session their token points at.
pub(crate) struct AuthContext {
    pub(crate) student: Student,
    pub(crate) session: UserSession,
}

pub(crate) struct CurrentAdmin(pub(crate) AdminUser);

/// Caller address and user agent, as recorded on sessions and login history.
pub(crate) struct ClientMeta {
    pub(crate) ip_address: Option<String>,
    pub(crate) user_agent: String,
}

/// Bearer header first, then the session cookie.
fn read_token(parts: &Parts, jar: &CookieJar, cookie_name: &str) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    match bearer {
        Some(token) => Some(token.to_string()),
        None => jar.get(cookie_name).map(|cookie| cookie.value().to_string()),
    }
}

async fn claims_from_request(
    parts: &mut Parts,
    state: &AppState,
    kind: TokenKind,
) -> Result<Claims, ApiError> {
    let jar = CookieJar::from_request_parts(parts, state)
        .await
        .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;
    let token = read_token(parts, &jar, &state.settings().session().cookie_name)
        .ok_or(ApiError::Unauthorized("Not authenticated"))?;

    let claims = security::verify_token(&token, state.settings())
        .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;
    if claims.kind != kind {
        return Err(ApiError::Unauthorized("Invalid authentication credentials"));
    }

    Ok(claims)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let claims = claims_from_request(parts, &app_state, TokenKind::Student).await?;
        let session_key =
            claims.sid.as_deref().ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let session = repositories::user_sessions::find_by_key(app_state.db(), session_key)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load session"))?;
        let Some(mut session) = session else {
            return Err(ApiError::Unauthorized("Session not found"));
        };
        if !session.is_active || session.student_id != claims.sub {
            return Err(ApiError::Unauthorized("Session is no longer active"));
        }

        let now = primitive_now_utc();
        if session.is_expired(now) {
            let provider =
                OAuthClient::new(app_state.settings().oauth(), app_state.http().clone()).ok();
            let refreshed = user_sessions::refresh_if_needed(
                app_state.db(),
                provider.as_ref(),
                &mut session,
                now,
            )
            .await;
            if !refreshed {
                return Err(ApiError::Unauthorized("Session expired, please log in again"));
            }
        }

        let student = repositories::students::find_by_id(app_state.db(), &session.student_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load student"))?
            .ok_or(ApiError::Unauthorized("Student not found"))?;

        let threshold = app_state.settings().session().activity_touch_minutes;
        if user_sessions::should_touch_activity(&session, now, threshold) {
            match repositories::user_sessions::touch_activity(app_state.db(), &session.id, now)
                .await
            {
                Ok(()) => session.last_activity = now,
                Err(err) => {
                    tracing::warn!(session_id = %session.id, error = %err, "Failed to touch session")
                }
            }
        }

        Ok(AuthContext { student, session })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = claims_from_request(parts, state, TokenKind::Admin).await?;

        let admin = repositories::admins::find_by_id(state.db(), &claims.sub)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load admin"))?
            .ok_or(ApiError::Unauthorized("Admin not found"))?;

        if !admin.is_active {
            return Err(ApiError::Forbidden("Admin account is disabled"));
        }

        Ok(CurrentAdmin(admin))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|info| info.0);

        Ok(ClientMeta {
            ip_address: user_sessions::client_ip(&parts.headers, peer),
            user_agent: user_sessions::user_agent(&parts.headers),
        })
    }
}
