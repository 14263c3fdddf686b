use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{AuthContext, ClientMeta};
use crate::core::metrics;
use crate::core::redis::RateLimitPolicy;
use crate::core::security::{self, TokenKind};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Student, UserSession};
use crate::repositories;
use crate::schemas::auth::{CallbackQuery, LogoutResponse, MeResponse, StudentTokenResponse};
use crate::schemas::student::{SessionResponse, StudentResponse};
use crate::services::hemis_oauth::{OAuthClient, TokenProvider};
use crate::services::hemis_profile;
use crate::services::user_sessions;

pub(crate) const OAUTH_STATE_COOKIE: &str = "hemis_oauth_state";
const OAUTH_STATE_TTL_MINUTES: i64 = 10;

const LOGIN_RATE_LIMIT: RateLimitPolicy = RateLimitPolicy { limit: 20, window_seconds: 60 };

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// Starts the authorization-code flow: remembers a random `state` in a
/// short-lived cookie and redirects to the provider.
async fn login(
    State(state): State<AppState>,
    meta: ClientMeta,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    let subject = meta.ip_address.as_deref().unwrap_or("unknown");
    let allowed =
        state.redis().rate_limit("oauth_login", subject, LOGIN_RATE_LIMIT).await.unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    let client = OAuthClient::new(state.settings().oauth(), state.http().clone())?;
    let oauth_state = security::generate_opaque_token(24);
    let location = client.authorization_url(&oauth_state)?;

    let cookie = Cookie::build((OAUTH_STATE_COOKIE, oauth_state))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.settings().session().cookie_secure)
        .max_age(Duration::minutes(OAUTH_STATE_TTL_MINUTES));

    Ok((jar.add(cookie), Redirect::to(&location)))
}

async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    meta: ClientMeta,
    jar: CookieJar,
) -> Result<(CookieJar, Json<StudentTokenResponse>), ApiError> {
    let outcome = handle_callback(&state, query, &meta, &jar).await;
    metrics::record_oauth_login(outcome.is_ok());
    let (student, session) = outcome?;

    let token = security::create_access_token(
        &student.id,
        TokenKind::Student,
        Some(&session.session_key),
        state.settings(),
        None,
    )
    .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    let session_settings = state.settings().session();
    let cookie = Cookie::build((session_settings.cookie_name.clone(), token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(session_settings.cookie_secure)
        .max_age(Duration::minutes(
            state.settings().security().access_token_expire_minutes as i64,
        ));
    let jar = jar.remove(Cookie::build(OAUTH_STATE_COOKIE).path("/")).add(cookie);

    tracing::info!(student_id = %student.id, session_id = %session.id, "Student logged in");

    Ok((
        jar,
        Json(StudentTokenResponse {
            access_token: token,
            token_type: "bearer".to_string(),
            student: StudentResponse::from_db(student),
        }),
    ))
}

async fn handle_callback(
    state: &AppState,
    query: CallbackQuery,
    meta: &ClientMeta,
    jar: &CookieJar,
) -> Result<(Student, UserSession), ApiError> {
    if let Some(error) = query.error.as_deref().filter(|error| !error.is_empty()) {
        let description = query.error_description.as_deref().unwrap_or_default();
        tracing::warn!(error, description, "Identity provider rejected the login");
        return Err(ApiError::BadRequest(format!("Authorization failed: {error} {description}")
            .trim_end()
            .to_string()));
    }

    let code = query
        .code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Authorization code is missing".to_string()))?;

    if let Some(expected) = jar.get(OAUTH_STATE_COOKIE).map(|cookie| cookie.value()) {
        if query.state.as_deref() != Some(expected) {
            tracing::warn!("OAuth state mismatch");
            return Err(ApiError::BadRequest("Invalid OAuth state".to_string()));
        }
    }

    let client = OAuthClient::new(state.settings().oauth(), state.http().clone())?;
    let previous_key = reusable_session_key(state, jar);

    complete_login(state, &client, code, meta, previous_key).await
}

/// Session key from a still-valid student cookie, paired with its owner.
fn reusable_session_key(state: &AppState, jar: &CookieJar) -> Option<(String, String)> {
    let token = jar.get(&state.settings().session().cookie_name)?.value().to_string();
    let claims = security::verify_token(&token, state.settings()).ok()?;
    if claims.kind != TokenKind::Student {
        return None;
    }
    claims.sid.map(|sid| (claims.sub, sid))
}

/// Exchanges `code`, syncs the student and their group from the profile and
/// opens (or reopens) a session. Once the student is known every failure is
/// written to their login history.
pub(crate) async fn complete_login<P>(
    state: &AppState,
    provider: &P,
    code: &str,
    meta: &ClientMeta,
    previous_key: Option<(String, String)>,
) -> Result<(Student, UserSession), ApiError>
where
    P: TokenProvider + ?Sized,
{
    let tokens = provider.exchange_code(code).await?;
    let access_token = tokens
        .access_token()
        .ok_or_else(|| ApiError::BadRequest("HEMIS did not return an access token".to_string()))?
        .to_string();

    let payload = provider.fetch_profile(&access_token).await?;
    let profile = hemis_profile::parse_profile(payload).map_err(|err| {
        tracing::warn!(error = %err, "Unusable HEMIS profile");
        ApiError::BadRequest(format!("Invalid HEMIS profile: {err}"))
    })?;

    let now = primitive_now_utc();
    let expires_at = tokens.expires_at(now).ok_or_else(|| {
        ApiError::BadRequest("HEMIS returned an unusable token lifetime".to_string())
    })?;
    let student = sync_student(state, &profile, now).await?;

    let session_key = match previous_key {
        Some((owner, key)) if owner == student.id => key,
        _ => security::generate_opaque_token(32),
    };
    let device_type = user_sessions::device_type(&meta.user_agent);

    let session = repositories::user_sessions::upsert(
        state.db(),
        repositories::user_sessions::UpsertSession {
            id: &Uuid::new_v4().to_string(),
            student_id: &student.id,
            session_key: &session_key,
            access_token: &access_token,
            refresh_token: tokens.refresh_token(),
            token_type: tokens.token_type(),
            expires_at,
            user_agent: &meta.user_agent,
            ip_address: meta.ip_address.as_deref(),
            device_info: user_sessions::device_info(&meta.user_agent),
            now,
        },
    )
    .await;

    let session = match session {
        Ok(session) => session,
        Err(err) => {
            record_login(state, &student, None, meta, device_type, Some("session creation failed"))
                .await;
            return Err(ApiError::internal(err, "Failed to create session"));
        }
    };

    record_login(state, &student, Some(&session.id), meta, device_type, None).await;

    match user_sessions::cleanup_expired(state.db(), state.settings().session().cleanup_days, now)
        .await
    {
        Ok(_) => {}
        Err(err) => tracing::warn!(error = %err, "Session cleanup after login failed"),
    }

    Ok((student, session))
}

async fn sync_student(
    state: &AppState,
    profile: &hemis_profile::HemisProfile,
    now: time::PrimitiveDateTime,
) -> Result<Student, ApiError> {
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let group_id = match &profile.group {
        Some(group) => {
            let group = repositories::student_groups::get_or_create(
                &mut *tx,
                repositories::student_groups::NewGroup {
                    id: &Uuid::new_v4().to_string(),
                    group_code: &group.group_code,
                    group_name: &group.group_name,
                    faculty: &group.faculty,
                    level: &group.level,
                    education_year: &group.education_year,
                    education_form: &group.education_form,
                    education_lang: &group.education_lang,
                    now,
                },
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to save student group"))?;
            Some(group.id)
        }
        None => None,
    };

    let student = repositories::students::upsert_from_profile(
        &mut *tx,
        &Uuid::new_v4().to_string(),
        &profile.student,
        group_id.as_deref(),
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to save student"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit student"))?;
    Ok(student)
}

async fn record_login(
    state: &AppState,
    student: &Student,
    session_id: Option<&str>,
    meta: &ClientMeta,
    device_type: &str,
    failure_reason: Option<&str>,
) {
    let recorded = repositories::login_history::create(
        state.db(),
        repositories::login_history::NewLoginRecord {
            id: &Uuid::new_v4().to_string(),
            student_id: &student.id,
            session_id,
            login_time: primitive_now_utc(),
            ip_address: meta.ip_address.as_deref().unwrap_or_default(),
            user_agent: &meta.user_agent,
            device_type,
            success: failure_reason.is_none(),
            failure_reason: failure_reason.unwrap_or_default(),
        },
    )
    .await;

    if let Err(err) = recorded {
        tracing::warn!(student_id = %student.id, error = %err, "Failed to record login history");
    }
}

async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
    jar: CookieJar,
) -> Result<(CookieJar, Json<LogoutResponse>), ApiError> {
    let now = primitive_now_utc();
    repositories::user_sessions::deactivate(state.db(), &auth.session.id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to close session"))?;
    repositories::login_history::close_for_session(state.db(), &auth.session.id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update login history"))?;

    tracing::info!(student_id = %auth.student.id, session_id = %auth.session.id, "Student logged out");

    let cookie_name = state.settings().session().cookie_name.clone();
    Ok((
        jar.remove(Cookie::build(cookie_name).path("/")),
        Json(LogoutResponse { detail: "Logged out".to_string() }),
    ))
}

async fn me(auth: AuthContext) -> Json<MeResponse> {
    Json(MeResponse {
        student: StudentResponse::from_db(auth.student),
        session: SessionResponse::from_db(auth.session),
    })
}

#[cfg(test)]
mod tests;
