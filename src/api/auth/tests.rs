use async_trait::async_trait;
use axum::http::{header, Method, Request, StatusCode};
use axum::body::Body;
use serde_json::{json, Value};
use time::Duration;
use tower::ServiceExt;

use super::{complete_login, OAUTH_STATE_COOKIE};
use crate::api::guards::ClientMeta;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::services::hemis_oauth::{OAuthError, TokenProvider, TokenSet};
use crate::test_support;

struct FakeHemis {
    profile: Value,
}

#[async_trait]
impl TokenProvider for FakeHemis {
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, OAuthError> {
        if code != "good-code" {
            return Err(OAuthError::Provider("invalid_grant".to_string()));
        }
        Ok(TokenSet {
            access_token: Some("hemis-access".to_string()),
            refresh_token: Some("hemis-refresh".to_string()),
            token_type: None,
            expires_in: Some(json!(7200)),
        })
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<Value, OAuthError> {
        Ok(self.profile.clone())
    }

    async fn refresh_access_token(&self, _refresh_token: &str) -> Result<TokenSet, OAuthError> {
        Err(OAuthError::Provider("not used".to_string()))
    }
}

fn profile() -> Value {
    json!({
        "student_id_number": "392211100777",
        "data": {
            "id": 777,
            "full_name": "Karimov Jasur",
            "email": "jasur@example.uz",
            "faculty": { "name": "Economics" },
            "level": { "code": "11", "name": "1-kurs" },
            "semester": { "name": "1-semestr", "education_year": { "name": "2025-2026" } }
        },
        "groups": [{ "id": "ECO-25", "name": "ECO-25 group" }]
    })
}

fn meta() -> ClientMeta {
    ClientMeta {
        ip_address: Some("198.51.100.4".to_string()),
        user_agent: "Mozilla/5.0 (X11; Linux x86_64)".to_string(),
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn complete_login_creates_student_group_and_session() {
    let ctx = test_support::setup_test_context().await;
    let provider = FakeHemis { profile: profile() };

    let (student, session) = complete_login(&ctx.state, &provider, "good-code", &meta(), None)
        .await
        .expect("login");

    assert_eq!(student.student_id_number.as_deref(), Some("392211100777"));
    assert!(student.group_id.is_some());
    assert_eq!(session.student_id, student.id);
    assert_eq!(session.refresh_token.as_deref(), Some("hemis-refresh"));
    assert!(session.expires_at > primitive_now_utc() + Duration::minutes(110));

    let history =
        repositories::login_history::list_recent_for_student(ctx.state.db(), &student.id, 10)
            .await
            .expect("history");
    assert_eq!(history.len(), 1);
    assert!(history[0].success);
    assert_eq!(history[0].device_type, "desktop");
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn repeated_login_reuses_own_session_key_only() {
    let ctx = test_support::setup_test_context().await;
    let provider = FakeHemis { profile: profile() };

    let (student, first) =
        complete_login(&ctx.state, &provider, "good-code", &meta(), None).await.expect("login");

    let reused = Some((student.id.clone(), first.session_key.clone()));
    let (_, second) =
        complete_login(&ctx.state, &provider, "good-code", &meta(), reused).await.expect("login");
    assert_eq!(second.id, first.id);
    assert_eq!(second.session_key, first.session_key);

    let foreign = Some(("someone-else".to_string(), first.session_key.clone()));
    let (_, third) =
        complete_login(&ctx.state, &provider, "good-code", &meta(), foreign).await.expect("login");
    assert_ne!(third.session_key, first.session_key);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn provider_rejection_is_a_bad_request() {
    let ctx = test_support::setup_test_context().await;
    let provider = FakeHemis { profile: profile() };

    let err = complete_login(&ctx.state, &provider, "bad-code", &meta(), None)
        .await
        .err()
        .expect("exchange must fail");
    assert!(matches!(err, crate::api::errors::ApiError::BadRequest(_)));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn callback_rejects_missing_code_and_state_mismatch() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/auth/callback", None, None))
        .await
        .expect("callback");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .uri("/api/v1/auth/callback?code=abc&state=forged")
        .header(header::COOKIE, format!("{OAUTH_STATE_COOKIE}=expected"))
        .body(Body::empty())
        .expect("request");
    let response = ctx.app.clone().oneshot(request).await.expect("callback");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert_eq!(body["detail"], "Invalid OAuth state");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/auth/callback?error=access_denied",
            None,
            None,
        ))
        .await
        .expect("callback");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn login_redirects_with_state_cookie() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/auth/login", None, None))
        .await
        .expect("login");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location");
    assert!(location.starts_with("http://127.0.0.1:9/oauth/authorize?"));
    assert!(location.contains("client_id=test-client"));

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("state cookie");
    assert!(cookie.starts_with(OAUTH_STATE_COOKIE));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn me_and_logout_use_the_session() {
    let ctx = test_support::setup_test_context().await;
    let student = test_support::insert_student(ctx.state.db(), "392211100888").await;
    let session =
        test_support::insert_session(ctx.state.db(), &student, Duration::hours(1), None).await;
    let token = test_support::student_token(&session, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/auth/me", Some(&token), None))
        .await
        .expect("me");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["student"]["id"], student.id.as_str());
    assert!(body["session"].get("access_token").is_none());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/logout",
            Some(&token),
            None,
        ))
        .await
        .expect("logout");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/auth/me", Some(&token), None))
        .await
        .expect("me after logout");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn expired_session_without_refresh_token_is_rejected() {
    let ctx = test_support::setup_test_context().await;
    let student = test_support::insert_student(ctx.state.db(), "392211100999").await;
    let session =
        test_support::insert_session(ctx.state.db(), &student, Duration::minutes(-5), None).await;
    let token = test_support::student_token(&session, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/auth/me", Some(&token), None))
        .await
        .expect("me");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
