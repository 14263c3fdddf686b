use std::net::SocketAddr;

use anyhow::Context;
use axum::http::{header, HeaderMap};
use sqlx::PgPool;
use time::{Duration, PrimitiveDateTime};

use crate::core::metrics::USER_SESSIONS_CLEANED_TOTAL;
use crate::db::models::UserSession;
use crate::repositories;
use crate::services::hemis_oauth::TokenProvider;

const SECONDS_PER_DAY: i64 = 24 * 3600;

/// New provider tokens for an expired session.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TokenRefresh {
    pub(crate) access_token: String,
    pub(crate) refresh_token: Option<String>,
    pub(crate) expires_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RefreshOutcome {
    StillValid,
    Refreshed(TokenRefresh),
    Failed,
}

/// Decides whether `session` needs new tokens and asks the provider for
/// them. Provider failures are logged and reported as `Failed`.
pub(crate) async fn plan_refresh<P>(
    provider: Option<&P>,
    session: &UserSession,
    now: PrimitiveDateTime,
) -> RefreshOutcome
where
    P: TokenProvider + ?Sized,
{
    if !session.is_expired(now) {
        return RefreshOutcome::StillValid;
    }

    let Some(refresh_token) =
        session.refresh_token.as_deref().map(str::trim).filter(|token| !token.is_empty())
    else {
        return RefreshOutcome::Failed;
    };

    let Some(provider) = provider else {
        tracing::warn!(session_id = %session.id, "Cannot refresh session: oauth is not configured");
        return RefreshOutcome::Failed;
    };

    match provider.refresh_access_token(refresh_token).await {
        Ok(tokens) => match (tokens.access_token(), tokens.expires_at(now)) {
            (Some(access_token), Some(expires_at)) => RefreshOutcome::Refreshed(TokenRefresh {
                access_token: access_token.to_string(),
                refresh_token: tokens.refresh_token().map(str::to_string),
                expires_at,
            }),
            (None, _) => {
                tracing::warn!(
                    session_id = %session.id,
                    "Token refresh response carried no access token"
                );
                RefreshOutcome::Failed
            }
            (Some(_), None) => {
                tracing::warn!(session_id = %session.id, "Token refresh lifetime is out of range");
                RefreshOutcome::Failed
            }
        },
        Err(err) => {
            tracing::warn!(session_id = %session.id, error = %err, "Token refresh failed");
            RefreshOutcome::Failed
        }
    }
}

pub(crate) fn apply_refresh(session: &mut UserSession, refresh: TokenRefresh, now: PrimitiveDateTime) {
    session.access_token = refresh.access_token;
    if let Some(refresh_token) = refresh.refresh_token {
        session.refresh_token = Some(refresh_token);
    }
    session.expires_at = refresh.expires_at;
    session.updated_at = now;
}

/// Returns `true` when the session holds usable tokens afterwards. On any
/// failure the session is left untouched.
pub(crate) async fn refresh_if_needed<P>(
    pool: &PgPool,
    provider: Option<&P>,
    session: &mut UserSession,
    now: PrimitiveDateTime,
) -> bool
where
    P: TokenProvider + ?Sized,
{
    match plan_refresh(provider, session, now).await {
        RefreshOutcome::StillValid => true,
        RefreshOutcome::Failed => false,
        RefreshOutcome::Refreshed(refresh) => {
            let persisted = repositories::user_sessions::update_tokens(
                pool,
                &session.id,
                &refresh.access_token,
                refresh.refresh_token.as_deref(),
                refresh.expires_at,
                now,
            )
            .await;

            if let Err(err) = persisted {
                tracing::error!(
                    session_id = %session.id,
                    error = %err,
                    "Failed to persist refreshed tokens"
                );
                return false;
            }

            apply_refresh(session, refresh, now);
            tracing::info!(session_id = %session.id, "Session tokens refreshed");
            true
        }
    }
}

/// Deletes sessions that are expired or idle for more than `days`.
pub(crate) async fn cleanup_expired(
    pool: &PgPool,
    days: i64,
    now: PrimitiveDateTime,
) -> anyhow::Result<u64> {
    let stale_before = days
        .checked_mul(SECONDS_PER_DAY)
        .and_then(|seconds| now.checked_sub(Duration::seconds(seconds)))
        .ok_or_else(|| anyhow::anyhow!("cleanup window of {days} days is out of range"))?;
    let removed = repositories::user_sessions::delete_expired_or_stale(pool, now, stale_before)
        .await
        .context("delete expired sessions")?;

    if removed > 0 {
        metrics::counter!(USER_SESSIONS_CLEANED_TOTAL).increment(removed);
        tracing::info!(removed, days, "Removed expired user sessions");
    }

    Ok(removed)
}

pub(crate) fn should_touch_activity(
    session: &UserSession,
    now: PrimitiveDateTime,
    threshold_minutes: i64,
) -> bool {
    now - session.last_activity > Duration::minutes(threshold_minutes)
}

/// First `X-Forwarded-For` hop, else the peer address.
pub(crate) fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match forwarded {
        Some(ip) => Some(ip.to_string()),
        None => peer.map(|addr| addr.ip().to_string()),
    }
}

pub(crate) fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Coarse device class from a user agent string.
pub(crate) fn device_type(user_agent: &str) -> &'static str {
    let agent = user_agent.to_ascii_lowercase();
    if agent.is_empty() {
        "unknown"
    } else if agent.contains("ipad") || agent.contains("tablet") {
        "tablet"
    } else if agent.contains("mobile") || agent.contains("iphone") || agent.contains("android") {
        "mobile"
    } else {
        "desktop"
    }
}

pub(crate) fn device_info(user_agent: &str) -> serde_json::Value {
    serde_json::json!({ "device_type": device_type(user_agent) })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use serde_json::json;
    use sqlx::types::Json;
    use time::macros::datetime;

    use super::*;
    use crate::services::hemis_oauth::{OAuthError, TokenSet};

    struct FakeProvider {
        response: Result<serde_json::Value, String>,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn ok(body: serde_json::Value) -> Self {
            Self { response: Ok(body), calls: AtomicUsize::new(0) }
        }

        fn failing(message: &str) -> Self {
            Self { response: Err(message.to_string()), calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl TokenProvider for FakeProvider {
        async fn exchange_code(&self, _code: &str) -> Result<TokenSet, OAuthError> {
            unreachable!("not used by session refresh")
        }

        async fn fetch_profile(&self, _access_token: &str) -> Result<serde_json::Value, OAuthError> {
            unreachable!("not used by session refresh")
        }

        async fn refresh_access_token(&self, _refresh_token: &str) -> Result<TokenSet, OAuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.response {
                Ok(body) => Ok(serde_json::from_value(body.clone()).expect("token set")),
                Err(message) => Err(OAuthError::Provider(message.clone())),
            }
        }
    }

    fn session(expires_at: PrimitiveDateTime, refresh_token: Option<&str>) -> UserSession {
        let created = datetime!(2025-03-01 08:00:00);
        UserSession {
            id: "session-1".to_string(),
            student_id: "student-1".to_string(),
            session_key: "key-1".to_string(),
            access_token: "old-access".to_string(),
            refresh_token: refresh_token.map(str::to_string),
            token_type: "Bearer".to_string(),
            expires_at,
            user_agent: String::new(),
            ip_address: None,
            device_info: Json(json!({})),
            is_active: true,
            last_activity: created,
            created_at: created,
            updated_at: created,
        }
    }

    const NOW: PrimitiveDateTime = datetime!(2025-03-01 10:00:00);

    #[tokio::test]
    async fn unexpired_session_skips_provider() {
        let provider = FakeProvider::ok(json!({ "access_token": "new" }));
        let current = session(datetime!(2025-03-01 10:00:01), Some("refresh"));

        let outcome = plan_refresh(Some(&provider), &current, NOW).await;

        assert_eq!(outcome, RefreshOutcome::StillValid);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn expiry_boundary_counts_as_expired() {
        let provider = FakeProvider::ok(json!({ "access_token": "new", "expires_in": 600 }));
        let current = session(NOW, Some("refresh"));

        let outcome = plan_refresh(Some(&provider), &current, NOW).await;

        assert_eq!(
            outcome,
            RefreshOutcome::Refreshed(TokenRefresh {
                access_token: "new".to_string(),
                refresh_token: None,
                expires_at: datetime!(2025-03-01 10:10:00),
            })
        );
    }

    #[tokio::test]
    async fn refresh_moves_expiry_into_future() {
        let provider =
            FakeProvider::ok(json!({ "access_token": "new-access", "refresh_token": "rotated" }));
        let mut current = session(datetime!(2025-03-01 09:00:00), Some("refresh"));

        let RefreshOutcome::Refreshed(refresh) = plan_refresh(Some(&provider), &current, NOW).await
        else {
            panic!("expected refresh");
        };
        apply_refresh(&mut current, refresh, NOW);

        assert_eq!(current.access_token, "new-access");
        assert_eq!(current.refresh_token.as_deref(), Some("rotated"));
        assert_eq!(current.expires_at, datetime!(2025-03-01 11:00:00));
        assert!(current.is_valid(NOW));
    }

    #[tokio::test]
    async fn provider_error_leaves_session_unchanged() {
        let provider = FakeProvider::failing("invalid_grant");
        let current = session(datetime!(2025-03-01 09:00:00), Some("refresh"));

        let outcome = plan_refresh(Some(&provider), &current, NOW).await;

        assert_eq!(outcome, RefreshOutcome::Failed);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(current.access_token, "old-access");
        assert!(!current.is_valid(NOW));
    }

    #[tokio::test]
    async fn missing_access_token_in_response_fails() {
        let provider = FakeProvider::ok(json!({ "token_type": "Bearer" }));
        let current = session(datetime!(2025-03-01 09:00:00), Some("refresh"));

        assert_eq!(plan_refresh(Some(&provider), &current, NOW).await, RefreshOutcome::Failed);
    }

    #[tokio::test]
    async fn expired_session_without_refresh_token_fails() {
        let provider = FakeProvider::ok(json!({ "access_token": "new" }));
        let current = session(datetime!(2025-03-01 09:00:00), Some(" "));

        assert_eq!(plan_refresh(Some(&provider), &current, NOW).await, RefreshOutcome::Failed);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unconfigured_provider_fails() {
        let current = session(datetime!(2025-03-01 09:00:00), Some("refresh"));

        let outcome = plan_refresh::<FakeProvider>(None, &current, NOW).await;

        assert_eq!(outcome, RefreshOutcome::Failed);
    }

    #[tokio::test]
    async fn huge_provider_lifetime_is_capped() {
        let provider =
            FakeProvider::ok(json!({ "access_token": "x", "expires_in": 9_000_000_000_000_i64 }));
        let current = session(datetime!(2025-03-01 09:00:00), Some("refresh"));

        let RefreshOutcome::Refreshed(refresh) = plan_refresh(Some(&provider), &current, NOW).await
        else {
            panic!("expected refresh");
        };

        assert_eq!(refresh.expires_at, datetime!(2026-03-01 10:00:00));
    }

    #[tokio::test]
    async fn refresh_near_max_date_fails() {
        let provider = FakeProvider::ok(json!({ "access_token": "x", "expires_in": 600 }));
        let current = session(datetime!(2025-03-01 09:00:00), Some("refresh"));

        let outcome = plan_refresh(Some(&provider), &current, PrimitiveDateTime::MAX).await;

        assert_eq!(outcome, RefreshOutcome::Failed);
    }

    #[tokio::test]
    async fn cleanup_rejects_out_of_range_window() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgresql://quiz@localhost/unused")
            .expect("lazy pool");

        let err = cleanup_expired(&pool, 10_000_000_000_000, NOW).await.expect_err("overflow");
        assert!(err.to_string().contains("out of range"));

        let err = cleanup_expired(&pool, 10_000_000, NOW).await.expect_err("before year -9999");
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn activity_touch_threshold() {
        let mut current = session(datetime!(2025-03-01 12:00:00), None);
        current.last_activity = datetime!(2025-03-01 09:55:00);
        assert!(!should_touch_activity(&current, NOW, 5));

        current.last_activity = datetime!(2025-03-01 09:54:59);
        assert!(should_touch_activity(&current, NOW, 5));
    }

    #[test]
    fn client_ip_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        let peer: SocketAddr = "10.1.1.1:5000".parse().expect("addr");
        assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("10.1.1.1"));

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.2"));
        assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("203.0.113.7"));
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }

    #[test]
    fn device_type_classification() {
        assert_eq!(device_type(""), "unknown");
        assert_eq!(device_type("Mozilla/5.0 (iPad; CPU OS 17_0)"), "tablet");
        assert_eq!(device_type("Mozilla/5.0 (Linux; Android 14; Pixel 8) Mobile"), "mobile");
        assert_eq!(device_type("Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0"), "desktop");
    }
}
