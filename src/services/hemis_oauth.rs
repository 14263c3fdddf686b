use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use time::{Duration, PrimitiveDateTime};

use crate::core::config::OAuthSettings;

const DEFAULT_TOKEN_TYPE: &str = "Bearer";
pub(crate) const DEFAULT_TOKEN_LIFETIME_SECONDS: i64 = 3600;
pub(crate) const MAX_TOKEN_LIFETIME_SECONDS: i64 = 365 * 24 * 3600;

#[derive(Debug, Error)]
pub(crate) enum OAuthError {
    #[error("oauth settings are incomplete: {}", .0.join(", "))]
    MissingConfig(Vec<&'static str>),
    #[error("invalid oauth url: {0}")]
    InvalidUrl(String),
    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("identity provider returned an error: {0}")]
    Provider(String),
    #[error("unexpected identity provider response: {0}")]
    Decode(String),
}

impl OAuthError {
    pub(crate) fn is_config(&self) -> bool {
        matches!(self, Self::MissingConfig(_) | Self::InvalidUrl(_))
    }
}

/// Token endpoint payload. Every field is optional because providers omit
/// what they do not rotate.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TokenSet {
    #[serde(default)]
    pub(crate) access_token: Option<String>,
    #[serde(default)]
    pub(crate) refresh_token: Option<String>,
    #[serde(default)]
    pub(crate) token_type: Option<String>,
    #[serde(default)]
    pub(crate) expires_in: Option<Value>,
}

impl TokenSet {
    /// Non-empty access token, if the provider sent one.
    pub(crate) fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().map(str::trim).filter(|token| !token.is_empty())
    }

    pub(crate) fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().map(str::trim).filter(|token| !token.is_empty())
    }

    pub(crate) fn token_type(&self) -> &str {
        self.token_type.as_deref().filter(|kind| !kind.is_empty()).unwrap_or(DEFAULT_TOKEN_TYPE)
    }

    /// `expires_in` as seconds, capped at one year; numeric strings are
    /// accepted, anything else falls back to one hour.
    pub(crate) fn lifetime_seconds(&self) -> i64 {
        let parsed = match &self.expires_in {
            Some(Value::Number(number)) => number.as_i64(),
            Some(Value::String(text)) => text.trim().parse().ok(),
            _ => None,
        };
        parsed
            .filter(|seconds| *seconds > 0)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECONDS)
            .min(MAX_TOKEN_LIFETIME_SECONDS)
    }

    /// `None` when `now + lifetime` leaves the representable range.
    pub(crate) fn expires_at(&self, now: PrimitiveDateTime) -> Option<PrimitiveDateTime> {
        now.checked_add(Duration::seconds(self.lifetime_seconds()))
    }
}

/// Provider operations used after the browser redirect.
#[async_trait]
pub(crate) trait TokenProvider: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, OAuthError>;
    async fn fetch_profile(&self, access_token: &str) -> Result<Value, OAuthError>;
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenSet, OAuthError>;
}

#[derive(Clone)]
pub(crate) struct OAuthClient {
    settings: OAuthSettings,
    http: reqwest::Client,
}

impl OAuthClient {
    pub(crate) fn new(settings: &OAuthSettings, http: reqwest::Client) -> Result<Self, OAuthError> {
        let missing = settings.missing_fields();
        if !missing.is_empty() {
            return Err(OAuthError::MissingConfig(missing));
        }

        Ok(Self { settings: settings.clone(), http })
    }

    pub(crate) fn authorization_url(&self, state: &str) -> Result<String, OAuthError> {
        let url = Url::parse_with_params(
            &self.settings.authorize_url,
            &[
                ("client_id", self.settings.client_id.as_str()),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
                ("response_type", "code"),
                ("state", state),
            ],
        )
        .map_err(|err| OAuthError::InvalidUrl(err.to_string()))?;

        Ok(url.to_string())
    }

    async fn post_token_form(&self, form: &[(&str, &str)]) -> Result<TokenSet, OAuthError> {
        let body: Value = self
            .http
            .post(&self.settings.token_url)
            .form(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        reject_provider_error(&body)?;
        serde_json::from_value(body).map_err(|err| OAuthError::Decode(err.to_string()))
    }
}

#[async_trait]
impl TokenProvider for OAuthClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, OAuthError> {
        self.post_token_form(&[
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<Value, OAuthError> {
        let body: Value = self
            .http
            .get(&self.settings.resource_owner_url)
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        reject_provider_error(&body)?;
        Ok(body)
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenSet, OAuthError> {
        self.post_token_form(&[
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }
}

/// Some provider endpoints answer 200 with an `error` member.
fn reject_provider_error(body: &Value) -> Result<(), OAuthError> {
    match body.get("error") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(message)) => Err(OAuthError::Provider(message.clone())),
        Some(other) => Err(OAuthError::Provider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> OAuthSettings {
        OAuthSettings {
            client_id: "quiz-portal".to_string(),
            client_secret: "s3cret".to_string(),
            redirect_uri: "https://quiz.example/api/v1/auth/callback".to_string(),
            authorize_url: "https://hemis.example/oauth/authorize".to_string(),
            token_url: "https://hemis.example/oauth/access-token".to_string(),
            resource_owner_url: "https://hemis.example/oauth/api/user".to_string(),
            timeout_seconds: 10,
        }
    }

    #[test]
    fn new_rejects_incomplete_settings() {
        let mut incomplete = settings();
        incomplete.token_url.clear();

        let err = OAuthClient::new(&incomplete, reqwest::Client::new())
            .err()
            .expect("missing token url must fail");

        assert!(err.is_config());
        assert!(err.to_string().contains("TOKEN_URL_HEMIS"));
    }

    #[test]
    fn authorization_url_carries_client_and_state() {
        let client = OAuthClient::new(&settings(), reqwest::Client::new()).expect("client");

        let url = client.authorization_url("abc123").expect("url");
        let parsed = Url::parse(&url).expect("parse");
        let pairs: Vec<(String, String)> =
            parsed.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();

        assert!(url.starts_with("https://hemis.example/oauth/authorize?"));
        assert!(pairs.contains(&("client_id".to_string(), "quiz-portal".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("state".to_string(), "abc123".to_string())));
        assert!(pairs.contains(&(
            "redirect_uri".to_string(),
            "https://quiz.example/api/v1/auth/callback".to_string()
        )));
    }

    #[test]
    fn token_set_defaults() {
        let tokens: TokenSet =
            serde_json::from_value(json!({ "access_token": " at " })).expect("tokens");

        assert_eq!(tokens.access_token(), Some("at"));
        assert_eq!(tokens.refresh_token(), None);
        assert_eq!(tokens.token_type(), "Bearer");
        assert_eq!(tokens.lifetime_seconds(), DEFAULT_TOKEN_LIFETIME_SECONDS);
    }

    #[test]
    fn token_set_accepts_string_lifetime() {
        let tokens: TokenSet =
            serde_json::from_value(json!({ "access_token": "at", "expires_in": "7200" }))
                .expect("tokens");

        assert_eq!(tokens.lifetime_seconds(), 7200);
    }

    #[test]
    fn token_set_caps_huge_lifetime() {
        let tokens: TokenSet =
            serde_json::from_value(json!({ "access_token": "at", "expires_in": 9_000_000_000_000_i64 }))
                .expect("tokens");
        let now = time::macros::datetime!(2025-03-01 10:00:00);

        assert_eq!(tokens.lifetime_seconds(), MAX_TOKEN_LIFETIME_SECONDS);
        assert_eq!(tokens.expires_at(now), Some(now + Duration::days(365)));
        assert_eq!(tokens.expires_at(PrimitiveDateTime::MAX), None);
    }

    #[test]
    fn provider_error_member_is_rejected() {
        let body = json!({ "error": "invalid_grant" });

        assert!(matches!(
            reject_provider_error(&body),
            Err(OAuthError::Provider(message)) if message == "invalid_grant"
        ));
        assert!(reject_provider_error(&json!({ "access_token": "x" })).is_ok());
    }
}
