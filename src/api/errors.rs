use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::hemis_oauth::OAuthError;
use crate::services::question_import::ImportError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests(&'static str),
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<OAuthError> for ApiError {
    /// Missing provider settings are a server fault; everything the provider
    /// or the network does wrong is reported to the client as a bad login.
    fn from(err: OAuthError) -> Self {
        if err.is_config() {
            return Self::internal(err, "OAuth is not configured");
        }
        tracing::warn!(error = %err, "OAuth exchange failed");
        Self::BadRequest(format!("Authentication with HEMIS failed: {err}"))
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::BatchNotFound(_) => Self::NotFound("Question batch not found".to_string()),
            ImportError::Database(err) => Self::internal(err, "Failed to import question batch"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match self {
            ApiError::Unauthorized(message)
            | ApiError::Forbidden(message)
            | ApiError::TooManyRequests(message) => message.to_string(),
            ApiError::ServiceUnavailable(message) => {
                tracing::error!(error = %message, "Service unavailable");
                message
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                message
            }
            ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message) => message,
        };

        let mut response =
            (status, Json(ErrorResponse { status: status.as_u16(), detail })).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn unauthorized_sets_challenge_header() {
        let response = ApiError::Unauthorized("Session expired").into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).and_then(|v| v.to_str().ok()),
            Some("Bearer")
        );
        let json = body_json(response).await;
        assert_eq!(json["status"], 401);
        assert_eq!(json["detail"], "Session expired");
    }

    #[tokio::test]
    async fn oauth_errors_map_by_kind() {
        let config = ApiError::from(OAuthError::MissingConfig(vec!["TOKEN_URL_HEMIS"]));
        assert_eq!(config.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let provider = ApiError::from(OAuthError::Provider("invalid_grant".to_string()));
        assert_eq!(provider.status(), StatusCode::BAD_REQUEST);
        let json = body_json(provider.into_response()).await;
        assert!(json["detail"].as_str().unwrap_or_default().contains("invalid_grant"));
    }
}
