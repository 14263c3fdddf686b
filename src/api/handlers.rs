use axum::{extract::State, http::StatusCode, response::IntoResponse, response::Response, Json};
use std::collections::HashMap;

use crate::api::errors::ApiError;
use crate::core::metrics;
use crate::core::redis::RedisHealth;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::{HealthResponse, RootResponse};

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let api = state.settings().api();
    let response = RootResponse {
        message: format!("{} API", api.project_name),
        version: api.version.clone(),
        login_url: format!("{}/auth/login", api.api_v1_str),
    };

    Json(response)
}

pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut status = "healthy".to_string();
    let mut components = HashMap::new();

    match state.redis().health().await {
        RedisHealth::Healthy => {
            components.insert("redis".to_string(), "healthy".to_string());
        }
        RedisHealth::Disconnected => {
            components.insert("redis".to_string(), "disconnected".to_string());
        }
        RedisHealth::Unhealthy(error) => {
            components.insert("redis".to_string(), format!("unhealthy: {error}"));
            status = "degraded".to_string();
        }
    }

    match repositories::health::ping(state.db()).await {
        Ok(()) => {
            components.insert("database".to_string(), "healthy".to_string());
        }
        Err(err) => {
            components.insert("database".to_string(), format!("unhealthy: {err}"));
            status = "unhealthy".to_string();
        }
    }

    Json(HealthResponse { service: "hemis-quiz".to_string(), status, components })
}

pub(crate) async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    if !state.settings().telemetry().prometheus_enabled {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }

    match metrics::render() {
        Some(body) => Ok(([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
            .into_response()),
        None => Err(ApiError::ServiceUnavailable("Metrics recorder is not installed".to_string())),
    }
}
