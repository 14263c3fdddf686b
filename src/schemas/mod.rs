use std::collections::HashMap;

use serde::Serialize;

pub(crate) mod admin;
pub(crate) mod auth;
pub(crate) mod quiz;
pub(crate) mod student;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) login_url: String,
}
