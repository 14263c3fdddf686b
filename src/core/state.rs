use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::core::{config::Settings, redis::RedisHandle};

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    redis: RedisHandle,
    http: reqwest::Client,
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: PgPool, redis: RedisHandle) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.oauth().timeout_seconds))
            .build()?;

        Ok(Self { inner: Arc::new(InnerState { settings, db, redis, http }) })
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    /// Shared client for calls to the identity provider.
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }
}
