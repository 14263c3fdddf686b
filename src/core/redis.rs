use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::{cmd, Client, RedisError};
use tokio::sync::RwLock;

const FIXED_WINDOW_SCRIPT: &str = r#"
    local current = redis.call("INCR", KEYS[1])
    if current == 1 then
        redis.call("EXPIRE", KEYS[1], ARGV[1])
    end
    return current
"#;

/// Optional Redis connection. Every operation degrades to a permissive
/// answer while disconnected.
#[derive(Clone)]
pub(crate) struct RedisHandle {
    url: String,
    manager: Arc<RwLock<Option<ConnectionManager>>>,
}

#[derive(Debug, Clone)]
pub(crate) enum RedisHealth {
    Healthy,
    Disconnected,
    Unhealthy(String),
}

/// Fixed-window limit: at most `limit` hits per `window_seconds`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RateLimitPolicy {
    pub(crate) limit: u64,
    pub(crate) window_seconds: u64,
}

impl RedisHandle {
    pub(crate) fn new(url: String) -> Self {
        Self { url, manager: Arc::new(RwLock::new(None)) }
    }

    pub(crate) async fn connect(&self) -> Result<(), RedisError> {
        let client = Client::open(self.url.clone())?;
        let manager = ConnectionManager::new(client).await?;
        *self.manager.write().await = Some(manager);
        Ok(())
    }

    pub(crate) async fn disconnect(&self) {
        *self.manager.write().await = None;
    }

    async fn connection(&self) -> Option<ConnectionManager> {
        self.manager.read().await.clone()
    }

    pub(crate) async fn health(&self) -> RedisHealth {
        let Some(mut manager) = self.connection().await else {
            return RedisHealth::Disconnected;
        };

        match cmd("PING").query_async::<_, String>(&mut manager).await {
            Ok(_) => RedisHealth::Healthy,
            Err(err) => RedisHealth::Unhealthy(err.to_string()),
        }
    }

    /// Counts one hit for `scope:subject`; returns `false` once the window is
    /// exhausted.
    pub(crate) async fn rate_limit(
        &self,
        scope: &str,
        subject: &str,
        policy: RateLimitPolicy,
    ) -> Result<bool, RedisError> {
        let Some(mut manager) = self.connection().await else {
            return Ok(true);
        };

        let key = format!("rl:{scope}:{subject}");
        let current: i64 = redis::Script::new(FIXED_WINDOW_SCRIPT)
            .key(key)
            .arg(policy.window_seconds as i64)
            .invoke_async(&mut manager)
            .await?;

        Ok(current <= policy.limit as i64)
    }
}
