use thiserror::Error;

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(super) server: ServerSettings,
    pub(super) runtime: RuntimeSettings,
    pub(super) api: ApiSettings,
    pub(super) security: SecuritySettings,
    pub(super) cors: CorsSettings,
    pub(super) database: DatabaseSettings,
    pub(super) redis: RedisSettings,
    pub(super) oauth: OAuthSettings,
    pub(super) session: SessionSettings,
    pub(super) admin: AdminSettings,
    pub(super) telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub(crate) struct ServerSettings {
    pub(super) host: ServerHost,
    pub(super) port: ServerPort,
}

#[derive(Debug, Clone)]
pub(crate) struct ApiSettings {
    pub(crate) project_name: String,
    pub(crate) version: String,
    pub(crate) api_v1_str: String,
}

#[derive(Debug, Clone)]
pub(crate) struct SecuritySettings {
    pub(crate) secret_key: String,
    pub(crate) access_token_expire_minutes: u64,
    pub(crate) algorithm: String,
}

#[derive(Debug, Clone)]
pub(crate) struct CorsSettings {
    pub(crate) origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct DatabaseSettings {
    pub(crate) postgres_server: String,
    pub(crate) postgres_port: u16,
    pub(crate) postgres_user: String,
    pub(crate) postgres_password: String,
    pub(crate) postgres_db: String,
    pub(crate) database_url: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct RedisSettings {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) db: u16,
    pub(crate) password: String,
}

/// Identity provider endpoints and client credentials.
///
/// Empty strings mean "not configured"; the OAuth client refuses to build
/// until every field is present.
#[derive(Debug, Clone, Default)]
pub(crate) struct OAuthSettings {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) redirect_uri: String,
    pub(crate) authorize_url: String,
    pub(crate) token_url: String,
    pub(crate) resource_owner_url: String,
    pub(crate) timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct SessionSettings {
    pub(crate) cleanup_days: i64,
    pub(crate) cleanup_interval_seconds: u64,
    pub(crate) activity_touch_minutes: i64,
    pub(crate) cookie_name: String,
    pub(crate) cookie_secure: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct AdminSettings {
    pub(crate) first_superuser_username: String,
    pub(crate) first_superuser_password: String,
}

#[derive(Debug, Clone)]
pub(crate) struct TelemetrySettings {
    pub(crate) log_level: String,
    pub(crate) json: bool,
    pub(crate) prometheus_enabled: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct RuntimeSettings {
    pub(crate) environment: Environment,
    pub(crate) strict_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

impl Environment {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Test => "test",
        }
    }

    pub(super) fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ServerHost(pub(super) String);

#[derive(Debug, Clone, Copy)]
pub(crate) struct ServerPort(pub(super) u16);

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("invalid server host: {0}")]
    InvalidHost(String),
    #[error("invalid server port: {0}")]
    InvalidPort(String),
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("invalid cors origins: {0}")]
    InvalidCors(String),
    #[error("missing required secret for {0}")]
    MissingSecret(&'static str),
}

impl DatabaseSettings {
    pub(crate) fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }

        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.postgres_user,
            self.postgres_password,
            self.postgres_server,
            self.postgres_port,
            self.postgres_db
        )
    }
}

impl RedisSettings {
    pub(crate) fn redis_url(&self) -> String {
        if self.password.is_empty() {
            format!("redis://{}:{}/{}", self.host, self.port, self.db)
        } else {
            format!("redis://:{}@{}:{}/{}", self.password, self.host, self.port, self.db)
        }
    }
}

impl OAuthSettings {
    /// Names of the environment variables that are still empty.
    pub(crate) fn missing_fields(&self) -> Vec<&'static str> {
        let required = [
            ("CLIENT_ID_HEMIS", &self.client_id),
            ("CLIENT_SECRET", &self.client_secret),
            ("REDIRECT_URI_HEMIS", &self.redirect_uri),
            ("AUTHORIZE_URL_HEMIS", &self.authorize_url),
            ("TOKEN_URL_HEMIS", &self.token_url),
            ("RESOURCE_OWNER_URL", &self.resource_owner_url),
        ];

        required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }
}

impl ServerHost {
    pub(super) fn parse(value: String) -> Result<Self, ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::InvalidHost(value));
        }

        Ok(Self(value))
    }
}

impl ServerPort {
    pub(super) fn parse(value: String) -> Result<Self, ConfigError> {
        let parsed: u16 = value.parse().map_err(|_| ConfigError::InvalidPort(value.clone()))?;
        if parsed == 0 {
            return Err(ConfigError::InvalidPort(value));
        }

        Ok(Self(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_lists_empty_oauth_values() {
        let settings = OAuthSettings {
            client_id: "client".to_string(),
            client_secret: " ".to_string(),
            redirect_uri: "https://portal.example/callback".to_string(),
            authorize_url: String::new(),
            token_url: "https://hemis.example/oauth/token".to_string(),
            resource_owner_url: "https://hemis.example/oauth/api/user".to_string(),
            timeout_seconds: 10,
        };

        assert_eq!(settings.missing_fields(), vec!["CLIENT_SECRET", "AUTHORIZE_URL_HEMIS"]);
    }

    #[test]
    fn server_port_rejects_zero() {
        assert!(ServerPort::parse("0".to_string()).is_err());
        assert!(ServerPort::parse("8000".to_string()).is_ok());
    }
}
