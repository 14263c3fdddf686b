use super::parsing::{
    env_flag, env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment,
    parse_positive_i64, parse_u16, parse_u64,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AdminSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings, OAuthSettings,
    RedisSettings, RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings,
    SessionSettings, Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("QUIZ_HOST", "0.0.0.0");
        let port = env_or_default("QUIZ_PORT", "8000");

        let environment =
            parse_environment(env_optional("QUIZ_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("QUIZ_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "HEMIS Quiz Portal");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };
        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "1440"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "quiz");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "quiz_portal");
        let database_url = env_optional("DATABASE_URL");

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let oauth = OAuthSettings {
            client_id: env_or_default("CLIENT_ID_HEMIS", ""),
            client_secret: env_or_default("CLIENT_SECRET", ""),
            redirect_uri: env_or_default("REDIRECT_URI_HEMIS", ""),
            authorize_url: env_or_default("AUTHORIZE_URL_HEMIS", ""),
            token_url: env_or_default("TOKEN_URL_HEMIS", ""),
            resource_owner_url: env_or_default("RESOURCE_OWNER_URL", ""),
            timeout_seconds: parse_u64(
                "OAUTH_TIMEOUT_SECONDS",
                env_or_default("OAUTH_TIMEOUT_SECONDS", "10"),
            )?,
        };

        let session = SessionSettings {
            cleanup_days: parse_positive_i64(
                "SESSION_CLEANUP_DAYS",
                env_or_default("SESSION_CLEANUP_DAYS", "7"),
            )?,
            cleanup_interval_seconds: parse_u64(
                "SESSION_CLEANUP_INTERVAL_SECONDS",
                env_or_default("SESSION_CLEANUP_INTERVAL_SECONDS", "3600"),
            )?,
            activity_touch_minutes: parse_positive_i64(
                "SESSION_ACTIVITY_TOUCH_MINUTES",
                env_or_default("SESSION_ACTIVITY_TOUCH_MINUTES", "5"),
            )?,
            cookie_name: env_or_default("SESSION_COOKIE_NAME", "quiz_session"),
            cookie_secure: env_flag("SESSION_COOKIE_SECURE") || environment.is_production(),
        };

        let first_superuser_username = env_or_default("FIRST_SUPERUSER_USERNAME", "admin");
        let first_superuser_password = env_or_default("FIRST_SUPERUSER_PASSWORD", "");

        let log_level = env_or_default("QUIZ_LOG_LEVEL", "info");
        let json = env_flag("QUIZ_LOG_JSON");
        let prometheus_enabled = env_flag("PROMETHEUS_ENABLED");

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings { secret_key, access_token_expire_minutes, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            oauth,
            session,
            admin: AdminSettings { first_superuser_username, first_superuser_password },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn oauth(&self) -> &OAuthSettings {
        &self.oauth
    }

    pub(crate) fn session(&self) -> &SessionSettings {
        &self.session
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.oauth.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "OAUTH_TIMEOUT_SECONDS",
                value: String::from("0"),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }

        if let Some(field) = self.oauth.missing_fields().first() {
            return Err(ConfigError::MissingSecret(field));
        }

        if self.admin.first_superuser_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_SUPERUSER_PASSWORD"));
        }

        Ok(())
    }
}
