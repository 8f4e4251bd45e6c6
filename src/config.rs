use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_env")]
    pub env: String,

    #[serde(default = "default_app_host")]
    pub host: String,

    #[serde(default = "default_app_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,

    /// Session token lifetime in seconds.
    #[serde(default = "default_jwt_session_ttl")]
    pub session_ttl: i64,

    /// Extended lifetime used when the client logs in with remember_me.
    #[serde(default = "default_jwt_remember_me_ttl")]
    pub remember_me_ttl: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_root")]
    pub root_dir: String,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins, or "*" to allow any.
    #[serde(default = "default_cors_allowed_origins")]
    pub allowed_origins: String,

    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_app_env() -> String {
    "development".to_string()
}

fn default_app_host() -> String {
    "0.0.0.0".to_string()
}

fn default_app_port() -> u16 {
    8080
}

fn default_db_max_connections() -> u32 {
    20
}

fn default_jwt_session_ttl() -> i64 {
    86_400 // 1 day
}

fn default_jwt_remember_me_ttl() -> i64 {
    2_592_000 // 30 days
}

fn default_storage_root() -> String {
    "./uploads".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_cors_allowed_origins() -> String {
    "*".to_string()
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let app = AppConfig {
            env: env::var("APP_ENV").unwrap_or_else(|_| default_app_env()),
            host: env::var("APP_HOST").unwrap_or_else(|_| default_app_host()),
            port: env::var("APP_PORT")
                .unwrap_or_else(|_| default_app_port().to_string())
                .parse()
                .unwrap_or(default_app_port()),
        };

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| default_db_max_connections().to_string())
                .parse()
                .unwrap_or(default_db_max_connections()),
        };

        let jwt = JwtConfig {
            secret: env::var("JWT_SECRET").map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?,
            session_ttl: env::var("JWT_SESSION_TTL")
                .unwrap_or_else(|_| default_jwt_session_ttl().to_string())
                .parse()
                .unwrap_or(default_jwt_session_ttl()),
            remember_me_ttl: env::var("JWT_REMEMBER_ME_TTL")
                .unwrap_or_else(|_| default_jwt_remember_me_ttl().to_string())
                .parse()
                .unwrap_or(default_jwt_remember_me_ttl()),
        };

        let storage = StorageConfig {
            root_dir: env::var("STORAGE_ROOT_DIR").unwrap_or_else(|_| default_storage_root()),
            max_upload_bytes: env::var("STORAGE_MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| default_max_upload_bytes().to_string())
                .parse()
                .unwrap_or(default_max_upload_bytes()),
        };

        let cors = CorsConfig {
            allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| default_cors_allowed_origins()),
            max_age: env::var("CORS_MAX_AGE")
                .unwrap_or_else(|_| default_cors_max_age().to_string())
                .parse()
                .unwrap_or(default_cors_max_age()),
        };

        Ok(Config {
            app,
            database,
            jwt,
            storage,
            cors,
        })
    }

    pub fn is_production(&self) -> bool {
        self.app.env == "production"
    }
}
