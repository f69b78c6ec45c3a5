use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(skip)]
    pub config_path: PathBuf,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Connection settings for the hosted record store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_row_cap")]
    pub row_cap: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub admin_email: Option<String>,
    /// `pbkdf2-sha256$<iterations>$<salt>$<hash>`, produced by
    /// `crd-service hash-password`.
    pub admin_password_hash: Option<String>,
    /// Base64url-no-pad encoded 32-byte Ed25519 private key for JWT signing.
    pub jwt_signing_key: Option<String>,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: u64,
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: u64,
    #[serde(default = "default_session_cleanup_interval")]
    pub session_cleanup_interval: u64,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8200
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/crd")
}

fn default_table() -> String {
    "client_registrations".to_string()
}

fn default_row_cap() -> u32 {
    500
}

fn default_access_token_expiry() -> u64 {
    900
}

fn default_refresh_token_expiry() -> u64 {
    86400
}

fn default_session_cleanup_interval() -> u64 {
    600
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            table: default_table(),
            row_cap: default_row_cap(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_email: None,
            admin_password_hash: None,
            jwt_signing_key: None,
            access_token_expiry: default_access_token_expiry(),
            refresh_token_expiry: default_refresh_token_expiry(),
            session_cleanup_interval: default_session_cleanup_interval(),
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, AppError> {
        let path = config_path
            .or_else(|| std::env::var("CRD_CONFIG_PATH").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("config.toml"));

        if !path.exists() {
            return Err(AppError::Config(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }

        let contents = std::fs::read_to_string(&path).map_err(AppError::Io)?;
        let mut config = toml::from_str::<AppConfig>(&contents)
            .map_err(|e| AppError::Config(format!("failed to parse {}: {e}", path.display())))?;

        config.config_path = path;

        // Apply env var overrides
        if let Ok(host) = std::env::var("CRD_SERVER_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("CRD_SERVER_PORT") {
            config.server.port = port
                .parse()
                .map_err(|e| AppError::Config(format!("invalid CRD_SERVER_PORT: {e}")))?;
        }
        if let Ok(level) = std::env::var("CRD_LOG_LEVEL") {
            config.log.level = level;
        }
        if let Ok(format) = std::env::var("CRD_LOG_FORMAT") {
            config.log.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                other => {
                    return Err(AppError::Config(format!(
                        "invalid CRD_LOG_FORMAT '{other}', expected 'text' or 'json'"
                    )));
                }
            };
        }
        if let Ok(data_dir) = std::env::var("CRD_STORE_DATA_DIR") {
            config.store.data_dir = PathBuf::from(data_dir);
        }

        // Registry env var overrides
        if let Ok(url) = std::env::var("CRD_REGISTRY_URL") {
            config.registry.url = Some(url);
        }
        if let Ok(key) = std::env::var("CRD_REGISTRY_API_KEY") {
            config.registry.api_key = Some(key);
        }
        if let Ok(table) = std::env::var("CRD_REGISTRY_TABLE") {
            config.registry.table = table;
        }
        if let Ok(cap) = std::env::var("CRD_REGISTRY_ROW_CAP") {
            config.registry.row_cap = cap
                .parse()
                .map_err(|e| AppError::Config(format!("invalid CRD_REGISTRY_ROW_CAP: {e}")))?;
        }

        // Auth env var overrides
        if let Ok(email) = std::env::var("CRD_AUTH_ADMIN_EMAIL") {
            config.auth.admin_email = Some(email);
        }
        if let Ok(hash) = std::env::var("CRD_AUTH_ADMIN_PASSWORD_HASH") {
            config.auth.admin_password_hash = Some(hash);
        }
        if let Ok(key) = std::env::var("CRD_AUTH_JWT_SIGNING_KEY") {
            config.auth.jwt_signing_key = Some(key);
        }
        if let Ok(expiry) = std::env::var("CRD_AUTH_ACCESS_EXPIRY") {
            config.auth.access_token_expiry = expiry
                .parse()
                .map_err(|e| AppError::Config(format!("invalid CRD_AUTH_ACCESS_EXPIRY: {e}")))?;
        }
        if let Ok(expiry) = std::env::var("CRD_AUTH_REFRESH_EXPIRY") {
            config.auth.refresh_token_expiry = expiry
                .parse()
                .map_err(|e| AppError::Config(format!("invalid CRD_AUTH_REFRESH_EXPIRY: {e}")))?;
        }
        if let Ok(interval) = std::env::var("CRD_AUTH_SESSION_CLEANUP_INTERVAL") {
            config.auth.session_cleanup_interval = interval.parse().map_err(|e| {
                AppError::Config(format!("invalid CRD_AUTH_SESSION_CLEANUP_INTERVAL: {e}"))
            })?;
        }

        Ok(config)
    }

    /// Startup validation: missing backend or admin credentials are fatal
    /// to the whole service, not a degraded mode.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut missing = Vec::new();
        if self.registry.url.is_none() {
            missing.push("registry.url");
        }
        if self.registry.api_key.is_none() {
            missing.push("registry.api_key");
        }
        if self.auth.admin_email.is_none() {
            missing.push("auth.admin_email");
        }
        if self.auth.admin_password_hash.is_none() {
            missing.push("auth.admin_password_hash");
        }
        if self.auth.jwt_signing_key.is_none() {
            missing.push("auth.jwt_signing_key");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )))
        }
    }
}
