/// Configuration management for the Sentira backend
use crate::error::{ApiResult, ConfigError};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub encryption: EncryptionConfig,
    pub upstream: UpstreamConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub version: String,
    /// Maximum accepted video upload size in bytes
    pub upload_limit: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing access tokens. Never logged.
    pub jwt_secret: String,
    /// Access token lifetime in minutes.
    pub access_token_ttl_minutes: i64,
}

/// Field-encryption configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// 32-byte key, url-safe base64 encoded. Never logged.
    pub field_key: String,
}

/// Upstream service endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the video emotion-analysis model
    pub model_url: String,
    /// Base URL of the conversational agent service
    pub agent_url: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("Invalid port number".to_string()))?;
        let version = env::var("SENTIRA_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let upload_limit = env::var("UPLOAD_LIMIT")
            .unwrap_or_else(|_| "104857600".to_string())
            .parse()
            .unwrap_or(104_857_600);

        let data_directory: PathBuf = env::var("DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("records.sqlite"));

        let jwt_secret =
            env::var("SECRET_KEY").map_err(|_| ConfigError::MissingSecret("SECRET_KEY"))?;
        let access_token_ttl_minutes = env::var("ACCESS_TOKEN_TTL_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .unwrap_or(60);

        let field_key =
            env::var("ENCRYPTION_KEY").map_err(|_| ConfigError::MissingSecret("ENCRYPTION_KEY"))?;

        let model_url = env::var("API_MODEL_URL")
            .map_err(|_| ConfigError::Invalid("API_MODEL_URL is required".to_string()))?;
        let agent_url = env::var("AGENT_API_URL")
            .map_err(|_| ConfigError::Invalid("AGENT_API_URL is required".to_string()))?;

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                host,
                port,
                version,
                upload_limit,
            },
            storage: StorageConfig {
                data_directory,
                database,
            },
            authentication: AuthConfig {
                jwt_secret,
                access_token_ttl_minutes,
            },
            encryption: EncryptionConfig { field_key },
            upstream: UpstreamConfig {
                model_url,
                agent_url,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.authentication.jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid(
                "SECRET_KEY must be at least 32 characters".to_string(),
            )
            .into());
        }

        if self.authentication.access_token_ttl_minutes <= 0 {
            return Err(ConfigError::Invalid(
                "ACCESS_TOKEN_TTL_MINUTES must be positive".to_string(),
            )
            .into());
        }

        if self.upstream.model_url.is_empty() || self.upstream.agent_url.is_empty() {
            return Err(ConfigError::Invalid(
                "Upstream URLs cannot be empty".to_string(),
            )
            .into());
        }

        // The field key is fully checked when the cipher is constructed;
        // here we only catch obviously truncated values early.
        if self.encryption.field_key.len() < 40 {
            return Err(ConfigError::Invalid(
                "ENCRYPTION_KEY must be a 32-byte url-safe base64 key".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
