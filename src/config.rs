//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix, `__` between sections)
//! - Platform variables (HOST, PORT, AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_REGION)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Platform variables (HOST, PORT, AWS_*)
//! 2. Environment variables (APP_SERVER__PORT, APP_STORAGE__BUCKET, etc.)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)
//!
//! The loaded [`AppConfig`] is handed to the separation service at construction time.
//! Nothing below `main` reads the process environment directly.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// The HTTP server, the object store, the delivery CDN and the request defaults
/// change for different reasons, so each gets its own section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub delivery: DeliveryConfig,
    pub separation: SeparationConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest request body accepted, in bytes. Base64 inflates audio by a third, so
    /// this bounds uploads at roughly three quarters of the value.
    pub max_body_bytes: usize,
}

/// Which [`ObjectStore`](crate::storage::ObjectStore) implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// S3-compatible bucket reached over HTTPS.
    S3,
    /// Process-local map, lost on restart. Useful for local development.
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Object storage settings.
///
/// ## Fields:
/// - `endpoint`: S3-compatible endpoint URL
/// - `bucket`: Bucket that receives both the input and the output object
/// - `access_key_id` / `secret_access_key`: Credentials; the key id doubles as the
///   account segment of delivery URLs
/// - `content_type`: Content type stamped on every stored object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub force_path_style: bool,
    pub content_type: String,
}

/// Content-delivery front end that serves stored objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub cdn_host: String,
}

/// Fallbacks used when a request body leaves `type` or `filename` out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeparationConfig {
    pub default_type: String,
    pub default_filename: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),  // Localhost only (safe for development)
                port: 8080,
                max_body_bytes: 64 * 1024 * 1024,
            },
            storage: StorageConfig {
                backend: StorageBackend::S3,
                endpoint: "https://bucket.poehali.dev".to_string(),
                region: "us-east-1".to_string(),
                bucket: "files".to_string(),
                // Credentials have no sensible default; they come from the environment
                access_key_id: String::new(),
                secret_access_key: String::new(),
                force_path_style: true,
                content_type: "audio/mpeg".to_string(),
            },
            delivery: DeliveryConfig {
                cdn_host: "cdn.poehali.dev".to_string(),
            },
            separation: SeparationConfig {
                default_type: "vocals".to_string(),
                default_filename: "track.mp3".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle the platform variables that don't follow the APP_ convention
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__PORT=3000`: Override server port
    /// - `APP_STORAGE__BACKEND=memory`: Keep objects in process memory
    /// - `APP_DELIVERY__CDN_HOST=cdn.example.com`: Override the CDN host
    /// - `AWS_ACCESS_KEY_ID=...`: Storage credentials (and delivery account id)
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            // Single underscores live inside field names (access_key_id), so
            // sections are split on a double underscore instead
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let platform_overrides = [
            ("HOST", "server.host"),
            ("PORT", "server.port"),
            ("AWS_ACCESS_KEY_ID", "storage.access_key_id"),
            ("AWS_SECRET_ACCESS_KEY", "storage.secret_access_key"),
            ("AWS_REGION", "storage.region"),
        ];
        for (var, key) in platform_overrides {
            if let Ok(value) = env::var(var) {
                settings = settings.set_override(key, value)?;
            }
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - Bucket, CDN host, content type and request defaults are not empty
    /// - The S3 backend has an endpoint and both credentials
    ///
    /// ## Why validate:
    /// A missing credential would otherwise only surface as a 500 on the first upload.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.server.max_body_bytes == 0 {
            return Err(anyhow::anyhow!("Max body size must be greater than 0"));
        }

        if self.storage.bucket.trim().is_empty() {
            return Err(anyhow::anyhow!("Storage bucket must not be empty"));
        }

        if self.storage.content_type.trim().is_empty() {
            return Err(anyhow::anyhow!("Storage content type must not be empty"));
        }

        if self.delivery.cdn_host.trim().is_empty() {
            return Err(anyhow::anyhow!("Delivery CDN host must not be empty"));
        }

        if self.separation.default_type.is_empty() || self.separation.default_filename.is_empty() {
            return Err(anyhow::anyhow!(
                "Default separation type and filename must not be empty"
            ));
        }

        if self.storage.backend == StorageBackend::S3 {
            if self.storage.endpoint.trim().is_empty() {
                return Err(anyhow::anyhow!(
                    "Storage endpoint must not be empty for the s3 backend"
                ));
            }
            if self.storage.access_key_id.is_empty() {
                return Err(anyhow::anyhow!(
                    "AWS_ACCESS_KEY_ID must be set for the s3 backend"
                ));
            }
            if self.storage.secret_access_key.is_empty() {
                return Err(anyhow::anyhow!(
                    "AWS_SECRET_ACCESS_KEY must be set for the s3 backend"
                ));
            }
        }

        Ok(())
    }
}
