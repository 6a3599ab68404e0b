//! Application configuration
//!
//! Object store settings come from environment variables so credentials stay
//! off the CLI surface.

use std::env;

use funcpack_core::StorageConfig;

/// Configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Object store endpoint URL.
    pub endpoint: String,

    /// Access key ID.
    pub access_key: String,

    /// Secret access key.
    pub secret_key: String,

    /// Region reported to the store.
    pub region: String,

    /// Use path-style URLs (required for MinIO).
    pub path_style: bool,
}

impl AppConfig {
    /// Load configuration from `FUNCPACK_S3_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var("FUNCPACK_S3_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:9000".to_string()),

            access_key: env::var("FUNCPACK_S3_ACCESS_KEY").unwrap_or_default(),

            secret_key: env::var("FUNCPACK_S3_SECRET_KEY").unwrap_or_default(),

            region: env::var("FUNCPACK_S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),

            path_style: env::var("FUNCPACK_S3_PATH_STYLE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
        }
    }

    /// Convert into the uploader's connection settings.
    pub fn storage(&self) -> StorageConfig {
        StorageConfig {
            endpoint: self.endpoint.clone(),
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            region: self.region.clone(),
            path_style: self.path_style,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
