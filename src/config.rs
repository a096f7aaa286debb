//! Configuration for Watchpost
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::auth::JwtValidator;
use crate::realtime::DEFAULT_BUFFER;
use crate::storage::{VideoStoreConfig, DEFAULT_MAX_VIDEO_BYTES};
use crate::types::WatchpostError;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Watchpost - citizen incident reporting gateway
#[derive(Parser, Debug, Clone)]
#[command(name = "watchpost")]
#[command(about = "Incident reporting, officer triage and distress notifications")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (in-memory fallback, default JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "watchpost")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// API key for the /admin endpoints (admin routes are disabled when unset)
    #[arg(long, env = "API_KEY_ADMIN")]
    pub api_key_admin: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Directory uploaded videos are stored under
    #[arg(long, env = "VIDEO_DIR", default_value = "./data/videos")]
    pub video_dir: PathBuf,

    /// Public base URL used to build video links
    #[arg(long, env = "PUBLIC_URL", default_value = "http://localhost:8080")]
    pub public_url: String,

    /// Maximum accepted video size in bytes
    #[arg(long, env = "MAX_VIDEO_BYTES", default_value_t = DEFAULT_MAX_VIDEO_BYTES)]
    pub max_video_bytes: usize,

    /// Change events buffered per realtime subscriber
    #[arg(long, env = "REALTIME_BUFFER", default_value_t = DEFAULT_BUFFER)]
    pub realtime_buffer: usize,
}

impl Args {
    /// Build the token validator (dev secret when none is configured in dev mode)
    pub fn jwt_validator(&self) -> Result<JwtValidator, WatchpostError> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => JwtValidator::new(secret.clone(), self.jwt_expiry_seconds),
            (None, true) => Ok(JwtValidator::new_dev()),
            (None, false) => Err(WatchpostError::Config(
                "JWT_SECRET is required in production mode".into(),
            )),
        }
    }

    pub fn video_store_config(&self) -> VideoStoreConfig {
        VideoStoreConfig {
            root: self.video_dir.clone(),
            public_url: self.public_url.trim_end_matches('/').to_string(),
            max_bytes: self.max_video_bytes,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match &self.jwt_secret {
                None => return Err("JWT_SECRET is required in production mode".to_string()),
                Some(secret) if secret.len() < 32 => {
                    return Err("JWT_SECRET must be at least 32 characters".to_string())
                }
                Some(_) => {}
            }
        }

        if self.max_video_bytes == 0 {
            return Err("MAX_VIDEO_BYTES must be greater than zero".to_string());
        }

        if self.realtime_buffer == 0 {
            return Err("REALTIME_BUFFER must be greater than zero".to_string());
        }

        if !self.public_url.starts_with("http://") && !self.public_url.starts_with("https://") {
            return Err("PUBLIC_URL must be an http(s) URL".to_string());
        }

        if matches!(&self.api_key_admin, Some(key) if key.is_empty()) {
            return Err("API_KEY_ADMIN must not be empty when set".to_string());
        }

        Ok(())
    }
}
