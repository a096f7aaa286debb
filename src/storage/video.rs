//! Filesystem video store
//!
//! Videos live under `<root>/<owner>/<uuid>.<ext>` and are served back at
//! `<public_url>/videos/<owner>/<file>`. Who may read them is decided by the
//! service layer; the store only guards against path tricks.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::{debug, info};
use uuid::Uuid;

use crate::types::{Result, WatchpostError};

/// Default upload ceiling (100 MB)
pub const DEFAULT_MAX_VIDEO_BYTES: usize = 100 * 1024 * 1024;

/// Video store settings
#[derive(Debug, Clone)]
pub struct VideoStoreConfig {
    /// Directory videos are written under
    pub root: PathBuf,
    /// Externally reachable base URL, without trailing slash
    pub public_url: String,
    pub max_bytes: usize,
}

impl Default for VideoStoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./data/videos"),
            public_url: "http://localhost:8080".to_string(),
            max_bytes: DEFAULT_MAX_VIDEO_BYTES,
        }
    }
}

/// Result of a successful upload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredVideo {
    pub owner: Uuid,
    pub file_name: String,
    pub url: String,
    pub content_type: String,
    pub size: u64,
    pub sha256: String,
    #[serde(skip)]
    pub path: PathBuf,
}

/// Video bytes read back from the store
#[derive(Debug, Clone)]
pub struct VideoContent {
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

pub struct VideoStore {
    config: VideoStoreConfig,
}

impl VideoStore {
    pub fn new(config: VideoStoreConfig) -> Self {
        Self { config }
    }

    pub fn max_bytes(&self) -> usize {
        self.config.max_bytes
    }

    /// Public URL for a stored file
    pub fn url_for(&self, owner: Uuid, file_name: &str) -> String {
        format!(
            "{}/videos/{}/{}",
            self.config.public_url.trim_end_matches('/'),
            owner,
            file_name
        )
    }

    /// Write a video for `owner`
    pub async fn put(&self, owner: Uuid, content_type: &str, data: &[u8]) -> Result<StoredVideo> {
        let content_type = normalize_content_type(content_type);
        let ext = extension_for(&content_type).ok_or_else(|| {
            WatchpostError::validation("content_type", format!("'{content_type}' is not a video type"))
        })?;

        if data.is_empty() {
            return Err(WatchpostError::validation("video", "is empty"));
        }
        if data.len() > self.config.max_bytes {
            return Err(WatchpostError::PayloadTooLarge(format!(
                "video is {} bytes, limit is {}",
                data.len(),
                self.config.max_bytes
            )));
        }

        let dir = self.config.root.join(owner.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| WatchpostError::Storage(format!("Failed to create {}: {}", dir.display(), e)))?;

        let file_name = format!("{}.{}", Uuid::new_v4(), ext);
        let path = dir.join(&file_name);
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| WatchpostError::Storage(format!("Failed to write {}: {}", path.display(), e)))?;

        let sha256 = compute_hash(data);
        info!(%owner, file = %file_name, size = data.len(), sha256 = %sha256, "Stored video");

        Ok(StoredVideo {
            owner,
            url: self.url_for(owner, &file_name),
            file_name,
            content_type,
            size: data.len() as u64,
            sha256,
            path,
        })
    }

    /// Read a stored video
    pub async fn open(&self, owner: Uuid, file_name: &str) -> Result<VideoContent> {
        if !is_safe_file_name(file_name) {
            return Err(WatchpostError::NotFound(format!("video {file_name}")));
        }

        let path = self.config.root.join(owner.to_string()).join(file_name);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(WatchpostError::NotFound(format!("video {owner}/{file_name}")));
            }
            Err(e) => {
                return Err(WatchpostError::Storage(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        debug!(%owner, file = %file_name, size = data.len(), "Serving video");
        Ok(VideoContent {
            content_type: content_type_for(file_name),
            data,
        })
    }
}

/// SHA256 hex digest of the upload
pub fn compute_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    let subtype = content_type.strip_prefix("video/")?;
    Some(match subtype {
        "mp4" => "mp4",
        "webm" => "webm",
        "quicktime" => "mov",
        "ogg" => "ogv",
        "x-matroska" => "mkv",
        "x-msvideo" => "avi",
        "" => return None,
        _ => "bin",
    })
}

fn content_type_for(file_name: &str) -> &'static str {
    match file_name.rsplit('.').next().unwrap_or_default() {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "ogv" => "video/ogg",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

/// Only names the store itself could have produced
fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}
