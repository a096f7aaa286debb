//! Login credentials, one per principal

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Result, WatchpostError};

/// Stored login credential. Never serialized to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    #[serde(with = "super::uuid_str")]
    pub principal_id: Uuid,
    /// Lower-cased login email (unique)
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    /// Version stamped into issued tokens. Not checked on use: a session
    /// ends at token expiry or when its principal is deleted.
    #[serde(default = "default_token_version")]
    pub token_version: u32,
    pub created_at: DateTime<Utc>,
}

fn default_token_version() -> u32 {
    1
}

impl Credential {
    pub fn new(email: &str, password_hash: String) -> Self {
        Self {
            principal_id: Uuid::new_v4(),
            email: normalize_email(email),
            password_hash,
            token_version: 1,
            created_at: Utc::now(),
        }
    }
}

/// Canonical form used for lookups and uniqueness
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal shape check; delivery is not verified
pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(WatchpostError::validation("email", "must be a valid email address")),
    }
}
