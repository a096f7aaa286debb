//! Profile rows
//!
//! One profile per principal, derived from registration metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Principal role. Gates every row-level predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Citizen reporting incidents
    #[default]
    User,
    /// Officer triaging reports
    Officer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Officer => "officer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Principal id (same key as the credential)
    #[serde(with = "super::uuid_str")]
    pub id: Uuid,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata supplied at registration. Absent fields become empty strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
}

impl Profile {
    /// Derive the profile inserted when a principal registers
    pub fn from_registration(id: Uuid, email: &str, meta: RegistrationMetadata) -> Self {
        let now = Utc::now();
        Self {
            id,
            full_name: meta.full_name.unwrap_or_default(),
            email: email.to_string(),
            address: meta.address.unwrap_or_default(),
            phone_number: meta.phone_number.unwrap_or_default(),
            sex: meta.sex.unwrap_or_default(),
            gender: meta.gender.unwrap_or_default(),
            role: Role::User,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_officer(&self) -> bool {
        self.role == Role::Officer
    }
}

/// Self-service profile fields. Role changes go through the admin path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub sex: Option<String>,
    pub gender: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.address.is_none()
            && self.phone_number.is_none()
            && self.sex.is_none()
            && self.gender.is_none()
    }

    /// Apply to a profile row, refreshing `updated_at`
    pub fn apply(&self, profile: &mut Profile) {
        if let Some(v) = &self.full_name {
            profile.full_name = v.clone();
        }
        if let Some(v) = &self.address {
            profile.address = v.clone();
        }
        if let Some(v) = &self.phone_number {
            profile.phone_number = v.clone();
        }
        if let Some(v) = &self.sex {
            profile.sex = v.clone();
        }
        if let Some(v) = &self.gender {
            profile.gender = v.clone();
        }
        profile.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_defaults_to_empty_strings() {
        let id = Uuid::new_v4();
        let profile = Profile::from_registration(id, "ada@example.com", RegistrationMetadata::default());

        assert_eq!(profile.id, id);
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.full_name, "");
        assert_eq!(profile.address, "");
        assert_eq!(profile.phone_number, "");
        assert_eq!(profile.role, Role::User);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Officer).unwrap(), "\"officer\"");
        let role: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, Role::User);
    }

    #[test]
    fn test_update_leaves_unset_fields() {
        let mut profile = Profile::from_registration(
            Uuid::new_v4(),
            "ada@example.com",
            RegistrationMetadata {
                full_name: Some("Ada".into()),
                ..Default::default()
            },
        );
        let update = ProfileUpdate {
            address: Some("1 Analytical Way".into()),
            ..Default::default()
        };
        update.apply(&mut profile);

        assert_eq!(profile.full_name, "Ada");
        assert_eq!(profile.address, "1 Analytical Way");
    }
}
