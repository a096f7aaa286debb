//! Distress notification rows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::types::{Result, WatchpostError};

/// Notification status.
///
/// `Resolved` is kept for schema compatibility; nothing produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    #[default]
    Sent,
    Acknowledged,
    Resolved,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Sent => "sent",
            NotificationStatus::Acknowledged => "acknowledged",
            NotificationStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Officer -> user message tied to an incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistressNotification {
    #[serde(with = "super::uuid_str")]
    pub id: Uuid,
    #[serde(with = "super::uuid_str")]
    pub incident_id: Uuid,
    /// Sending officer
    #[serde(with = "super::uuid_str")]
    pub officer_id: Uuid,
    /// Recipient; always the incident's reporter
    #[serde(with = "super::uuid_str")]
    pub user_id: Uuid,
    pub message: String,
    #[serde(default)]
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl DistressNotification {
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged_at.is_some()
    }

    /// Mark acknowledged. An existing `acknowledged_at` is kept.
    pub fn acknowledge(&mut self, at: DateTime<Utc>) {
        self.status = NotificationStatus::Acknowledged;
        if self.acknowledged_at.is_none() {
            self.acknowledged_at = Some(at);
        }
    }
}

/// Officer request to send a distress notification
#[derive(Debug, Clone, Deserialize)]
pub struct NewDistressNotification {
    pub incident_id: Uuid,
    pub message: String,
    /// Optional explicit recipient; must match the incident's reporter
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

impl NewDistressNotification {
    pub fn validate(&self) -> Result<()> {
        if self.message.trim().is_empty() {
            return Err(WatchpostError::validation("message", "is required"));
        }
        Ok(())
    }

    /// Build the row once the recipient has been resolved from the incident
    pub fn into_row(self, officer_id: Uuid, reporter_id: Uuid) -> Result<DistressNotification> {
        if let Some(requested) = self.user_id {
            if requested != reporter_id {
                return Err(WatchpostError::validation(
                    "user_id",
                    "recipient must be the incident's reporter",
                ));
            }
        }
        Ok(DistressNotification {
            id: Uuid::new_v4(),
            incident_id: self.incident_id,
            officer_id,
            user_id: reporter_id,
            message: self.message.trim().to_string(),
            status: NotificationStatus::Sent,
            created_at: Utc::now(),
            acknowledged_at: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> DistressNotification {
        NewDistressNotification {
            incident_id: Uuid::new_v4(),
            message: "Stay indoors, units en route".into(),
            user_id: None,
        }
        .into_row(Uuid::new_v4(), Uuid::new_v4())
        .unwrap()
    }

    #[test]
    fn test_new_notification_is_sent() {
        let n = sample();
        assert_eq!(n.status, NotificationStatus::Sent);
        assert!(n.acknowledged_at.is_none());
    }

    #[test]
    fn test_acknowledge_keeps_first_timestamp() {
        let mut n = sample();
        let first = Utc::now();
        n.acknowledge(first);
        n.acknowledge(first + Duration::minutes(5));

        assert_eq!(n.status, NotificationStatus::Acknowledged);
        assert_eq!(n.acknowledged_at, Some(first));
    }

    #[test]
    fn test_recipient_mismatch_rejected() {
        let reporter = Uuid::new_v4();
        let req = NewDistressNotification {
            incident_id: Uuid::new_v4(),
            message: "hello".into(),
            user_id: Some(Uuid::new_v4()),
        };
        assert!(req.into_row(Uuid::new_v4(), reporter).is_err());
    }

    #[test]
    fn test_empty_message_rejected() {
        let req = NewDistressNotification {
            incident_id: Uuid::new_v4(),
            message: "   ".into(),
            user_id: None,
        };
        assert!(req.validate().is_err());
    }
}
