//! Incident report rows and lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::types::{Result, WatchpostError};

/// Maximum title length accepted by the submission form
pub const MAX_TITLE_LEN: usize = 200;

/// Minimum description length accepted by the submission form
pub const MIN_DESCRIPTION_LEN: usize = 10;

/// Report status.
///
/// The suggested path is pending -> in_progress -> {resolved, closed}, but
/// officers may set any value from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    #[default]
    Pending,
    InProgress,
    Resolved,
    Closed,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Pending => "pending",
            IncidentStatus::InProgress => "in_progress",
            IncidentStatus::Resolved => "resolved",
            IncidentStatus::Closed => "closed",
        }
    }

    /// Transitions offered to officers as the conventional next step
    pub fn suggested_next(&self) -> &'static [IncidentStatus] {
        match self {
            IncidentStatus::Pending => &[IncidentStatus::InProgress, IncidentStatus::Closed],
            IncidentStatus::InProgress => &[IncidentStatus::Resolved, IncidentStatus::Closed],
            IncidentStatus::Resolved | IncidentStatus::Closed => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.suggested_next().is_empty()
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categories offered by the submission form.
///
/// Stored as a free-form string on the row so older categories stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentCategory {
    Theft,
    Vandalism,
    Violence,
    SuspiciousActivity,
    Emergency,
    Fire,
    Medical,
    Other,
}

impl IncidentCategory {
    pub const ALL: [IncidentCategory; 8] = [
        IncidentCategory::Theft,
        IncidentCategory::Vandalism,
        IncidentCategory::Violence,
        IncidentCategory::SuspiciousActivity,
        IncidentCategory::Emergency,
        IncidentCategory::Fire,
        IncidentCategory::Medical,
        IncidentCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentCategory::Theft => "theft",
            IncidentCategory::Vandalism => "vandalism",
            IncidentCategory::Violence => "violence",
            IncidentCategory::SuspiciousActivity => "suspicious_activity",
            IncidentCategory::Emergency => "emergency",
            IncidentCategory::Fire => "fire",
            IncidentCategory::Medical => "medical",
            IncidentCategory::Other => "other",
        }
    }
}

impl FromStr for IncidentCategory {
    type Err = WatchpostError;

    fn from_str(s: &str) -> Result<Self> {
        IncidentCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| WatchpostError::validation("incident_type", format!("unknown category '{s}'")))
    }
}

/// Incident report row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentReport {
    #[serde(with = "super::uuid_str")]
    pub id: Uuid,
    /// Owning principal; never changes after creation
    #[serde(with = "super::uuid_str")]
    pub reporter_id: Uuid,
    pub title: String,
    pub description: String,
    pub incident_type: String,
    pub location: String,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub status: IncidentStatus,
    #[serde(default, with = "super::uuid_str::option")]
    pub assigned_officer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Submission form contents
#[derive(Debug, Clone, Deserialize)]
pub struct NewIncidentReport {
    pub title: String,
    pub description: String,
    pub incident_type: String,
    pub location: String,
    /// Set from the video store after an upload, never from client input
    #[serde(skip_deserializing)]
    pub video_url: Option<String>,
}

impl NewIncidentReport {
    /// Field-level checks run before anything reaches the store
    pub fn validate(&self) -> Result<IncidentCategory> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(WatchpostError::validation("title", "is required"));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(WatchpostError::validation(
                "title",
                format!("must be at most {MAX_TITLE_LEN} characters"),
            ));
        }
        if self.description.trim().chars().count() < MIN_DESCRIPTION_LEN {
            return Err(WatchpostError::validation(
                "description",
                format!("must be at least {MIN_DESCRIPTION_LEN} characters"),
            ));
        }
        if self.location.trim().is_empty() {
            return Err(WatchpostError::validation("location", "is required"));
        }
        self.incident_type.parse()
    }

    /// Build the row for a reporter. Status always starts at pending.
    pub fn into_row(self, reporter_id: Uuid) -> IncidentReport {
        let now = Utc::now();
        IncidentReport {
            id: Uuid::new_v4(),
            reporter_id,
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            incident_type: self.incident_type,
            location: self.location.trim().to_string(),
            video_url: self.video_url,
            status: IncidentStatus::Pending,
            assigned_officer_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Officer-side patch. There is no field for `reporter_id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub incident_type: Option<String>,
    pub location: Option<String>,
    pub video_url: Option<String>,
    pub status: Option<IncidentStatus>,
    pub assigned_officer_id: Option<Uuid>,
}

impl IncidentPatch {
    /// Patch produced by an officer status transition: status plus claim
    pub fn transition(status: IncidentStatus, officer_id: Uuid) -> Self {
        Self {
            status: Some(status),
            assigned_officer_id: Some(officer_id),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.incident_type.is_none()
            && self.location.is_none()
            && self.video_url.is_none()
            && self.status.is_none()
            && self.assigned_officer_id.is_none()
    }

    /// Apply to a report row, refreshing `updated_at`
    pub fn apply(&self, report: &mut IncidentReport) {
        if let Some(v) = &self.title {
            report.title = v.clone();
        }
        if let Some(v) = &self.description {
            report.description = v.clone();
        }
        if let Some(v) = &self.incident_type {
            report.incident_type = v.clone();
        }
        if let Some(v) = &self.location {
            report.location = v.clone();
        }
        if let Some(v) = &self.video_url {
            report.video_url = Some(v.clone());
        }
        if let Some(v) = self.status {
            report.status = v;
        }
        if let Some(v) = self.assigned_officer_id {
            report.assigned_officer_id = Some(v);
        }
        report.updated_at = Utc::now();
    }
}
