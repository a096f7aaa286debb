//! Incident report submission and officer triage

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::IncidentService;
use crate::auth::{filter_readable, read_scope, Caller, Operation, Session, Table};
use crate::models::{
    IncidentCategory, IncidentPatch, IncidentReport, IncidentStatus, NewIncidentReport,
    MAX_TITLE_LEN, MIN_DESCRIPTION_LEN,
};
use crate::types::{Result, WatchpostError};

/// Video attached to a submission
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub content_type: String,
    pub data: Bytes,
}

/// Outcome of a submission. Warnings describe non-fatal failures.
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedReport {
    pub report: IncidentReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl IncidentService {
    /// Submit a report owned by the session's principal
    pub async fn submit_report(
        &self,
        session: &Session,
        form: NewIncidentReport,
    ) -> Result<IncidentReport> {
        let caller = self.caller(session).await?;
        form.validate()?;
        self.insert_report(&caller, form).await
    }

    /// Submit a report, uploading its video first.
    ///
    /// A failed upload does not fail the submission: the report is created
    /// without a video URL and the failure is returned as a warning.
    pub async fn submit_report_with_video(
        &self,
        session: &Session,
        mut form: NewIncidentReport,
        video: Option<VideoUpload>,
    ) -> Result<SubmittedReport> {
        let caller = self.caller(session).await?;
        form.validate()?;

        let mut warnings = Vec::new();
        if let Some(video) = video {
            match self.videos.put(caller.id, &video.content_type, &video.data).await {
                Ok(stored) => form.video_url = Some(stored.url),
                Err(e) => {
                    warn!(reporter = %caller.id, error = %e, "Video upload failed, submitting without video");
                    warnings.push(format!("Video upload failed: {}", e.public_message()));
                }
            }
        }

        let report = self.insert_report(&caller, form).await?;
        Ok(SubmittedReport { report, warnings })
    }

    async fn insert_report(&self, caller: &Caller, form: NewIncidentReport) -> Result<IncidentReport> {
        let row = form.into_row(caller.id);
        self.ensure(Table::IncidentReports, Operation::Insert, caller, row.reporter_id)?;

        let report = self.backend.insert_report(row).await?;
        self.hub.publish_insert(Table::IncidentReports, &report);

        info!(
            report = %report.id,
            reporter = %report.reporter_id,
            incident_type = %report.incident_type,
            has_video = report.video_url.is_some(),
            "Incident report submitted"
        );
        Ok(report)
    }

    /// Own reports for users, every report for officers. Newest first.
    pub async fn list_reports(&self, session: &Session) -> Result<Vec<IncidentReport>> {
        let caller = self.caller(session).await?;
        let rows = self
            .backend
            .list_reports(read_scope(Table::IncidentReports, &caller))
            .await?;
        Ok(filter_readable(Table::IncidentReports, &caller, rows, |r| r.reporter_id))
    }

    pub async fn get_report(&self, session: &Session, id: Uuid) -> Result<Option<IncidentReport>> {
        let caller = self.caller(session).await?;
        self.visible_report(&caller, id).await
    }

    pub(super) async fn visible_report(&self, caller: &Caller, id: Uuid) -> Result<Option<IncidentReport>> {
        Ok(self
            .backend
            .get_report(id)
            .await?
            .filter(|r| Self::can_read(Table::IncidentReports, caller, r.reporter_id)))
    }

    /// Officer update of any field except the reporter
    pub async fn update_report(
        &self,
        session: &Session,
        id: Uuid,
        patch: &IncidentPatch,
    ) -> Result<IncidentReport> {
        let caller = self.caller(session).await?;
        self.apply_report_patch(&caller, id, patch).await
    }

    /// Officer status transition. The acting officer becomes the assignee.
    ///
    /// Any status may be set from any status; moves outside the suggested
    /// path are logged but allowed.
    pub async fn set_report_status(
        &self,
        session: &Session,
        id: Uuid,
        status: IncidentStatus,
    ) -> Result<IncidentReport> {
        let caller = self.caller(session).await?;
        let patch = IncidentPatch::transition(status, caller.id);

        if let Some(current) = self.visible_report(&caller, id).await? {
            if current.status != status && !current.status.suggested_next().contains(&status) {
                debug!(report = %id, from = %current.status, to = %status, "Status change outside suggested path");
            }
        }

        self.apply_report_patch(&caller, id, &patch).await
    }

    async fn apply_report_patch(
        &self,
        caller: &Caller,
        id: Uuid,
        patch: &IncidentPatch,
    ) -> Result<IncidentReport> {
        let current = self
            .visible_report(caller, id)
            .await?
            .ok_or_else(|| WatchpostError::NotFound(format!("incident report {id}")))?;
        self.ensure(Table::IncidentReports, Operation::Update, caller, current.reporter_id)?;
        validate_patch(patch)?;

        let report = self
            .backend
            .update_report(id, patch)
            .await?
            .ok_or_else(|| WatchpostError::NotFound(format!("incident report {id}")))?;

        info!(
            report = %id,
            officer = %caller.id,
            status = %report.status,
            "Incident report updated"
        );
        Ok(report)
    }
}

fn validate_patch(patch: &IncidentPatch) -> Result<()> {
    if patch.is_empty() {
        return Err(WatchpostError::BadRequest("No fields to update".into()));
    }
    if let Some(title) = &patch.title {
        let len = title.trim().chars().count();
        if len == 0 || len > MAX_TITLE_LEN {
            return Err(WatchpostError::validation(
                "title",
                format!("must be 1 to {MAX_TITLE_LEN} characters"),
            ));
        }
    }
    if let Some(description) = &patch.description {
        if description.trim().chars().count() < MIN_DESCRIPTION_LEN {
            return Err(WatchpostError::validation(
                "description",
                format!("must be at least {MIN_DESCRIPTION_LEN} characters"),
            ));
        }
    }
    if let Some(category) = &patch.incident_type {
        category.parse::<IncidentCategory>()?;
    }
    if let Some(location) = &patch.location {
        if location.trim().is_empty() {
            return Err(WatchpostError::validation("location", "is required"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_validation() {
        assert!(validate_patch(&IncidentPatch::default()).is_err());
        assert!(validate_patch(&IncidentPatch {
            incident_type: Some("arson".into()),
            ..Default::default()
        })
        .is_err());
        assert!(matches!(
            validate_patch(&IncidentPatch {
                description: Some("   ".into()),
                ..Default::default()
            }),
            Err(WatchpostError::Validation { field: "description", .. })
        ));
        assert!(validate_patch(&IncidentPatch {
            description: Some("Suspect fled on foot heading east".into()),
            ..Default::default()
        })
        .is_ok());
        assert!(validate_patch(&IncidentPatch {
            status: Some(IncidentStatus::Closed),
            ..Default::default()
        })
        .is_ok());
    }
}
