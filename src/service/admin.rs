//! Out-of-band administration
//!
//! Callers are gated by the admin API key at the HTTP layer, not by the
//! row-level policy.

use tracing::{info, warn};
use uuid::Uuid;

use super::IncidentService;
use crate::backend::CascadeSummary;
use crate::models::{Profile, Role};
use crate::types::{Result, WatchpostError};

impl IncidentService {
    /// Change a principal's role. Takes effect on its next operation.
    pub async fn set_role(&self, id: Uuid, role: Role) -> Result<Profile> {
        let profile = self
            .backend
            .set_role(id, role)
            .await?
            .ok_or_else(|| WatchpostError::NotFound(format!("profile {id}")))?;
        info!(principal = %id, %role, "Role changed");
        Ok(profile)
    }

    /// Remove a principal with its profile, reports and notifications
    pub async fn delete_principal(&self, id: Uuid) -> Result<CascadeSummary> {
        let summary = self.backend.delete_principal(id).await?;
        if !summary.profile_deleted {
            warn!(principal = %id, "Deleted principal had no profile");
        }
        info!(
            principal = %id,
            reports = summary.reports_deleted,
            notifications = summary.notifications_deleted,
            assignments = summary.assignments_cleared,
            "Principal deleted"
        );
        Ok(summary)
    }
}
