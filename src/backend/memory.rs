//! In-memory backend for dev mode and tests
//!
//! One `DashMap` per table. Row-level updates take the shard lock for the
//! row, so a single update is atomic; there is no cross-row transaction.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::{newest_notifications_first, newest_reports_first, Backend, CascadeSummary};
use crate::auth::ReadScope;
use crate::models::{
    normalize_email, Credential, DistressNotification, IncidentPatch, IncidentReport, Profile,
    ProfileUpdate, Role,
};
use crate::types::{Result, WatchpostError};

/// DashMap-backed store
#[derive(Default)]
pub struct MemoryBackend {
    credentials: DashMap<String, Credential>,
    profiles: DashMap<Uuid, Profile>,
    reports: DashMap<Uuid, IncidentReport>,
    notifications: DashMap<Uuid, DistressNotification>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn in_scope(scope: ReadScope, owner: Uuid) -> bool {
    match scope {
        ReadScope::All => true,
        ReadScope::Owned(id) => id == owner,
    }
}

#[async_trait::async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_credential(&self, credential: Credential) -> Result<()> {
        match self.credentials.entry(credential.email.clone()) {
            Entry::Occupied(_) => Err(WatchpostError::validation(
                "email",
                "is already registered",
            )),
            Entry::Vacant(slot) => {
                slot.insert(credential);
                Ok(())
            }
        }
    }

    async fn find_credential(&self, email: &str) -> Result<Option<Credential>> {
        Ok(self
            .credentials
            .get(&normalize_email(email))
            .map(|c| c.clone()))
    }

    async fn delete_credential(&self, email: &str) -> Result<bool> {
        Ok(self.credentials.remove(&normalize_email(email)).is_some())
    }

    async fn insert_profile(&self, profile: Profile) -> Result<Profile> {
        match self.profiles.entry(profile.id) {
            Entry::Occupied(_) => Err(WatchpostError::BadRequest(format!(
                "Profile {} already exists",
                profile.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(profile.clone());
                Ok(profile)
            }
        }
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        Ok(self.profiles.get(&id).map(|p| p.clone()))
    }

    async fn list_profiles(&self, scope: ReadScope) -> Result<Vec<Profile>> {
        let mut profiles: Vec<Profile> = self
            .profiles
            .iter()
            .filter(|p| in_scope(scope, p.id))
            .map(|p| p.clone())
            .collect();
        profiles.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(profiles)
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<Option<Profile>> {
        Ok(self.profiles.get_mut(&id).map(|mut p| {
            update.apply(&mut p);
            p.clone()
        }))
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<Profile>> {
        Ok(self.profiles.get_mut(&id).map(|mut p| {
            p.role = role;
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn insert_report(&self, report: IncidentReport) -> Result<IncidentReport> {
        self.reports.insert(report.id, report.clone());
        Ok(report)
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<IncidentReport>> {
        Ok(self.reports.get(&id).map(|r| r.clone()))
    }

    async fn list_reports(&self, scope: ReadScope) -> Result<Vec<IncidentReport>> {
        let mut reports: Vec<IncidentReport> = self
            .reports
            .iter()
            .filter(|r| in_scope(scope, r.reporter_id))
            .map(|r| r.clone())
            .collect();
        newest_reports_first(&mut reports);
        Ok(reports)
    }

    async fn update_report(&self, id: Uuid, patch: &IncidentPatch) -> Result<Option<IncidentReport>> {
        Ok(self.reports.get_mut(&id).map(|mut r| {
            patch.apply(&mut r);
            r.clone()
        }))
    }

    async fn insert_notification(&self, notification: DistressNotification) -> Result<DistressNotification> {
        self.notifications.insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn get_notification(&self, id: Uuid) -> Result<Option<DistressNotification>> {
        Ok(self.notifications.get(&id).map(|n| n.clone()))
    }

    async fn list_notifications(&self, scope: ReadScope) -> Result<Vec<DistressNotification>> {
        let mut notifications: Vec<DistressNotification> = self
            .notifications
            .iter()
            .filter(|n| in_scope(scope, n.user_id))
            .map(|n| n.clone())
            .collect();
        newest_notifications_first(&mut notifications);
        Ok(notifications)
    }

    async fn acknowledge_notification(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<DistressNotification>> {
        Ok(self.notifications.get_mut(&id).map(|mut n| {
            n.acknowledge(at);
            n.clone()
        }))
    }

    async fn delete_principal(&self, id: Uuid) -> Result<CascadeSummary> {
        let mut summary = CascadeSummary::default();

        self.credentials.retain(|_, c| c.principal_id != id);
        summary.profile_deleted = self.profiles.remove(&id).is_some();

        // Reports owned by the principal take their notifications with them
        let owned_reports: Vec<Uuid> = self
            .reports
            .iter()
            .filter(|r| r.reporter_id == id)
            .map(|r| r.id)
            .collect();
        for report_id in &owned_reports {
            self.reports.remove(report_id);
        }
        summary.reports_deleted = owned_reports.len() as u64;

        // Counted in the closure; concurrent inserts may change len() meanwhile
        let mut removed = 0u64;
        self.notifications.retain(|_, n| {
            let keep =
                !owned_reports.contains(&n.incident_id) && n.user_id != id && n.officer_id != id;
            if !keep {
                removed += 1;
            }
            keep
        });
        summary.notifications_deleted = removed;

        for mut report in self.reports.iter_mut() {
            if report.assigned_officer_id == Some(id) {
                report.assigned_officer_id = None;
                report.updated_at = Utc::now();
                summary.assignments_cleared += 1;
            }
        }

        Ok(summary)
    }
}
