//! Row storage behind a swappable backend
//!
//! The service layer talks to a [`Backend`] trait object so the same policy
//! and lifecycle code runs over MongoDB in production and over an in-memory
//! store in dev mode and tests.
//!
//! Backends perform no authorization of their own. Every call reaching them
//! has already been admitted by [`crate::auth::policy`].

mod memory;
mod mongo;

pub use memory::MemoryBackend;
pub use mongo::MongoBackend;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::ReadScope;
use crate::models::{
    Credential, DistressNotification, IncidentPatch, IncidentReport, Profile, ProfileUpdate, Role,
};
use crate::types::Result;

/// What a principal deletion removed
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeSummary {
    pub profile_deleted: bool,
    pub reports_deleted: u64,
    pub notifications_deleted: u64,
    pub assignments_cleared: u64,
}

/// Storage operations for profiles, reports, notifications and credentials
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Short backend name for logs and health output
    fn name(&self) -> &'static str;

    /// Check that the backend is reachable
    async fn ping(&self) -> Result<()>;

    // Credentials

    /// Insert a credential. Fails with a validation error if the email is taken.
    async fn insert_credential(&self, credential: Credential) -> Result<()>;
    async fn find_credential(&self, email: &str) -> Result<Option<Credential>>;
    /// Remove a credential by email. Returns whether one existed.
    async fn delete_credential(&self, email: &str) -> Result<bool>;

    // Profiles

    async fn insert_profile(&self, profile: Profile) -> Result<Profile>;
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>>;
    async fn list_profiles(&self, scope: ReadScope) -> Result<Vec<Profile>>;
    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<Option<Profile>>;
    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<Profile>>;

    /// Stored role for a principal, read fresh on every call
    async fn role_of(&self, id: Uuid) -> Result<Option<Role>> {
        Ok(self.get_profile(id).await?.map(|p| p.role))
    }

    // Incident reports

    async fn insert_report(&self, report: IncidentReport) -> Result<IncidentReport>;
    async fn get_report(&self, id: Uuid) -> Result<Option<IncidentReport>>;
    /// Newest first
    async fn list_reports(&self, scope: ReadScope) -> Result<Vec<IncidentReport>>;
    async fn update_report(&self, id: Uuid, patch: &IncidentPatch) -> Result<Option<IncidentReport>>;

    // Distress notifications

    async fn insert_notification(&self, notification: DistressNotification) -> Result<DistressNotification>;
    async fn get_notification(&self, id: Uuid) -> Result<Option<DistressNotification>>;
    /// Newest first
    async fn list_notifications(&self, scope: ReadScope) -> Result<Vec<DistressNotification>>;
    /// Set status to acknowledged, stamping `acknowledged_at` only if unset
    async fn acknowledge_notification(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<DistressNotification>>;

    // Administrative

    /// Remove a principal and everything cascading from it
    async fn delete_principal(&self, id: Uuid) -> Result<CascadeSummary>;
}

fn newest_reports_first(reports: &mut [IncidentReport]) {
    reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn newest_notifications_first(notifications: &mut [DistressNotification]) {
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
